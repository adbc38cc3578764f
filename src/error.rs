//! Error handling for the UTM interface
//!
//! This module defines the error taxonomy shared by the serial backend, the
//! session store and the exporter, plus a Result alias used throughout the
//! crate.
//!
//! Only [`UtmError::Parse`] is produced during normal acquisition and it is
//! never fatal: the worker counts it and keeps reading.

use thiserror::Error;

/// Main error type for UTM operations
#[derive(Error, Debug)]
pub enum UtmError {
    /// The serial port could not be opened or written
    #[error("Connection error: {0}")]
    Connection(String),

    /// The serial port failed while a test was running
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// A command needs an open connection
    #[error("Not connected to the testing machine")]
    NotConnected,

    /// Invalid geometry or calibration input
    #[error("Validation error: {0}")]
    Validation(String),

    /// A data line from the device could not be decoded
    #[error("Parse error in line {line:?}: {reason}")]
    Parse { line: String, reason: String },

    /// Acquisition was started before a test mode was chosen
    #[error("Please select a test mode (Tension or Compression) before starting")]
    ModeUnset,

    /// The operation is not allowed while a test is running
    #[error("Operation not allowed while a test is running")]
    AcquisitionActive,

    /// Export was requested on an empty session
    #[error("No data to export")]
    NoData,

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV serialization errors
    #[error("Export error: {0}")]
    Export(String),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors related to channel communication
    #[error("Channel error: {0}")]
    Channel(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<UtmError>,
    },
}

impl UtmError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        UtmError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Build a parse error for a raw line
    pub fn parse(line: impl Into<String>, reason: impl Into<String>) -> Self {
        UtmError::Parse {
            line: line.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error should be shown to the operator
    ///
    /// Parse failures are only counted and logged.
    pub fn is_user_facing(&self) -> bool {
        match self {
            UtmError::Parse { .. } => false,
            UtmError::WithContext { source, .. } => source.is_user_facing(),
            _ => true,
        }
    }
}

impl From<csv::Error> for UtmError {
    fn from(err: csv::Error) -> Self {
        if err.is_io_error() {
            match err.into_kind() {
                csv::ErrorKind::Io(io) => UtmError::Io(io),
                other => UtmError::Export(format!("{:?}", other)),
            }
        } else {
            UtmError::Export(err.to_string())
        }
    }
}

/// Result type alias for UTM operations
pub type Result<T> = std::result::Result<T, UtmError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E: Into<UtmError>> ResultExt<T> for std::result::Result<T, E> {
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let err: UtmError = e.into();
            err.with_context(f())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = UtmError::Validation("Calibration input cannot be empty".to_string());
        assert_eq!(
            err.to_string(),
            "Validation error: Calibration input cannot be empty"
        );
    }

    #[test]
    fn test_error_with_context() {
        let err = UtmError::Connection("port busy".to_string());
        let with_ctx = err.with_context("Failed to open /dev/ttyUSB0");
        assert!(with_ctx.to_string().contains("Failed to open /dev/ttyUSB0"));
        assert!(with_ctx.to_string().contains("port busy"));
    }

    #[test]
    fn test_parse_error_is_not_user_facing() {
        let err = UtmError::parse(";abc;2;1.5;100", "invalid float literal");
        assert!(!err.is_user_facing());
        assert!(err.to_string().contains(";abc;2;1.5;100"));

        let wrapped = UtmError::parse("x", "y").with_context("line 3");
        assert!(!wrapped.is_user_facing());

        assert!(UtmError::NoData.is_user_facing());
    }

    #[test]
    fn test_result_with_context_converts_source() {
        let io: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "no such directory",
        ));
        let err = io.with_context(|| "Failed to create out.csv".to_string()).unwrap_err();
        match err {
            UtmError::WithContext { context, source } => {
                assert_eq!(context, "Failed to create out.csv");
                assert!(matches!(*source, UtmError::Io(_)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: UtmError = io.into();
        assert!(matches!(err, UtmError::Io(_)));
    }
}
