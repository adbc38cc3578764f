//! Core data types for the UTM interface
//!
//! This module contains the measurement and state types shared between the
//! acquisition worker, the session store and the frontend.
//!
//! # Main Types
//!
//! - [`RawReading`] - The four numeric fields of one device data line
//! - [`Sample`] - One timestamped acquisition event with derived quantities
//! - [`SampleGeometry`] - Specimen area and gauge length used for stress/strain
//! - [`TestMode`] - Compression or tension, or not yet chosen
//! - [`AcquisitionState`] - Idle or running
//! - [`CollectionStats`] - Counters published by the worker

use serde::{Deserialize, Serialize};

/// Default specimen cross-sectional area in mm²
pub const DEFAULT_AREA_MM2: f64 = 100.0;

/// Default specimen gauge length in mm
pub const DEFAULT_LENGTH_MM: f64 = 50.0;

/// The numeric payload of one `;mass;displacement;voltage;resistance` line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawReading {
    /// Load cell reading in grams
    pub mass_g: f64,
    /// Crosshead displacement in millimeters
    pub displacement_mm: f64,
    /// Sensor voltage in volts
    pub voltage_v: f64,
    /// Sensor resistance in ohms
    pub resistance_ohm: f64,
}

/// One acquisition event
///
/// Raw fields never change after the sample is appended. Stress and strain
/// are recomputed in place when the session geometry changes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Seconds since the Unix epoch, monotonic within one backend run
    pub timestamp: f64,
    /// Mass in grams
    pub mass_g: f64,
    /// Displacement in millimeters
    pub displacement_mm: f64,
    /// Voltage in volts
    pub voltage_v: f64,
    /// Resistance in ohms
    pub resistance_ohm: f64,
    /// Derived force in newtons
    pub force_n: f64,
    /// Derived stress in pascals
    pub stress_pa: f64,
    /// Derived strain in percent
    pub strain_pct: f64,
}

/// Specimen dimensions used to derive stress and strain
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleGeometry {
    /// Cross-sectional area in mm²
    pub area_mm2: f64,
    /// Initial gauge length in mm
    pub length_mm: f64,
}

impl Default for SampleGeometry {
    fn default() -> Self {
        Self {
            area_mm2: DEFAULT_AREA_MM2,
            length_mm: DEFAULT_LENGTH_MM,
        }
    }
}

impl SampleGeometry {
    /// Create a geometry without validating it
    pub fn new(area_mm2: f64, length_mm: f64) -> Self {
        Self {
            area_mm2,
            length_mm,
        }
    }

    /// Both dimensions must be finite and strictly positive
    pub fn is_valid(&self) -> bool {
        self.area_mm2.is_finite()
            && self.length_mm.is_finite()
            && self.area_mm2 > 0.0
            && self.length_mm > 0.0
    }
}

/// Test mode selected on the machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TestMode {
    /// No mode chosen yet; acquisition cannot start
    #[default]
    Unset,
    /// Compression test
    Compression,
    /// Tension test
    Tension,
}

impl TestMode {
    /// Whether a real mode has been chosen
    pub fn is_set(&self) -> bool {
        !matches!(self, TestMode::Unset)
    }

    /// Text shown in the status bar
    pub fn status_text(&self) -> &'static str {
        match self {
            TestMode::Unset => "No Mode Selected",
            TestMode::Compression => "Compression",
            TestMode::Tension => "Tension",
        }
    }
}

impl std::fmt::Display for TestMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.status_text())
    }
}

/// Represents the connection status to the testing machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    /// No port open
    #[default]
    Disconnected,
    /// Port open
    Connected,
    /// The last connection attempt failed
    Error,
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionStatus::Disconnected => write!(f, "Not Connected"),
            ConnectionStatus::Connected => write!(f, "Connected"),
            ConnectionStatus::Error => write!(f, "Connection Failed"),
        }
    }
}

/// State of the acquisition loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AcquisitionState {
    /// Not reading samples
    #[default]
    Idle,
    /// Polling the connection for data lines
    Running,
}

impl AcquisitionState {
    /// Whether samples are being collected
    pub fn is_running(&self) -> bool {
        matches!(self, AcquisitionState::Running)
    }
}

/// Statistics about the data collection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionStats {
    /// Samples produced since the last start
    pub samples: u64,
    /// Lines starting with `;` that failed to parse
    pub parse_errors: u64,
    /// Lines without the `;` prefix (firmware log output)
    pub discarded_lines: u64,
    /// Total bytes read from the port
    pub total_bytes_read: u64,
    /// Status messages dropped because the UI queue was full
    pub dropped_messages: u64,
}

impl CollectionStats {
    /// Percentage of data lines that parsed successfully
    pub fn success_rate(&self) -> f64 {
        let total = self.samples + self.parse_errors;
        if total == 0 {
            100.0
        } else {
            (self.samples as f64 / total as f64) * 100.0
        }
    }
}
