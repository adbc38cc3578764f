//! Line protocol spoken by the testing machine firmware
//!
//! # Outbound
//!
//! Every command is a short ASCII token terminated by `\n`:
//!
//! | Command | Bytes |
//! |---------|-------|
//! | Compression mode | `c` |
//! | Tension mode | `v` |
//! | Calibrate with reference weight | `w <grams>` |
//! | Tare | `t` |
//! | Start streaming | `1` |
//! | Stop streaming | `0` |
//!
//! # Inbound
//!
//! Data lines look like `;<mass>;<displacement>;<voltage>;<resistance>`.
//! Anything that does not start with `;` is firmware chatter and is dropped
//! without complaint. A line that starts with `;` but does not split into
//! exactly five fields, or whose numbers do not parse, is a parse error.

use crate::error::{Result, UtmError};
use crate::types::{RawReading, TestMode};
use std::time::Duration;

/// Leading character of every data line
pub const DATA_PREFIX: char = ';';

/// Field separator inside a data line
pub const FIELD_SEPARATOR: char = ';';

/// Number of fields in a data line, counting the empty leading token
pub const FIELD_COUNT: usize = 5;

/// Fixed baud rate of the machine firmware
pub const BAUD_RATE: u32 = 9600;

/// Read and write timeout of the port
pub const PORT_TIMEOUT: Duration = Duration::from_secs(1);

/// Commands understood by the machine
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeviceCommand {
    /// Select compression mode (`c`)
    Compression,
    /// Select tension mode (`v`)
    Tension,
    /// Calibrate against a known weight in grams (`w <value>`)
    Calibrate(f64),
    /// Zero the load reading (`t`)
    Tare,
    /// Start streaming data lines (`1`)
    Start,
    /// Stop streaming data lines (`0`)
    Stop,
}

impl DeviceCommand {
    /// Command that selects the given mode, if any
    pub fn for_mode(mode: TestMode) -> Option<Self> {
        match mode {
            TestMode::Compression => Some(DeviceCommand::Compression),
            TestMode::Tension => Some(DeviceCommand::Tension),
            TestMode::Unset => None,
        }
    }

    /// Wire form including the trailing newline
    pub fn encode(&self) -> String {
        match self {
            DeviceCommand::Compression => "c\n".to_string(),
            DeviceCommand::Tension => "v\n".to_string(),
            // `{:?}` keeps the decimal point on whole numbers ("w 100.0")
            DeviceCommand::Calibrate(grams) => format!("w {:?}\n", grams),
            DeviceCommand::Tare => "t\n".to_string(),
            DeviceCommand::Start => "1\n".to_string(),
            DeviceCommand::Stop => "0\n".to_string(),
        }
    }
}

impl std::fmt::Display for DeviceCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.encode().trim_end())
    }
}

/// Parse a calibration weight typed by the operator
pub fn parse_calibration_input(input: &str) -> Result<f64> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(UtmError::Validation(
            "Calibration input cannot be empty".to_string(),
        ));
    }

    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(UtmError::Validation(format!(
            "Invalid calibration value '{}'. Please enter a number.",
            trimmed
        ))),
    }
}

/// Decode one inbound line
///
/// Returns `Ok(None)` for lines that are not data lines, `Ok(Some(_))` for a
/// well-formed reading and [`UtmError::Parse`] for a malformed data line.
/// The caller is expected to have stripped the line terminator.
pub fn parse_line(line: &str) -> Result<Option<RawReading>> {
    if !line.starts_with(DATA_PREFIX) {
        return Ok(None);
    }

    let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
    if fields.len() != FIELD_COUNT {
        return Err(UtmError::parse(
            line,
            format!("expected {} fields, found {}", FIELD_COUNT, fields.len()),
        ));
    }

    let number = |index: usize, name: &str| -> Result<f64> {
        fields[index]
            .trim()
            .parse::<f64>()
            .map_err(|e| UtmError::parse(line, format!("{} field {:?}: {}", name, fields[index], e)))
    };

    Ok(Some(RawReading {
        mass_g: number(1, "mass")?,
        displacement_mm: number(2, "displacement")?,
        voltage_v: number(3, "voltage")?,
        resistance_ohm: number(4, "resistance")?,
    }))
}
