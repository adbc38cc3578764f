//! CSV export of a session
//!
//! One header row followed by one row per sample, in insertion order. Numbers
//! are written with full precision and always carry a decimal point, matching
//! data sets produced by earlier versions of the tool.

use crate::error::{Result, ResultExt, UtmError};
use crate::session::Session;
use chrono::{DateTime, TimeZone};
use std::path::Path;

/// Column headers, in output order
pub const EXPORT_HEADER: [&str; 8] = [
    "Time",
    "Mass (g)",
    "Displacement (mm)",
    "Force (N)",
    "Stress (Pa)",
    "Strain (%)",
    "Voltage (V)",
    "Resistance (Ω)",
];

/// Write the session to `path`
///
/// An empty session is rejected with [`UtmError::NoData`] before the file is
/// touched. The session itself is never modified, so exporting twice to
/// different paths yields identical files.
pub fn export(session: &Session, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if session.is_empty() {
        return Err(UtmError::NoData);
    }

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    writer.write_record(EXPORT_HEADER)?;
    for sample in session.samples() {
        writer.write_record([
            format_number(sample.timestamp),
            format_number(sample.mass_g),
            format_number(sample.displacement_mm),
            format_number(sample.force_n),
            format_number(sample.stress_pa),
            format_number(sample.strain_pct),
            format_number(sample.voltage_v),
            format_number(sample.resistance_ohm),
        ])?;
    }
    writer.flush()?;

    tracing::info!("Exported {} samples to {}", session.len(), path.display());
    Ok(())
}

/// Suggested export filename for the given moment
pub fn default_filename<Tz: TimeZone>(prefix: &str, now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("{}_{}.csv", prefix, now.format("%Y%m%d_%H%M%S"))
}

fn format_number(value: f64) -> String {
    format!("{:?}", value)
}
