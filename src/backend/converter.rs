//! Unit conversion from raw device readings to engineering units
//!
//! The machine reports load as a mass in grams. Force is derived with the
//! fixed factor [`GRAVITY_FACTOR`] applied directly to the gram value, which
//! is the scale the firmware and existing exported data sets use. Stress and
//! strain depend on the specimen geometry and are recomputed whenever it
//! changes.
//!
//! No rounding happens here; formatting to two decimals is a display concern.

use crate::types::{RawReading, Sample, SampleGeometry};

/// Factor applied to the gram reading to obtain the force value
pub const GRAVITY_FACTOR: f64 = 9.81;

/// mm² → m² scale used when turning N/mm² into Pa
const PASCAL_SCALE: f64 = 1_000_000.0;

/// Force in newtons from a mass reading in grams
#[inline]
pub fn force_from_mass(mass_g: f64) -> f64 {
    mass_g * GRAVITY_FACTOR
}

/// Stress in pascals from force and cross-sectional area in mm²
#[inline]
pub fn stress_from_force(force_n: f64, area_mm2: f64) -> f64 {
    force_n / area_mm2 * PASCAL_SCALE
}

/// Strain in percent from displacement and gauge length in mm
#[inline]
pub fn strain_from_displacement(displacement_mm: f64, length_mm: f64) -> f64 {
    displacement_mm / length_mm * 100.0
}

/// Build a full sample from a raw reading
pub fn convert_reading(reading: &RawReading, geometry: &SampleGeometry, timestamp: f64) -> Sample {
    let force_n = force_from_mass(reading.mass_g);
    Sample {
        timestamp,
        mass_g: reading.mass_g,
        displacement_mm: reading.displacement_mm,
        voltage_v: reading.voltage_v,
        resistance_ohm: reading.resistance_ohm,
        force_n,
        stress_pa: stress_from_force(force_n, geometry.area_mm2),
        strain_pct: strain_from_displacement(reading.displacement_mm, geometry.length_mm),
    }
}

/// Recompute the geometry-dependent fields of an existing sample
pub fn rescale_sample(sample: &mut Sample, geometry: &SampleGeometry) {
    sample.stress_pa = stress_from_force(sample.force_n, geometry.area_mm2);
    sample.strain_pct = strain_from_displacement(sample.displacement_mm, geometry.length_mm);
}
