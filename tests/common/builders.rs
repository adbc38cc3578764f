//! Test data builders for creating test objects

use utm_rs::backend::converter::convert_reading;
use utm_rs::types::RawReading;
use utm_rs::{Sample, SampleGeometry};

/// Format a device data line
pub fn data_line(mass_g: f64, displacement_mm: f64, voltage_v: f64, resistance_ohm: f64) -> String {
    format!(
        ";{};{};{};{}",
        mass_g, displacement_mm, voltage_v, resistance_ohm
    )
}

/// Builder for creating test Samples
pub struct SampleBuilder {
    timestamp: f64,
    reading: RawReading,
    geometry: SampleGeometry,
}

impl SampleBuilder {
    pub fn new() -> Self {
        Self {
            timestamp: 0.0,
            reading: RawReading {
                mass_g: 10.0,
                displacement_mm: 2.0,
                voltage_v: 1.5,
                resistance_ohm: 100.0,
            },
            geometry: SampleGeometry::default(),
        }
    }

    pub fn timestamp(mut self, timestamp: f64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn mass(mut self, mass_g: f64) -> Self {
        self.reading.mass_g = mass_g;
        self
    }

    pub fn displacement(mut self, displacement_mm: f64) -> Self {
        self.reading.displacement_mm = displacement_mm;
        self
    }

    pub fn geometry(mut self, geometry: SampleGeometry) -> Self {
        self.geometry = geometry;
        self
    }

    pub fn build(self) -> Sample {
        convert_reading(&self.reading, &self.geometry, self.timestamp)
    }
}

impl Default for SampleBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_builder() {
        let sample = SampleBuilder::new().mass(20.0).displacement(5.0).build();
        assert_eq!(sample.mass_g, 20.0);
        assert_eq!(sample.displacement_mm, 5.0);
        assert_eq!(sample.strain_pct, 10.0);
    }

    #[test]
    fn test_data_line() {
        assert_eq!(data_line(10.0, 2.0, 1.5, 100.0), ";10;2;1.5;100");
    }
}
