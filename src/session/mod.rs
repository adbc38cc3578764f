//! Session store for one test run
//!
//! A [`Session`] is the ordered list of samples collected since the last
//! reset, plus the specimen geometry in effect. It lives on the UI side and is
//! only fed through [`Session::append`] with samples delivered by the worker,
//! so no locking is involved.
//!
//! # Features
//!
//! - Insertion-ordered storage, never reordered or deduplicated
//! - Retroactive rescaling of stress and strain when the geometry changes
//! - CSV export (see [`export`])

pub mod export;

pub use export::{default_filename, export, EXPORT_HEADER};

use crate::backend::converter::rescale_sample;
use crate::error::{Result, UtmError};
use crate::types::{Sample, SampleGeometry};

/// Samples collected during the current test
#[derive(Debug, Clone, Default)]
pub struct Session {
    samples: Vec<Sample>,
    geometry: SampleGeometry,
}

impl Session {
    /// Create an empty session with the default geometry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty session with a specific geometry
    pub fn with_geometry(geometry: SampleGeometry) -> Self {
        Self {
            samples: Vec::new(),
            geometry,
        }
    }

    /// Add one sample at the end
    pub fn append(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    /// Remove every sample; the geometry is kept
    pub fn reset(&mut self) {
        self.samples.clear();
    }

    /// Switch to a new geometry and recompute stress and strain of every sample
    ///
    /// An invalid geometry is rejected and leaves the session untouched.
    pub fn rescale(&mut self, geometry: SampleGeometry) -> Result<()> {
        if !geometry.is_valid() {
            return Err(UtmError::Validation(format!(
                "Area and length must be positive values (got {} mm², {} mm)",
                geometry.area_mm2, geometry.length_mm
            )));
        }

        for sample in &mut self.samples {
            rescale_sample(sample, &geometry);
        }
        self.geometry = geometry;
        tracing::debug!(
            "Rescaled {} samples to area={} mm², length={} mm",
            self.samples.len(),
            geometry.area_mm2,
            geometry.length_mm
        );
        Ok(())
    }

    /// All samples in insertion order
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether no samples have been collected
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Most recent sample
    pub fn latest(&self) -> Option<&Sample> {
        self.samples.last()
    }

    /// Geometry in effect
    pub fn geometry(&self) -> SampleGeometry {
        self.geometry
    }
}
