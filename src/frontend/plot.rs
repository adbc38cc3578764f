//! Live charts for a running test
//!
//! [`ChartPresenter`] is the [`PresentationAdapter`] used by the desktop UI.
//! It keeps one point series per chart, appends to them as samples arrive and
//! rebuilds the geometry-dependent series when the specimen dimensions change.
//!
//! Charts:
//! - Force vs Displacement
//! - Stress vs Strain
//! - Resistance vs Strain

use crate::controller::PresentationAdapter;
use crate::types::{Sample, SampleGeometry};
use egui::{Color32, Ui};
use egui_plot::{Line, Plot, PlotPoints};

/// Point series backing the three charts
#[derive(Debug, Default, Clone)]
pub struct ChartPresenter {
    force_displacement: Vec<[f64; 2]>,
    stress_strain: Vec<[f64; 2]>,
    resistance_strain: Vec<[f64; 2]>,
    line_width: f32,
}

impl ChartPresenter {
    pub fn new() -> Self {
        Self {
            line_width: 1.5,
            ..Self::default()
        }
    }

    /// Number of points in each series
    pub fn len(&self) -> usize {
        self.force_displacement.len()
    }

    pub fn is_empty(&self) -> bool {
        self.force_displacement.is_empty()
    }

    pub fn force_displacement(&self) -> &[[f64; 2]] {
        &self.force_displacement
    }

    pub fn stress_strain(&self) -> &[[f64; 2]] {
        &self.stress_strain
    }

    pub fn resistance_strain(&self) -> &[[f64; 2]] {
        &self.resistance_strain
    }

    fn push(&mut self, sample: &Sample) {
        self.force_displacement
            .push([sample.displacement_mm, sample.force_n]);
        self.stress_strain.push([sample.strain_pct, sample.stress_pa]);
        self.resistance_strain
            .push([sample.strain_pct, sample.resistance_ohm]);
    }

    fn clear(&mut self) {
        self.force_displacement.clear();
        self.stress_strain.clear();
        self.resistance_strain.clear();
    }

    /// Draw the three charts stacked vertically
    pub fn render(&self, ui: &mut Ui) {
        let height = ((ui.available_height() - 24.0) / 3.0).max(120.0);

        self.render_chart(
            ui,
            "force_displacement",
            "Force vs Displacement",
            "Displacement (mm)",
            "Force (N)",
            &self.force_displacement,
            Color32::from_rgb(52, 152, 219),
            height,
        );
        self.render_chart(
            ui,
            "stress_strain",
            "Stress vs Strain",
            "Strain (%)",
            "Stress (Pa)",
            &self.stress_strain,
            Color32::from_rgb(231, 76, 60),
            height,
        );
        self.render_chart(
            ui,
            "resistance_strain",
            "Resistance vs Strain",
            "Strain (%)",
            "Resistance (Ω)",
            &self.resistance_strain,
            Color32::from_rgb(46, 204, 113),
            height,
        );
    }

    #[allow(clippy::too_many_arguments)]
    fn render_chart(
        &self,
        ui: &mut Ui,
        id: &str,
        title: &str,
        x_label: &str,
        y_label: &str,
        points: &[[f64; 2]],
        color: Color32,
        height: f32,
    ) {
        ui.label(egui::RichText::new(title).strong());
        Plot::new(id)
            .height(height)
            .x_axis_label(x_label)
            .y_axis_label(y_label)
            .auto_bounds(egui::Vec2b::TRUE)
            .allow_scroll(false)
            .show(ui, |plot_ui| {
                if points.is_empty() {
                    return;
                }
                let line = Line::new(title, PlotPoints::from(points.to_vec()))
                    .color(color)
                    .width(self.line_width);
                plot_ui.line(line);
            });
    }
}

impl PresentationAdapter for ChartPresenter {
    fn on_sample_appended(&mut self, sample: &Sample) {
        self.push(sample);
    }

    fn on_reset(&mut self) {
        self.clear();
    }

    fn on_geometry_changed(&mut self, _geometry: &SampleGeometry, samples: &[Sample]) {
        self.clear();
        for sample in samples {
            self.push(sample);
        }
    }
}
