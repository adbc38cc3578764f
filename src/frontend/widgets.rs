//! Small widgets shared by the status bar and the control panel
//!
//! - [`StatusIndicator`] - colored dot followed by a state label
//! - [`ValueDisplay`] - live reading with a fixed-width caption

use crate::types::{AcquisitionState, ConnectionStatus};
use egui::{Color32, Response, RichText, Ui, Widget};

const STOPPED_COLOR: Color32 = Color32::from_rgb(230, 180, 60);
const CAPTION_WIDTH: f32 = 96.0;

/// Colored dot plus label
pub struct StatusIndicator {
    color: Color32,
    label: String,
}

impl StatusIndicator {
    pub fn new(color: Color32, label: impl Into<String>) -> Self {
        Self {
            color,
            label: label.into(),
        }
    }

    pub fn connection(status: ConnectionStatus) -> Self {
        let color = match status {
            ConnectionStatus::Connected => Color32::GREEN,
            ConnectionStatus::Disconnected => Color32::GRAY,
            ConnectionStatus::Error => Color32::RED,
        };
        Self::new(color, status.to_string())
    }

    /// Running is green, a stopped test amber, anything else grey
    pub fn test_status(state: AcquisitionState, text: &str) -> Self {
        let color = if state.is_running() {
            Color32::GREEN
        } else if text == "Stopped" {
            STOPPED_COLOR
        } else {
            Color32::GRAY
        };
        Self::new(color, text)
    }
}

impl Widget for StatusIndicator {
    fn ui(self, ui: &mut Ui) -> Response {
        ui.horizontal(|ui| {
            ui.spacing_mut().item_spacing.x = 4.0;
            ui.label(RichText::new("●").color(self.color));
            ui.label(RichText::new(self.label).small());
        })
        .response
    }
}

/// Caption and live reading on one row
pub struct ValueDisplay {
    caption: String,
    reading: String,
    color: Option<Color32>,
}

impl ValueDisplay {
    pub fn new(caption: impl Into<String>, reading: impl Into<String>) -> Self {
        Self {
            caption: caption.into(),
            reading: reading.into(),
            color: None,
        }
    }

    pub fn with_color(mut self, color: Color32) -> Self {
        self.color = Some(color);
        self
    }
}

impl Widget for ValueDisplay {
    fn ui(self, ui: &mut Ui) -> Response {
        ui.horizontal(|ui| {
            ui.add_sized(
                [CAPTION_WIDTH, ui.spacing().interact_size.y],
                egui::Label::new(format!("{}:", self.caption)),
            );
            let reading = RichText::new(self.reading).monospace().strong();
            match self.color {
                Some(color) => ui.label(reading.color(color)),
                None => ui.label(reading),
            };
        })
        .response
    }
}
