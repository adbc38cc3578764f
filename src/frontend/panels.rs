//! Control panel for the UTM UI
//!
//! The panel only renders and collects [`ControlAction`]s. The app applies
//! them to the controller after the frame has been laid out.
//!
//! # Sections
//!
//! - Connection: port selector, refresh, connect/disconnect
//! - Test mode: compression or tension
//! - Calibration: reference weight and tare
//! - Sample parameters: cross-sectional area and gauge length
//! - Test control: start, stop, reset, save
//! - Current values

use crate::backend::PortInfo;
use crate::controller::{ControlAvailability, CurrentValues};
use crate::frontend::widgets::ValueDisplay;
use crate::types::TestMode;
use egui::{Button, Color32, RichText, Ui};

/// Something the operator asked for
#[derive(Debug, Clone, PartialEq)]
pub enum ControlAction {
    RefreshPorts,
    ToggleConnection(String),
    SelectPort(String),
    SetMode(TestMode),
    Calibrate,
    Tare,
    UpdateGeometry,
    Start,
    Stop,
    Reset,
    Save,
}

/// Editable text fields owned by the app
#[derive(Debug, Clone)]
pub struct ControlInputs {
    pub calibration_weight: String,
    pub area: String,
    pub length: String,
}

impl ControlInputs {
    pub fn new(area_mm2: f64, length_mm: f64) -> Self {
        Self {
            calibration_weight: String::new(),
            area: area_mm2.to_string(),
            length: length_mm.to_string(),
        }
    }
}

/// Everything the control panel displays
pub struct ControlPanelContext<'a> {
    pub ports: &'a [PortInfo],
    pub selected_port: Option<&'a str>,
    pub connected: bool,
    pub controls: ControlAvailability,
    pub current: CurrentValues,
}

fn section_heading(ui: &mut Ui, title: &str) {
    ui.add_space(6.0);
    ui.label(RichText::new(title).strong());
    ui.separator();
}

fn button(ui: &mut Ui, enabled: bool, text: &str, tooltip: &str) -> bool {
    ui.add_enabled(enabled, Button::new(text))
        .on_hover_text(tooltip)
        .clicked()
}

/// Render the control panel and return the requested actions
pub fn render_control_panel(
    ui: &mut Ui,
    ctx: &ControlPanelContext<'_>,
    inputs: &mut ControlInputs,
) -> Vec<ControlAction> {
    let mut actions = Vec::new();
    let c = ctx.controls;

    // === Connection ===
    section_heading(ui, "Connection");
    ui.horizontal(|ui| {
        ui.label("Port:");
        let selected_text = ctx.selected_port.unwrap_or("Select port");
        ui.add_enabled_ui(c.connect && !ctx.connected, |ui| {
            egui::ComboBox::from_id_salt("port_selector")
                .selected_text(selected_text)
                .width(160.0)
                .show_ui(ui, |ui| {
                    for port in ctx.ports {
                        let selected = ctx.selected_port == Some(port.name.as_str());
                        if ui
                            .selectable_label(selected, port.to_string())
                            .clicked()
                        {
                            actions.push(ControlAction::SelectPort(port.name.clone()));
                        }
                    }
                });
        });
    });
    ui.horizontal(|ui| {
        if button(ui, c.refresh_ports, "🔄 Refresh Ports", "Refresh available COM ports") {
            actions.push(ControlAction::RefreshPorts);
        }
        let label = if ctx.connected {
            "🔌 Disconnect"
        } else {
            "🔌 Connect"
        };
        if button(ui, c.connect, label, "Connect/disconnect from the selected port") {
            actions.push(ControlAction::ToggleConnection(
                ctx.selected_port.unwrap_or_default().to_string(),
            ));
        }
    });

    // === Test mode ===
    section_heading(ui, "Test Mode");
    ui.horizontal(|ui| {
        if button(ui, c.mode, "Compression", "Set machine to compression mode") {
            actions.push(ControlAction::SetMode(TestMode::Compression));
        }
        if button(ui, c.mode, "Tension", "Set machine to tension mode") {
            actions.push(ControlAction::SetMode(TestMode::Tension));
        }
    });

    // === Calibration ===
    section_heading(ui, "Calibration");
    ui.horizontal(|ui| {
        ui.label("Known weight (g):");
        ui.add_enabled(
            c.calibrate,
            egui::TextEdit::singleline(&mut inputs.calibration_weight).desired_width(80.0),
        );
    });
    ui.horizontal(|ui| {
        if button(ui, c.calibrate, "Calibrate", "Calibrate the load cell with a known weight") {
            actions.push(ControlAction::Calibrate);
        }
        if button(ui, c.tare, "Tare", "Zero the load cell reading") {
            actions.push(ControlAction::Tare);
        }
    });

    // === Sample parameters ===
    section_heading(ui, "Sample Parameters");
    egui::Grid::new("geometry_grid")
        .num_columns(2)
        .spacing([8.0, 4.0])
        .show(ui, |ui| {
            ui.label("Area (mm²):");
            ui.add_enabled(
                c.geometry,
                egui::TextEdit::singleline(&mut inputs.area).desired_width(80.0),
            );
            ui.end_row();

            ui.label("Length (mm):");
            ui.add_enabled(
                c.geometry,
                egui::TextEdit::singleline(&mut inputs.length).desired_width(80.0),
            );
            ui.end_row();
        });
    if button(
        ui,
        c.geometry,
        "Update Parameters",
        "Apply area and length to stress and strain",
    ) {
        actions.push(ControlAction::UpdateGeometry);
    }

    // === Test control ===
    section_heading(ui, "Test Control");
    ui.horizontal(|ui| {
        if button(ui, c.start, "▶ Start", "Start the test") {
            actions.push(ControlAction::Start);
        }
        if button(ui, c.stop, "⏹ Stop", "Stop the test") {
            actions.push(ControlAction::Stop);
        }
    });
    ui.horizontal(|ui| {
        if button(ui, c.reset, "Reset", "Clear data for a new test") {
            actions.push(ControlAction::Reset);
        }
        if button(ui, c.save, "💾 Save Data", "Export the test data to CSV") {
            actions.push(ControlAction::Save);
        }
    });

    // === Current values ===
    section_heading(ui, "Current Values");
    let value_color = Color32::from_rgb(100, 200, 255);
    ui.add(ValueDisplay::new("Force", ctx.current.force_text()).with_color(value_color));
    ui.add(
        ValueDisplay::new("Displacement", ctx.current.displacement_text())
            .with_color(value_color),
    );
    ui.add(ValueDisplay::new("Stress", ctx.current.stress_text()).with_color(value_color));
    ui.add(ValueDisplay::new("Strain", ctx.current.strain_text()).with_color(value_color));

    actions
}
