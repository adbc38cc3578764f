//! Frontend module for egui UI
//!
//! This module provides the desktop window using eframe/egui. It receives
//! samples from the backend through the [`UtmController`] and renders them in
//! real time.
//!
//! # Layout
//!
//! - Left side panel: connection, mode, calibration, geometry and test controls
//! - Central panel: three live charts
//! - Bottom bar: connection, mode, test status and sample count
//!
//! # Main Types
//!
//! - [`UtmApp`] - Main application state implementing [`eframe::App`]
//! - [`ChartPresenter`] - Chart series, the controller's presentation adapter

mod panels;
mod plot;
mod status_bar;
pub mod widgets;

pub use panels::{ControlAction, ControlInputs};
pub use plot::ChartPresenter;

use crate::backend::FrontendReceiver;
use crate::config::{AppConfig, AppState};
use crate::controller::{Notice, NoticeLevel, UtmController};
use crate::error::UtmError;
use egui::Color32;
use std::path::Path;
use panels::{render_control_panel, ControlPanelContext};
use status_bar::{render_status_bar, StatusBarContext};

/// Main application state for the UTM interface
pub struct UtmApp {
    controller: UtmController<ChartPresenter>,
    app_state: AppState,
    inputs: ControlInputs,
    /// Notice currently shown in a popup
    notice: Option<Notice>,
}

impl UtmApp {
    /// Create the app and request the initial port list
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        frontend: FrontendReceiver,
        config: AppConfig,
        app_state: AppState,
    ) -> Self {
        let controller = UtmController::new(frontend, ChartPresenter::new(), &config);
        if let Err(e) = controller.refresh_ports() {
            tracing::warn!("Could not request port list: {}", e);
        }

        Self {
            controller,
            app_state,
            inputs: ControlInputs::new(config.geometry.area_mm2, config.geometry.length_mm),
            notice: None,
        }
    }

    fn handle_action(&mut self, action: ControlAction) {
        let result = match action {
            ControlAction::RefreshPorts => self.controller.refresh_ports(),
            ControlAction::SelectPort(port) => {
                self.controller.select_port(port);
                Ok(())
            }
            ControlAction::ToggleConnection(port) => self.controller.toggle_connection(&port),
            ControlAction::SetMode(mode) => self.controller.set_mode(mode),
            ControlAction::Calibrate => self
                .controller
                .calibrate(&self.inputs.calibration_weight)
                .map(|_| ()),
            ControlAction::Tare => self.controller.tare(),
            ControlAction::UpdateGeometry => self
                .controller
                .update_geometry_input(&self.inputs.area, &self.inputs.length)
                .map(|_| {
                    self.app_state.last_geometry = Some(self.controller.session().geometry());
                }),
            ControlAction::Start => self.controller.start(),
            ControlAction::Stop => self.controller.stop(),
            ControlAction::Reset => self.controller.reset(),
            ControlAction::Save => self.save_data(),
        };

        if let Err(e) = result {
            tracing::warn!("{}", e);
            self.controller.report_error(&e);
        }
    }

    /// Ask for a destination and export the session
    fn save_data(&mut self) -> crate::error::Result<()> {
        if self.controller.session().is_empty() {
            return Err(UtmError::NoData);
        }

        let mut dialog = rfd::FileDialog::new()
            .add_filter("CSV files", &["csv"])
            .add_filter("All files", &["*"])
            .set_file_name(self.controller.suggested_filename());
        if let Some(dir) = self.controller.last_export_dir() {
            dialog = dialog.set_directory(dir);
        }

        // Cancelled dialogs are not an error
        let Some(path) = dialog.save_file() else {
            return Ok(());
        };
        self.controller.export(&path)?;
        self.app_state.last_export_dir = self.controller.last_export_dir().map(Path::to_path_buf);
        Ok(())
    }

    fn render_notice(&mut self, ctx: &egui::Context) {
        if self.notice.is_none() {
            self.notice = self.controller.pop_notice();
        }
        let Some(notice) = &self.notice else {
            return;
        };

        let color = match notice.level {
            NoticeLevel::Info => Color32::LIGHT_BLUE,
            NoticeLevel::Warning => Color32::YELLOW,
            NoticeLevel::Error => Color32::LIGHT_RED,
        };

        let mut dismissed = false;
        egui::Window::new(&notice.title)
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.colored_label(color, &notice.message);
                ui.add_space(8.0);
                if ui.button("OK").clicked() {
                    dismissed = true;
                }
            });

        if dismissed {
            self.notice = None;
        }
    }
}

impl eframe::App for UtmApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let had_messages = self.controller.pump() > 0;

        if let Some(port) = self.controller.last_connected_port() {
            if self.app_state.last_port.as_deref() != Some(port) {
                self.app_state.last_port = Some(port.to_string());
            }
        }

        if self.controller.acquisition_state().is_running()
            || self.controller.is_connected()
            || had_messages
        {
            ctx.request_repaint();
        }

        let status = self.controller.status();
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            render_status_bar(
                ui,
                &StatusBarContext {
                    status: &status,
                    connection: self.controller.connection_status(),
                    acquisition: self.controller.acquisition_state(),
                    stats: self.controller.stats(),
                },
            );
        });

        let actions = egui::SidePanel::left("controls")
            .resizable(false)
            .default_width(260.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical()
                    .show(ui, |ui| {
                        let panel_ctx = ControlPanelContext {
                            ports: self.controller.ports(),
                            selected_port: self.controller.selected_port(),
                            connected: self.controller.is_connected(),
                            controls: self.controller.controls(),
                            current: self.controller.current_values(),
                        };
                        render_control_panel(ui, &panel_ctx, &mut self.inputs)
                    })
                    .inner
            })
            .inner;

        egui::CentralPanel::default().show(ctx, |ui| {
            self.controller.adapter().render(ui);
        });

        for action in actions {
            self.handle_action(action);
        }

        self.render_notice(ctx);
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.controller.shutdown();

        if let Some(port) = self.controller.last_connected_port() {
            self.app_state.last_port = Some(port.to_string());
        }
        self.app_state.last_geometry = Some(self.controller.session().geometry());

        if let Err(e) = self.app_state.save() {
            tracing::warn!("Failed to save app state: {}", e);
        }
    }
}
