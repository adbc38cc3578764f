//! Status bar panel: connection, mode, test status and sample count.

use egui::{Color32, RichText, Ui};

use crate::controller::StatusView;
use crate::frontend::widgets::StatusIndicator;
use crate::types::{AcquisitionState, CollectionStats, ConnectionStatus};

/// Context needed to render the status bar.
pub struct StatusBarContext<'a> {
    pub status: &'a StatusView,
    pub connection: ConnectionStatus,
    pub acquisition: AcquisitionState,
    pub stats: &'a CollectionStats,
}

/// Render the status bar.
pub fn render_status_bar(ui: &mut Ui, ctx: &StatusBarContext<'_>) {
    ui.horizontal(|ui| {
        ui.spacing_mut().item_spacing.x = 8.0;

        ui.label(RichText::new("Connection:").small());
        ui.add(StatusIndicator::connection(ctx.connection));

        ui.separator();

        ui.label(RichText::new("Mode:").small());
        ui.label(RichText::new(&ctx.status.mode).small());

        ui.separator();

        ui.label(RichText::new("Status:").small());
        ui.add(StatusIndicator::test_status(
            ctx.acquisition,
            &ctx.status.test_status,
        ));

        ui.separator();

        let error_color = if ctx.status.parse_errors > 0 {
            Color32::LIGHT_RED
        } else {
            Color32::GRAY
        };
        ui.colored_label(
            error_color,
            RichText::new(format!("Parse errors: {}", ctx.status.parse_errors)).small(),
        )
        .on_hover_text(format!(
            "Valid data lines: {:.1}%\nNoise lines skipped: {}\nData received: {:.1} KB",
            ctx.stats.success_rate(),
            ctx.stats.discarded_lines,
            ctx.stats.total_bytes_read as f64 / 1024.0
        ));

        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            ui.label(RichText::new(&ctx.status.samples).small());
        });
    });
}
