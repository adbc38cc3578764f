//! UTM Interface - Main Entry Point
//!
//! Desktop controller for a universal testing machine on a serial port.

use anyhow::Context;
use std::sync::atomic::Ordering;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use utm_rs::{
    backend::UtmBackend,
    config::{ensure_app_data_dir, AppConfig, AppState},
    frontend::UtmApp,
};

/// Set up console logging, plus daily log files when enabled
fn init_logging(config: &AppConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let (file_layer, guard) = if config.logging.log_to_file {
        match ensure_app_data_dir() {
            Ok(dir) => {
                let appender = tracing_appender::rolling::daily(dir.join("logs"), "utm-rs.log");
                let (writer, guard) = tracing_appender::non_blocking(appender);
                let layer = tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(writer);
                (Some(layer), Some(guard))
            }
            Err(e) => {
                eprintln!("File logging disabled: {}", e);
                (None, None)
            }
        }
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,utm_rs=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    guard
}

fn main() -> anyhow::Result<()> {
    let mut config = AppConfig::load_or_default();
    let _log_guard = init_logging(&config);

    tracing::info!("Starting UTM interface");

    // Remembered port, geometry and export folder
    let app_state = AppState::load_or_default();
    app_state.apply_to(&mut config);

    let (backend, frontend) = UtmBackend::new(config.clone());
    let stop = backend.stop_handle();
    let backend_handle = std::thread::Builder::new()
        .name("acquisition".to_string())
        .spawn(move || backend.run())
        .context("Failed to spawn acquisition thread")?;

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 800.0])
            .with_min_inner_size([900.0, 600.0])
            .with_title("UTM Control Interface"),
        ..Default::default()
    };

    let result = eframe::run_native(
        "UTM Control Interface",
        native_options,
        Box::new(|cc| {
            if app_state.ui_preferences.dark_mode {
                cc.egui_ctx.set_visuals(egui::Visuals::dark());
            } else {
                cc.egui_ctx.set_visuals(egui::Visuals::light());
            }

            Ok(Box::new(UtmApp::new(cc, frontend, config, app_state)))
        }),
    );

    // Signal backend to stop and wait for it
    tracing::info!("Shutting down...");
    stop.store(false, Ordering::SeqCst);
    if backend_handle.join().is_err() {
        tracing::error!("Acquisition thread panicked");
    }

    result.map_err(|e| anyhow::anyhow!("UI error: {}", e))
}
