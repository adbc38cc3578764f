//! # UTM-RS: Universal Testing Machine interface
//!
//! A desktop controller for a universal testing machine attached over a serial
//! line. It selects the test mode, calibrates and tares the load cell, streams
//! readings while a test runs, converts them to force, stress and strain,
//! draws three live charts and exports the session to CSV.
//!
//! ## Architecture
//!
//! - **Backend**: Owns the serial port and runs the acquisition loop in a
//!   separate thread
//! - **Controller**: Owns the session and mode, validates operator input and
//!   notifies a presentation adapter
//! - **Frontend**: Renders the UI using eframe/egui with egui_plot for charts
//! - **Communication**: Crossbeam channels carry commands to the worker and
//!   converted samples back
//!
//! ## Configuration
//!
//! Remembered choices (last port, geometry, export folder) are stored in the
//! platform-appropriate data directory under `dev.utm-rs`:
//!
//! - **Linux**: `~/.local/share/dev.utm-rs/`
//! - **macOS**: `~/Library/Application Support/dev.utm-rs/`
//! - **Windows**: `%APPDATA%\dev.utm-rs\`
//!
//! ## Example
//!
//! ```ignore
//! use utm_rs::{backend::UtmBackend, config::AppConfig, controller::UtmController};
//!
//! let config = AppConfig::default();
//! let (backend, frontend) = UtmBackend::new(config.clone());
//! std::thread::spawn(move || backend.run());
//!
//! let mut controller = UtmController::new(frontend, my_adapter, &config);
//! controller.connect("/dev/ttyUSB0")?;
//! controller.pump();
//! controller.set_mode(TestMode::Tension)?;
//! controller.start()?;
//! ```

pub mod app;
pub mod backend;
pub mod config;
pub mod controller;
pub mod error;
pub mod frontend;
pub mod session;
pub mod types;

// Re-export commonly used types
pub use app::UtmApp;
pub use backend::{BackendCommand, BackendMessage, UtmBackend};
pub use config::{AppConfig, AppState};
pub use controller::{PresentationAdapter, UtmController};
pub use error::{Result, UtmError};
pub use session::Session;
pub use types::{Sample, SampleGeometry, TestMode};
