//! Backend module for talking to the testing machine
//!
//! This module handles all serial communication in a separate thread to keep
//! the UI responsive. It uses crossbeam channels for thread-safe communication
//! with the frontend.
//!
//! # Architecture
//!
//! - [`BackendCommand`] - Messages sent from UI to backend (connect, mode, start, etc.)
//! - [`BackendMessage`] - Messages sent from backend to UI (samples, status, errors)
//! - [`FrontendReceiver`] - UI-side handle for sending commands and receiving messages
//! - [`UtmBackend`] - Main backend entry point that owns the worker
//!
//! # Components
//!
//! - [`converter`] - Raw readings to force, stress and strain
//! - [`protocol`] - Command bytes and the inbound line grammar
//! - [`SerialLink`] - Connection abstraction, implemented by [`SerialPortLink`]
//!   and `MockUtmDevice` (`mock-device` feature)
//! - [`AcquisitionWorker`] - The loop that reads, parses and converts lines
//!
//! # Example
//!
//! ```ignore
//! use utm_rs::backend::{BackendMessage, UtmBackend};
//! use utm_rs::config::AppConfig;
//!
//! let (backend, frontend) = UtmBackend::new(AppConfig::default());
//! std::thread::spawn(move || backend.run());
//!
//! frontend.send_command(BackendCommand::Connect { port: "/dev/ttyUSB0".into() });
//! frontend.send_command(BackendCommand::SetMode(TestMode::Tension));
//! frontend.send_command(BackendCommand::StartAcquisition);
//!
//! for msg in frontend.drain() {
//!     if let BackendMessage::Sample(sample) = msg {
//!         // Append to the session
//!     }
//! }
//! ```

pub mod converter;
pub mod link_trait;
#[cfg(any(test, feature = "mock-device"))]
pub mod mock_device;
pub mod protocol;
pub mod serial;
pub mod worker;

pub use converter::{convert_reading, rescale_sample, GRAVITY_FACTOR};
pub use link_trait::SerialLink;
#[cfg(any(test, feature = "mock-device"))]
pub use mock_device::{MockDeviceHandle, MockUtmDevice, MOCK_PORT_NAME};
pub use protocol::{parse_calibration_input, parse_line, DeviceCommand};
pub use serial::{available_ports, PortInfo, SerialPortLink};
pub use worker::AcquisitionWorker;

use crate::config::AppConfig;
use crate::types::{
    AcquisitionState, CollectionStats, ConnectionStatus, Sample, SampleGeometry, TestMode,
};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Capacity of the UI → worker command queue
const COMMAND_CHANNEL_CAPACITY: usize = 256;

/// Message sent from the UI to the backend
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCommand {
    /// Open the named serial port
    Connect {
        /// Port name as reported by [`list_ports`]
        port: String,
    },
    /// Close the serial port
    Disconnect,
    /// Send the mode selection command
    SetMode(TestMode),
    /// Calibrate against a reference weight in grams
    Calibrate(f64),
    /// Zero the load reading
    Tare,
    /// Start streaming and polling
    StartAcquisition,
    /// Stop streaming and polling
    StopAcquisition,
    /// Geometry for samples converted from now on
    SetGeometry(SampleGeometry),
    /// Reset collection counters
    ResetStats,
    /// Request port list refresh (async)
    RefreshPorts,
    /// Shutdown the backend
    Shutdown,
}

/// Message sent from the backend to the UI
#[derive(Debug, Clone, PartialEq)]
pub enum BackendMessage {
    /// Connection status changed
    ConnectionStatus(ConnectionStatus),
    /// The port could not be opened
    ConnectionError(String),
    /// The port failed while a test was running
    ConnectionLost(String),
    /// The machine acknowledged a mode change
    ModeChanged(TestMode),
    /// Acquisition started or stopped
    AcquisitionState(AcquisitionState),
    /// New converted sample
    Sample(Sample),
    /// A data line could not be decoded
    ParseError { line: String, reason: String },
    /// A command was rejected or failed to write
    CommandError(String),
    /// Statistics update
    Stats(CollectionStats),
    /// Port list update (response to RefreshPorts)
    PortList(Vec<PortInfo>),
    /// Backend is shutting down
    Shutdown,
}

/// List all selectable ports (plus the simulated machine if enabled)
///
/// This may block on slow drivers; prefer [`list_ports_async`] from the UI.
pub fn list_ports() -> Vec<PortInfo> {
    #[allow(unused_mut)]
    let mut ports = available_ports();

    #[cfg(feature = "mock-device")]
    ports.push(PortInfo {
        name: MOCK_PORT_NAME.to_string(),
        description: "Simulated testing machine".to_string(),
    });

    ports
}

/// List ports on a helper thread and deliver the result through a channel
pub fn list_ports_async(sender: Sender<BackendMessage>) {
    std::thread::spawn(move || {
        let ports = list_ports();
        let _ = sender.send(BackendMessage::PortList(ports));
    });
}

/// Frontend receiver for backend messages
pub struct FrontendReceiver {
    /// Receiver for backend messages
    pub receiver: Receiver<BackendMessage>,
    /// Sender for commands to the backend
    pub command_sender: Sender<BackendCommand>,
}

impl FrontendReceiver {
    /// Receive all pending messages
    pub fn drain(&self) -> Vec<BackendMessage> {
        let mut messages = Vec::new();
        while let Ok(msg) = self.receiver.try_recv() {
            messages.push(msg);
        }
        messages
    }

    /// Send a command to the backend
    pub fn send_command(&self, cmd: BackendCommand) -> bool {
        self.command_sender.send(cmd).is_ok()
    }
}

/// The UTM backend that runs in a separate thread
pub struct UtmBackend {
    /// The worker, created with its channels
    worker: AcquisitionWorker,
    /// Running flag
    running: Arc<AtomicBool>,
}

impl UtmBackend {
    /// Create a backend for real serial ports
    pub fn new(config: AppConfig) -> (Self, FrontendReceiver) {
        Self::with_link(config, Box::new(SerialPortLink::new()))
    }

    /// Create a backend around a specific link (simulated machine, tests)
    pub fn with_link(config: AppConfig, link: Box<dyn SerialLink>) -> (Self, FrontendReceiver) {
        let (cmd_tx, cmd_rx) = bounded(COMMAND_CHANNEL_CAPACITY);
        // Bounded for backpressure; samples block rather than drop when full
        let (msg_tx, msg_rx) = bounded(config.acquisition.channel_capacity.max(1));
        let running = Arc::new(AtomicBool::new(true));

        let worker = AcquisitionWorker::with_link(config, cmd_rx, msg_tx, running.clone(), link);

        let frontend = FrontendReceiver {
            receiver: msg_rx,
            command_sender: cmd_tx,
        };

        (Self { worker, running }, frontend)
    }

    /// Run the backend loop
    pub fn run(mut self) {
        self.worker.run();
    }

    /// Get a handle to stop the backend
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }
}
