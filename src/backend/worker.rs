//! Acquisition worker thread
//!
//! This module contains the loop that owns the serial link. It runs in its own
//! thread and talks to the UI exclusively through crossbeam channels, so the
//! session store never has to be shared between threads.
//!
//! # Responsibilities
//!
//! - **Command processing**: connect, mode, calibrate, tare, start, stop
//! - **Line polling**: while running, read one line per iteration, parse it
//!   and convert it with the current geometry
//! - **Statistics tracking**: samples, parse errors and discarded noise lines
//! - **Connection loss**: a failed read drops back to idle and closes the port
//!
//! # Cancellation
//!
//! Commands are drained at the top of every iteration, so a stop request is
//! observed after at most one in-flight read (bounded by the port timeout).
//! No read is started once the stop has been seen.

use crate::backend::converter::convert_reading;
use crate::backend::link_trait::SerialLink;
use crate::backend::protocol::{parse_line, DeviceCommand};
use crate::backend::serial::SerialPortLink;
use crate::backend::{list_ports_async, BackendCommand, BackendMessage};
use crate::config::AppConfig;
use crate::error::UtmError;
use crate::types::{
    AcquisitionState, CollectionStats, ConnectionStatus, SampleGeometry, TestMode,
};
use crossbeam_channel::{Receiver, Sender, TryRecvError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

#[cfg(feature = "mock-device")]
use crate::backend::mock_device::{MockUtmDevice, MOCK_PORT_NAME};

/// Interval between periodic statistics updates while running
const STATS_INTERVAL: Duration = Duration::from_millis(500);

/// The worker that owns the connection and runs the acquisition loop
pub struct AcquisitionWorker {
    /// Application configuration
    config: AppConfig,
    /// Command receiver from the UI
    command_rx: Receiver<BackendCommand>,
    /// Message sender to the UI
    message_tx: Sender<BackendMessage>,
    /// Running flag
    running: Arc<AtomicBool>,
    /// Connection to the machine (real port or simulated device)
    link: Box<dyn SerialLink>,
    /// Whether the link was swapped for the simulated machine
    #[cfg(feature = "mock-device")]
    using_mock: bool,
    /// Current connection status
    connection_status: ConnectionStatus,
    /// Idle or running
    state: AcquisitionState,
    /// Mode last sent to the machine
    mode: TestMode,
    /// Geometry applied to new samples
    geometry: SampleGeometry,
    /// Wall-clock seconds at worker creation
    epoch_secs: f64,
    /// Monotonic clock paired with `epoch_secs`
    clock: Instant,
    /// Statistics
    stats: CollectionStats,
    /// Last time stats were sent to UI
    last_stats_time: Instant,
}

impl AcquisitionWorker {
    /// Create a worker around an existing link
    pub fn with_link(
        config: AppConfig,
        command_rx: Receiver<BackendCommand>,
        message_tx: Sender<BackendMessage>,
        running: Arc<AtomicBool>,
        link: Box<dyn SerialLink>,
    ) -> Self {
        let epoch_secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        let geometry = config.geometry;

        Self {
            config,
            command_rx,
            message_tx,
            running,
            link,
            #[cfg(feature = "mock-device")]
            using_mock: false,
            connection_status: ConnectionStatus::Disconnected,
            state: AcquisitionState::Idle,
            mode: TestMode::Unset,
            geometry,
            epoch_secs,
            clock: Instant::now(),
            stats: CollectionStats::default(),
            last_stats_time: Instant::now(),
        }
    }

    /// Run the main worker loop
    pub fn run(&mut self) {
        tracing::info!("Acquisition worker started");

        while self.running.load(Ordering::SeqCst) {
            self.tick();
        }

        // Cleanup
        if self.state.is_running() {
            let _ = self.link.write_command(&DeviceCommand::Stop);
            self.state = AcquisitionState::Idle;
        }
        self.link.close();

        let _ = self.message_tx.send(BackendMessage::Shutdown);
        tracing::info!("Acquisition worker stopped");
    }

    /// One loop iteration: drain commands, then read at most one line
    fn tick(&mut self) {
        self.process_commands();

        if !self.running.load(Ordering::SeqCst) {
            return;
        }

        if self.state.is_running() {
            let handled = self.poll_line();

            if self.last_stats_time.elapsed() >= STATS_INTERVAL {
                self.send_stats();
                self.last_stats_time = Instant::now();
            }

            if handled {
                return;
            }
        }

        self.idle_sleep();
    }

    /// Process pending commands from the UI
    fn process_commands(&mut self) {
        loop {
            match self.command_rx.try_recv() {
                Ok(cmd) => self.handle_command(cmd),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.running.store(false, Ordering::SeqCst);
                    break;
                }
            }
        }
    }

    /// Handle a single command
    fn handle_command(&mut self, cmd: BackendCommand) {
        match cmd {
            BackendCommand::Connect { port } => self.handle_connect(&port),
            BackendCommand::Disconnect => self.handle_disconnect(),
            BackendCommand::SetMode(mode) => self.set_mode(mode),
            BackendCommand::Calibrate(grams) => {
                self.send_device_command(DeviceCommand::Calibrate(grams));
            }
            BackendCommand::Tare => {
                self.send_device_command(DeviceCommand::Tare);
            }
            BackendCommand::StartAcquisition => self.start_acquisition(),
            BackendCommand::StopAcquisition => self.stop_acquisition(),
            BackendCommand::SetGeometry(geometry) => self.set_geometry(geometry),
            BackendCommand::ResetStats => {
                self.stats = CollectionStats::default();
                self.send_stats();
            }
            BackendCommand::RefreshPorts => list_ports_async(self.message_tx.clone()),
            BackendCommand::Shutdown => {
                tracing::info!("Shutdown requested");
                self.running.store(false, Ordering::SeqCst);
            }
        }
    }

    /// Swap between the real port and the simulated machine
    #[cfg(feature = "mock-device")]
    fn select_link(&mut self, port: &str) {
        let want_mock = port == MOCK_PORT_NAME;
        if want_mock != self.using_mock {
            self.link.close();
            self.link = if want_mock {
                Box::new(MockUtmDevice::simulated())
            } else {
                Box::new(SerialPortLink::new())
            };
            self.using_mock = want_mock;
        }
    }

    fn handle_connect(&mut self, port: &str) {
        if self.state.is_running() {
            self.report_command_error(&UtmError::AcquisitionActive);
            return;
        }

        #[cfg(feature = "mock-device")]
        self.select_link(port);

        tracing::info!("Connecting to {}", port);
        match self.link.open(port) {
            Ok(()) => {
                self.stats = CollectionStats::default();
                self.update_connection_status(ConnectionStatus::Connected);
            }
            Err(e) => {
                tracing::error!("Failed to connect: {}", e);
                self.update_connection_status(ConnectionStatus::Error);
                let _ = self
                    .message_tx
                    .send(BackendMessage::ConnectionError(e.to_string()));
            }
        }
    }

    fn handle_disconnect(&mut self) {
        if self.state.is_running() {
            self.stop_acquisition();
        }
        if let Some(port) = self.link.port_name() {
            tracing::info!("Disconnecting from {}", port);
        }
        self.link.close();
        self.update_connection_status(ConnectionStatus::Disconnected);
    }

    fn set_mode(&mut self, mode: TestMode) {
        let Some(command) = DeviceCommand::for_mode(mode) else {
            self.report_command_error(&UtmError::ModeUnset);
            return;
        };
        if self.send_device_command(command) {
            self.mode = mode;
            tracing::info!("Test mode set to {}", mode);
            let _ = self.message_tx.send(BackendMessage::ModeChanged(mode));
        }
    }

    /// Write a configuration command; returns whether it reached the device
    fn send_device_command(&mut self, command: DeviceCommand) -> bool {
        if self.state.is_running() {
            self.report_command_error(&UtmError::AcquisitionActive);
            return false;
        }
        if !self.link.is_open() {
            self.report_command_error(&UtmError::NotConnected);
            return false;
        }

        match self.link.write_command(&command) {
            Ok(()) => {
                tracing::debug!("Sent command {}", command);
                true
            }
            Err(e) => {
                self.report_command_error(&e);
                false
            }
        }
    }

    fn start_acquisition(&mut self) {
        if self.state.is_running() {
            return;
        }
        if !self.mode.is_set() {
            self.report_command_error(&UtmError::ModeUnset);
            return;
        }
        if !self.link.is_open() {
            self.report_command_error(&UtmError::NotConnected);
            return;
        }

        if let Err(e) = self.link.write_command(&DeviceCommand::Start) {
            self.report_command_error(&e);
            return;
        }

        self.stats = CollectionStats::default();
        self.last_stats_time = Instant::now();
        self.update_acquisition_state(AcquisitionState::Running);
        tracing::info!("Acquisition started ({})", self.mode);
    }

    fn stop_acquisition(&mut self) {
        if !self.state.is_running() {
            return;
        }

        if self.link.is_open() {
            if let Err(e) = self.link.write_command(&DeviceCommand::Stop) {
                self.report_command_error(&e);
            }
        }

        self.update_acquisition_state(AcquisitionState::Idle);
        self.send_stats();
        tracing::info!(
            "Acquisition stopped: {} samples, {} parse errors",
            self.stats.samples,
            self.stats.parse_errors
        );
    }

    fn set_geometry(&mut self, geometry: SampleGeometry) {
        if !geometry.is_valid() {
            self.report_command_error(&UtmError::Validation(
                "Area and length must be positive values".to_string(),
            ));
            return;
        }
        self.geometry = geometry;
        tracing::debug!(
            "Geometry updated: area={} mm², length={} mm",
            geometry.area_mm2,
            geometry.length_mm
        );
    }

    /// Read and process at most one line; returns whether a line was consumed
    fn poll_line(&mut self) -> bool {
        match self.link.bytes_available() {
            Ok(0) => return false,
            Ok(_) => {}
            Err(e) => {
                self.handle_link_failure(e);
                return false;
            }
        }

        match self.link.read_line() {
            Ok(Some(line)) => {
                self.stats.total_bytes_read += line.len() as u64;
                self.handle_line(&line);
                true
            }
            Ok(None) => false,
            Err(e) => {
                self.handle_link_failure(e);
                false
            }
        }
    }

    fn handle_line(&mut self, raw: &str) {
        let line = raw.trim();

        match parse_line(line) {
            Ok(Some(reading)) => {
                let sample = convert_reading(&reading, &self.geometry, self.timestamp());
                self.stats.samples += 1;
                // Samples are never dropped; block until the UI catches up
                if self.message_tx.send(BackendMessage::Sample(sample)).is_err() {
                    tracing::warn!("UI channel closed, stopping worker");
                    self.running.store(false, Ordering::SeqCst);
                }
            }
            Ok(None) => {
                self.stats.discarded_lines += 1;
                tracing::trace!("Discarded device output: {:?}", line);
            }
            Err(UtmError::Parse { line, reason }) => {
                self.stats.parse_errors += 1;
                tracing::warn!("Parse error in {:?}: {}", line, reason);
                self.try_send_message(BackendMessage::ParseError { line, reason });
            }
            Err(e) => {
                self.stats.parse_errors += 1;
                tracing::warn!("Unexpected line error: {}", e);
            }
        }
    }

    /// The port failed while running: go idle and close it
    fn handle_link_failure(&mut self, error: UtmError) {
        tracing::error!("Connection lost during acquisition: {}", error);

        self.link.close();
        self.update_acquisition_state(AcquisitionState::Idle);

        let reason = match error {
            UtmError::ConnectionLost(reason) => reason,
            other => other.to_string(),
        };
        let _ = self.message_tx.send(BackendMessage::ConnectionLost(reason));
        self.update_connection_status(ConnectionStatus::Disconnected);
        self.send_stats();
    }

    /// Seconds since the Unix epoch, never decreasing within this worker
    fn timestamp(&self) -> f64 {
        self.epoch_secs + self.clock.elapsed().as_secs_f64()
    }

    fn idle_sleep(&self) {
        std::thread::sleep(Duration::from_millis(self.config.acquisition.idle_sleep_ms));
    }

    /// Update connection status and notify UI
    fn update_connection_status(&mut self, status: ConnectionStatus) {
        self.connection_status = status;
        let _ = self
            .message_tx
            .send(BackendMessage::ConnectionStatus(status));
    }

    /// Update acquisition state and notify UI
    fn update_acquisition_state(&mut self, state: AcquisitionState) {
        self.state = state;
        let _ = self
            .message_tx
            .send(BackendMessage::AcquisitionState(state));
    }

    fn report_command_error(&self, error: &UtmError) {
        tracing::warn!("Command rejected: {}", error);
        let _ = self
            .message_tx
            .send(BackendMessage::CommandError(error.to_string()));
    }

    /// Send statistics to UI (using try_send for backpressure)
    fn send_stats(&mut self) {
        let stats = self.stats.clone();
        self.try_send_message(BackendMessage::Stats(stats));
    }

    /// Try to send a message, tracking dropped messages if queue is full
    fn try_send_message(&mut self, msg: BackendMessage) {
        if self.message_tx.try_send(msg).is_err() {
            self.stats.dropped_messages += 1;
        }
    }
}
