//! Application state and control logic
//!
//! [`UtmController`] is the single owner of everything the operator can see
//! or change: the session, the selected mode, the connection state and the
//! presentation adapter. It validates each operation synchronously, forwards
//! the resulting command to the acquisition worker and folds the worker's
//! messages back into state in [`UtmController::pump`].
//!
//! The controller is UI-toolkit agnostic. The egui frontend calls it once per
//! frame; integration tests drive it directly.

use crate::backend::protocol::parse_calibration_input;
use crate::backend::{BackendCommand, BackendMessage, FrontendReceiver, PortInfo};
use crate::config::AppConfig;
use crate::error::{Result, UtmError};
use crate::session::{self, default_filename, Session};
use crate::types::{
    AcquisitionState, CollectionStats, ConnectionStatus, Sample, SampleGeometry, TestMode,
};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

/// Receives state changes the operator should see
///
/// Notifications arrive in the same order samples were read from the device.
pub trait PresentationAdapter {
    /// A sample was appended to the session
    fn on_sample_appended(&mut self, sample: &Sample);

    /// The session was cleared
    fn on_reset(&mut self);

    /// Every sample was rescaled to a new geometry
    fn on_geometry_changed(&mut self, geometry: &SampleGeometry, samples: &[Sample]);
}

/// Severity of a [`Notice`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A message for the operator, shown as a popup or toast
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub message: String,
}

impl Notice {
    fn new(level: NoticeLevel, title: &str, message: impl Into<String>) -> Self {
        Self {
            level,
            title: title.to_string(),
            message: message.into(),
        }
    }
}

/// Which controls accept input right now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControlAvailability {
    /// Connect/disconnect toggle
    pub connect: bool,
    pub refresh_ports: bool,
    /// Compression and tension buttons
    pub mode: bool,
    /// Calibration entry and button
    pub calibrate: bool,
    pub tare: bool,
    /// Area/length entries and the update button
    pub geometry: bool,
    pub start: bool,
    pub stop: bool,
    pub reset: bool,
    pub save: bool,
}

impl ControlAvailability {
    /// Derive the enabled controls from connection and test state
    pub fn compute(connected: bool, state: AcquisitionState, stopped: bool) -> Self {
        if !connected {
            return Self {
                connect: true,
                refresh_ports: true,
                ..Self::default()
            };
        }

        if state.is_running() {
            return Self {
                stop: true,
                ..Self::default()
            };
        }

        // Mode, calibration and tare stay locked after a stop until reset
        Self {
            connect: true,
            refresh_ports: true,
            mode: !stopped,
            calibrate: !stopped,
            tare: !stopped,
            geometry: true,
            start: true,
            stop: false,
            reset: stopped,
            save: true,
        }
    }
}

/// Status bar contents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusView {
    pub connection: String,
    pub mode: String,
    pub test_status: String,
    pub samples: String,
    pub parse_errors: u64,
}

/// Latest measured values, zero when the session is empty
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CurrentValues {
    pub force_n: f64,
    pub displacement_mm: f64,
    pub stress_pa: f64,
    pub strain_pct: f64,
}

impl CurrentValues {
    fn from_sample(sample: &Sample) -> Self {
        Self {
            force_n: sample.force_n,
            displacement_mm: sample.displacement_mm,
            stress_pa: sample.stress_pa,
            strain_pct: sample.strain_pct,
        }
    }

    pub fn force_text(&self) -> String {
        format!("{:.2} N", self.force_n)
    }

    pub fn displacement_text(&self) -> String {
        format!("{:.2} mm", self.displacement_mm)
    }

    pub fn stress_text(&self) -> String {
        format!("{:.2} Pa", self.stress_pa)
    }

    pub fn strain_text(&self) -> String {
        format!("{:.2} %", self.strain_pct)
    }
}

/// Application state shared by the UI and the acquisition backend
pub struct UtmController<P: PresentationAdapter> {
    frontend: FrontendReceiver,
    adapter: P,
    session: Session,
    connection: ConnectionStatus,
    acquisition: AcquisitionState,
    mode: TestMode,
    /// A test was stopped and the session has not been reset since
    stopped: bool,
    stats: CollectionStats,
    parse_errors: u64,
    ports: Vec<PortInfo>,
    /// Port of the pending or current connection
    port: Option<String>,
    /// Port of the last successful connection
    last_connected_port: Option<String>,
    last_export_dir: Option<PathBuf>,
    export_prefix: String,
    notices: VecDeque<Notice>,
    backend_alive: bool,
}

impl<P: PresentationAdapter> UtmController<P> {
    /// Create a controller bound to a running backend
    pub fn new(frontend: FrontendReceiver, adapter: P, config: &AppConfig) -> Self {
        Self {
            frontend,
            adapter,
            session: Session::with_geometry(config.geometry),
            connection: ConnectionStatus::Disconnected,
            acquisition: AcquisitionState::Idle,
            mode: TestMode::Unset,
            stopped: false,
            stats: CollectionStats::default(),
            parse_errors: 0,
            ports: Vec::new(),
            port: config.serial.port_name.clone(),
            last_connected_port: None,
            last_export_dir: config.export.directory.clone(),
            export_prefix: config.export.filename_prefix.clone(),
            notices: VecDeque::new(),
            backend_alive: true,
        }
    }

    fn send(&self, command: BackendCommand) -> Result<()> {
        if self.backend_alive && self.frontend.send_command(command) {
            Ok(())
        } else {
            Err(UtmError::Channel("acquisition backend is not running".to_string()))
        }
    }

    fn ensure_idle(&self) -> Result<()> {
        if self.acquisition.is_running() {
            Err(UtmError::AcquisitionActive)
        } else {
            Ok(())
        }
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(UtmError::NotConnected)
        }
    }

    // ==================== Operations ====================

    /// Ask the backend to re-enumerate serial ports
    pub fn refresh_ports(&self) -> Result<()> {
        self.send(BackendCommand::RefreshPorts)
    }

    /// Open the given port
    pub fn connect(&mut self, port: &str) -> Result<()> {
        self.ensure_idle()?;
        let port = port.trim();
        if port.is_empty() {
            return Err(UtmError::Validation("Please select a port".to_string()));
        }
        self.port = Some(port.to_string());
        self.send(BackendCommand::Connect {
            port: port.to_string(),
        })
    }

    /// Close the port
    pub fn disconnect(&mut self) -> Result<()> {
        self.ensure_idle()?;
        self.send(BackendCommand::Disconnect)
    }

    /// Connect to `port` when disconnected, otherwise disconnect
    pub fn toggle_connection(&mut self, port: &str) -> Result<()> {
        if self.is_connected() {
            self.disconnect()
        } else {
            self.connect(port)
        }
    }

    /// Select compression or tension on the machine
    ///
    /// The mode shown and checked by [`start`](Self::start) only changes once
    /// the backend reports that the command reached the machine.
    pub fn set_mode(&mut self, mode: TestMode) -> Result<()> {
        self.ensure_idle()?;
        self.ensure_connected()?;
        if !mode.is_set() {
            return Err(UtmError::ModeUnset);
        }
        self.send(BackendCommand::SetMode(mode))
    }

    /// Calibrate with the reference weight typed by the operator
    pub fn calibrate(&mut self, input: &str) -> Result<f64> {
        self.ensure_idle()?;
        self.ensure_connected()?;
        let grams = parse_calibration_input(input)?;
        self.send(BackendCommand::Calibrate(grams))?;
        self.push_notice(
            NoticeLevel::Info,
            "Calibration",
            format!("Sent calibration value: {:?}", grams),
        );
        Ok(grams)
    }

    /// Zero the load reading
    pub fn tare(&mut self) -> Result<()> {
        self.ensure_idle()?;
        self.ensure_connected()?;
        self.send(BackendCommand::Tare)
    }

    /// Start a test
    ///
    /// Nothing is sent to the backend unless a mode has been selected.
    pub fn start(&mut self) -> Result<()> {
        self.ensure_idle()?;
        if !self.mode.is_set() {
            return Err(UtmError::ModeUnset);
        }
        self.ensure_connected()?;
        self.send(BackendCommand::StartAcquisition)
    }

    /// Stop the running test; a no-op when idle
    pub fn stop(&mut self) -> Result<()> {
        if !self.acquisition.is_running() {
            return Ok(());
        }
        self.send(BackendCommand::StopAcquisition)
    }

    /// Clear the session for a new test; rejected while a test is running
    pub fn reset(&mut self) -> Result<()> {
        self.ensure_idle()?;
        self.session.reset();
        self.stopped = false;
        self.parse_errors = 0;
        self.adapter.on_reset();
        let _ = self.send(BackendCommand::ResetStats);
        tracing::info!("Session reset");
        Ok(())
    }

    /// Apply a new specimen geometry to the session and future samples
    pub fn update_geometry(&mut self, geometry: SampleGeometry) -> Result<()> {
        self.ensure_idle()?;
        self.session.rescale(geometry)?;
        self.send(BackendCommand::SetGeometry(geometry))?;
        self.adapter
            .on_geometry_changed(&geometry, self.session.samples());
        Ok(())
    }

    /// Parse the area and length entries and apply them
    pub fn update_geometry_input(&mut self, area: &str, length: &str) -> Result<()> {
        let invalid = || {
            UtmError::Validation(
                "Please enter valid numeric values for area and length".to_string(),
            )
        };
        let area_mm2: f64 = area.trim().parse().map_err(|_| invalid())?;
        let length_mm: f64 = length.trim().parse().map_err(|_| invalid())?;
        self.update_geometry(SampleGeometry::new(area_mm2, length_mm))
    }

    /// Write the session to a CSV file
    pub fn export(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        session::export(&self.session, path)?;
        self.last_export_dir = path.parent().map(Path::to_path_buf);
        self.push_notice(
            NoticeLevel::Info,
            "Success",
            format!("Data saved to {}", path.display()),
        );
        Ok(())
    }

    /// Stop any test, close the port and stop the backend
    pub fn shutdown(&mut self) {
        if self.acquisition.is_running() {
            let _ = self.send(BackendCommand::StopAcquisition);
        }
        let _ = self.send(BackendCommand::Disconnect);
        let _ = self.send(BackendCommand::Shutdown);
    }

    // ==================== Backend messages ====================

    /// Apply every pending backend message; returns how many were handled
    pub fn pump(&mut self) -> usize {
        let messages = self.frontend.drain();
        let count = messages.len();
        for message in messages {
            self.handle_message(message);
        }
        count
    }

    fn handle_message(&mut self, message: BackendMessage) {
        match message {
            BackendMessage::ConnectionStatus(status) => {
                self.connection = status;
                match status {
                    ConnectionStatus::Connected => {
                        self.last_connected_port = self.port.clone();
                    }
                    ConnectionStatus::Disconnected | ConnectionStatus::Error => {
                        self.acquisition = AcquisitionState::Idle;
                    }
                }
            }
            BackendMessage::ConnectionError(reason) => {
                self.push_notice(
                    NoticeLevel::Error,
                    "Error",
                    format!("Failed to connect to port: {}", reason),
                );
            }
            BackendMessage::ConnectionLost(reason) => {
                if !self.session.is_empty() {
                    self.stopped = true;
                }
                self.acquisition = AcquisitionState::Idle;
                self.push_notice(
                    NoticeLevel::Error,
                    "Connection Lost",
                    format!("The connection to the machine was lost: {}", reason),
                );
            }
            BackendMessage::ModeChanged(mode) => {
                self.mode = mode;
                self.push_notice(NoticeLevel::Info, "Mode Set", format!("Mode set to {}", mode));
            }
            BackendMessage::AcquisitionState(state) => {
                if self.acquisition.is_running() && !state.is_running() {
                    self.stopped = true;
                }
                self.acquisition = state;
            }
            BackendMessage::Sample(sample) => {
                self.session.append(sample);
                self.adapter.on_sample_appended(&sample);
            }
            BackendMessage::ParseError { line, reason } => {
                self.parse_errors += 1;
                tracing::debug!("Skipped malformed line {:?}: {}", line, reason);
            }
            BackendMessage::CommandError(reason) => {
                self.push_notice(NoticeLevel::Warning, "Warning", reason);
            }
            BackendMessage::Stats(stats) => {
                self.parse_errors = self.parse_errors.max(stats.parse_errors);
                self.stats = stats;
            }
            BackendMessage::PortList(ports) => {
                let keep = self
                    .port
                    .as_ref()
                    .is_some_and(|p| ports.iter().any(|info| &info.name == p));
                if !keep {
                    self.port = ports.first().map(|info| info.name.clone());
                }
                self.ports = ports;
            }
            BackendMessage::Shutdown => {
                self.backend_alive = false;
            }
        }
    }

    fn push_notice(&mut self, level: NoticeLevel, title: &str, message: impl Into<String>) {
        self.notices.push_back(Notice::new(level, title, message));
    }

    /// Record an error for display
    pub fn report_error(&mut self, error: &UtmError) {
        if !error.is_user_facing() {
            tracing::debug!("Not shown to operator: {}", error);
            return;
        }
        let (level, title) = match error {
            UtmError::ModeUnset => (NoticeLevel::Warning, "Test Mode Error"),
            UtmError::Validation(_) => (NoticeLevel::Error, "Invalid Input"),
            UtmError::NoData => (NoticeLevel::Warning, "No Data"),
            _ => (NoticeLevel::Error, "Error"),
        };
        self.push_notice(level, title, error.to_string());
    }

    /// Take the oldest pending notice
    pub fn pop_notice(&mut self) -> Option<Notice> {
        self.notices.pop_front()
    }

    // ==================== Views ====================

    pub fn connection_status(&self) -> ConnectionStatus {
        self.connection
    }

    pub fn is_connected(&self) -> bool {
        self.connection == ConnectionStatus::Connected
    }

    pub fn acquisition_state(&self) -> AcquisitionState {
        self.acquisition
    }

    pub fn mode(&self) -> TestMode {
        self.mode
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn adapter(&self) -> &P {
        &self.adapter
    }

    pub fn stats(&self) -> &CollectionStats {
        &self.stats
    }

    pub fn ports(&self) -> &[PortInfo] {
        &self.ports
    }

    /// Port shown in the selector
    pub fn selected_port(&self) -> Option<&str> {
        self.port.as_deref()
    }

    pub fn select_port(&mut self, port: impl Into<String>) {
        self.port = Some(port.into());
    }

    pub fn last_connected_port(&self) -> Option<&str> {
        self.last_connected_port.as_deref()
    }

    pub fn last_export_dir(&self) -> Option<&Path> {
        self.last_export_dir.as_deref()
    }

    pub fn controls(&self) -> ControlAvailability {
        ControlAvailability::compute(self.is_connected(), self.acquisition, self.stopped)
    }

    pub fn current_values(&self) -> CurrentValues {
        self.session
            .latest()
            .map(CurrentValues::from_sample)
            .unwrap_or_default()
    }

    pub fn status(&self) -> StatusView {
        let test_status = if self.acquisition.is_running() {
            "Running"
        } else if self.stopped {
            "Stopped"
        } else {
            "Ready"
        };
        StatusView {
            connection: self.connection.to_string(),
            mode: self.mode.status_text().to_string(),
            test_status: test_status.to_string(),
            samples: format!("Samples: {}", self.session.len()),
            parse_errors: self.parse_errors,
        }
    }

    /// Filename offered in the save dialog
    pub fn suggested_filename(&self) -> String {
        default_filename(&self.export_prefix, &chrono::Local::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::converter::convert_reading;
    use crate::types::RawReading;
    use crossbeam_channel::{bounded, Receiver, Sender};

    #[derive(Default)]
    struct RecordingAdapter {
        appended: Vec<Sample>,
        resets: usize,
        geometries: Vec<SampleGeometry>,
    }

    impl PresentationAdapter for RecordingAdapter {
        fn on_sample_appended(&mut self, sample: &Sample) {
            self.appended.push(*sample);
        }

        fn on_reset(&mut self) {
            self.resets += 1;
        }

        fn on_geometry_changed(&mut self, geometry: &SampleGeometry, _samples: &[Sample]) {
            self.geometries.push(*geometry);
        }
    }

    struct Harness {
        controller: UtmController<RecordingAdapter>,
        commands: Receiver<BackendCommand>,
        messages: Sender<BackendMessage>,
    }

    impl Harness {
        fn new() -> Self {
            let (cmd_tx, cmd_rx) = bounded(64);
            let (msg_tx, msg_rx) = bounded(64);
            let frontend = FrontendReceiver {
                receiver: msg_rx,
                command_sender: cmd_tx,
            };
            Self {
                controller: UtmController::new(
                    frontend,
                    RecordingAdapter::default(),
                    &AppConfig::default(),
                ),
                commands: cmd_rx,
                messages: msg_tx,
            }
        }

        fn deliver(&mut self, message: BackendMessage) {
            self.messages.send(message).unwrap();
            self.controller.pump();
        }

        fn sent(&self) -> Vec<BackendCommand> {
            self.commands.try_iter().collect()
        }

        fn connected() -> Self {
            let mut h = Self::new();
            h.controller.connect("COM3").unwrap();
            h.deliver(BackendMessage::ConnectionStatus(ConnectionStatus::Connected));
            h.sent();
            h
        }
    }

    fn sample(mass_g: f64, displacement_mm: f64) -> Sample {
        let reading = RawReading {
            mass_g,
            displacement_mm,
            voltage_v: 1.5,
            resistance_ohm: 100.0,
        };
        convert_reading(&reading, &SampleGeometry::default(), 0.0)
    }

    #[test]
    fn test_initial_state() {
        let h = Harness::new();
        let status = h.controller.status();
        assert_eq!(status.connection, "Not Connected");
        assert_eq!(status.mode, "No Mode Selected");
        assert_eq!(status.test_status, "Ready");
        assert_eq!(status.samples, "Samples: 0");

        let controls = h.controller.controls();
        assert!(controls.connect && controls.refresh_ports);
        assert!(!controls.start && !controls.mode && !controls.save);
    }

    #[test]
    fn test_start_without_mode_sends_nothing() {
        let mut h = Harness::connected();
        assert!(matches!(h.controller.start(), Err(UtmError::ModeUnset)));
        assert!(h.sent().is_empty());
    }

    #[test]
    fn test_commands_require_connection() {
        let mut h = Harness::new();
        assert!(matches!(
            h.controller.set_mode(TestMode::Tension),
            Err(UtmError::NotConnected)
        ));
        assert!(matches!(h.controller.tare(), Err(UtmError::NotConnected)));
        assert!(matches!(
            h.controller.calibrate("100"),
            Err(UtmError::NotConnected)
        ));
        assert!(h.sent().is_empty());
    }

    #[test]
    fn test_calibration_validation() {
        let mut h = Harness::connected();
        assert!(matches!(
            h.controller.calibrate(""),
            Err(UtmError::Validation(_))
        ));
        assert!(matches!(
            h.controller.calibrate("ten"),
            Err(UtmError::Validation(_))
        ));
        assert!(h.sent().is_empty());

        assert_eq!(h.controller.calibrate("250").unwrap(), 250.0);
        assert_eq!(h.sent(), vec![BackendCommand::Calibrate(250.0)]);
    }

    #[test]
    fn test_full_test_cycle() {
        let mut h = Harness::connected();

        h.controller.set_mode(TestMode::Tension).unwrap();
        assert_eq!(h.controller.mode(), TestMode::Unset);
        h.deliver(BackendMessage::ModeChanged(TestMode::Tension));
        assert_eq!(h.controller.mode(), TestMode::Tension);
        h.controller.start().unwrap();
        assert_eq!(
            h.sent(),
            vec![
                BackendCommand::SetMode(TestMode::Tension),
                BackendCommand::StartAcquisition
            ]
        );

        h.deliver(BackendMessage::AcquisitionState(AcquisitionState::Running));
        let running = h.controller.controls();
        assert!(running.stop && !running.reset);
        assert!(!running.start && !running.mode && !running.connect && !running.save);
        assert!(matches!(h.controller.tare(), Err(UtmError::AcquisitionActive)));
        assert!(matches!(
            h.controller.update_geometry(SampleGeometry::new(10.0, 10.0)),
            Err(UtmError::AcquisitionActive)
        ));

        h.deliver(BackendMessage::Sample(sample(10.0, 2.0)));
        h.deliver(BackendMessage::Sample(sample(20.0, 4.0)));
        assert!(matches!(h.controller.reset(), Err(UtmError::AcquisitionActive)));
        assert_eq!(h.controller.adapter().resets, 0);
        assert_eq!(h.controller.session().len(), 2);
        assert_eq!(h.controller.adapter().appended.len(), 2);
        assert_eq!(h.controller.status().samples, "Samples: 2");
        assert_eq!(h.controller.current_values().displacement_text(), "4.00 mm");

        h.controller.stop().unwrap();
        h.deliver(BackendMessage::AcquisitionState(AcquisitionState::Idle));
        assert_eq!(h.controller.status().test_status, "Stopped");
        let stopped = h.controller.controls();
        assert!(stopped.start && stopped.save && stopped.geometry && stopped.reset);
        assert!(!stopped.mode && !stopped.calibrate && !stopped.tare && !stopped.stop);

        h.controller.reset().unwrap();
        assert!(h.controller.session().is_empty());
        assert_eq!(h.controller.adapter().resets, 1);
        assert_eq!(h.controller.current_values(), CurrentValues::default());
        assert_eq!(h.controller.current_values().force_text(), "0.00 N");
        assert_eq!(h.controller.status().test_status, "Ready");
        assert!(h.controller.controls().mode);
    }

    #[test]
    fn test_mode_waits_for_machine_acknowledgement() {
        let mut h = Harness::connected();
        h.controller.set_mode(TestMode::Compression).unwrap();
        assert_eq!(h.sent(), vec![BackendCommand::SetMode(TestMode::Compression)]);

        // The write to the machine failed, so no mode was applied
        h.deliver(BackendMessage::CommandError("write failed".to_string()));
        assert_eq!(h.controller.mode(), TestMode::Unset);
        assert_eq!(h.controller.status().mode, "No Mode Selected");
        assert!(matches!(h.controller.start(), Err(UtmError::ModeUnset)));
        assert!(h.sent().is_empty());
    }

    #[test]
    fn test_reset_rejected_while_running() {
        let mut h = Harness::connected();
        h.deliver(BackendMessage::AcquisitionState(AcquisitionState::Running));
        h.deliver(BackendMessage::Sample(sample(10.0, 2.0)));
        h.sent();

        assert!(!h.controller.controls().reset);
        assert!(matches!(h.controller.reset(), Err(UtmError::AcquisitionActive)));
        assert_eq!(h.controller.session().len(), 1);
        assert!(h.controller.acquisition_state().is_running());
        assert!(h.sent().is_empty());
    }

    #[test]
    fn test_parse_errors_never_become_notices() {
        let mut h = Harness::new();
        h.controller.report_error(&UtmError::parse(";x;1;1;1", "mass"));
        assert!(h.controller.pop_notice().is_none());

        h.controller.report_error(&UtmError::NoData);
        assert_eq!(h.controller.pop_notice().unwrap().level, NoticeLevel::Warning);
    }

    #[test]
    fn test_geometry_update_rescales_and_notifies() {
        let mut h = Harness::connected();
        h.deliver(BackendMessage::Sample(sample(10.0, 2.0)));

        h.controller.update_geometry_input("50", "25").unwrap();
        assert_eq!(
            h.sent(),
            vec![BackendCommand::SetGeometry(SampleGeometry::new(50.0, 25.0))]
        );
        assert_eq!(
            h.controller.adapter().geometries,
            vec![SampleGeometry::new(50.0, 25.0)]
        );
        assert_eq!(h.controller.current_values().strain_text(), "8.00 %");

        assert!(matches!(
            h.controller.update_geometry_input("abc", "25"),
            Err(UtmError::Validation(msg)) if msg.contains("valid numeric values")
        ));
        assert!(matches!(
            h.controller.update_geometry_input("-1", "25"),
            Err(UtmError::Validation(_))
        ));
        assert!(h.sent().is_empty());
        assert_eq!(h.controller.session().geometry(), SampleGeometry::new(50.0, 25.0));
    }

    #[test]
    fn test_connection_loss_surfaces_notice() {
        let mut h = Harness::connected();
        h.deliver(BackendMessage::AcquisitionState(AcquisitionState::Running));
        h.deliver(BackendMessage::Sample(sample(1.0, 0.1)));

        h.deliver(BackendMessage::AcquisitionState(AcquisitionState::Idle));
        h.deliver(BackendMessage::ConnectionLost("unplugged".to_string()));
        h.deliver(BackendMessage::ConnectionStatus(ConnectionStatus::Disconnected));

        assert!(!h.controller.is_connected());
        assert_eq!(h.controller.acquisition_state(), AcquisitionState::Idle);
        let notice = h.controller.pop_notice().unwrap();
        assert_eq!(notice.level, NoticeLevel::Error);
        assert!(notice.message.contains("unplugged"));
        assert_eq!(h.controller.session().len(), 1);
    }

    #[test]
    fn test_connection_error_notice() {
        let mut h = Harness::new();
        h.controller.connect("COM9").unwrap();
        h.deliver(BackendMessage::ConnectionStatus(ConnectionStatus::Error));
        h.deliver(BackendMessage::ConnectionError("COM9: busy".to_string()));

        assert_eq!(h.controller.status().connection, "Connection Failed");
        let notice = h.controller.pop_notice().unwrap();
        assert_eq!(notice.message, "Failed to connect to port: COM9: busy");
        assert!(h.controller.last_connected_port().is_none());
    }

    #[test]
    fn test_port_list_preselects_first() {
        let mut h = Harness::new();
        let ports = vec![
            PortInfo {
                name: "COM3".to_string(),
                description: String::new(),
            },
            PortInfo {
                name: "COM4".to_string(),
                description: String::new(),
            },
        ];
        h.deliver(BackendMessage::PortList(ports.clone()));
        assert_eq!(h.controller.selected_port(), Some("COM3"));

        h.controller.select_port("COM4");
        h.deliver(BackendMessage::PortList(ports));
        assert_eq!(h.controller.selected_port(), Some("COM4"));
    }

    #[test]
    fn test_export_empty_session() {
        let mut h = Harness::connected();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        assert!(matches!(h.controller.export(&path), Err(UtmError::NoData)));
        assert!(!path.exists());

        h.deliver(BackendMessage::Sample(sample(1.0, 0.1)));
        h.controller.export(&path).unwrap();
        assert!(path.exists());
        assert_eq!(h.controller.last_export_dir(), Some(dir.path()));
    }

    #[test]
    fn test_parse_errors_counted() {
        let mut h = Harness::connected();
        h.deliver(BackendMessage::ParseError {
            line: ";abc;2;1.5;100".to_string(),
            reason: "mass".to_string(),
        });
        assert_eq!(h.controller.status().parse_errors, 1);
        assert!(h.controller.session().is_empty());
        assert!(h.controller.pop_notice().is_none());
    }

    #[test]
    fn test_shutdown_sequence() {
        let mut h = Harness::connected();
        h.deliver(BackendMessage::AcquisitionState(AcquisitionState::Running));
        h.controller.shutdown();
        assert_eq!(
            h.sent(),
            vec![
                BackendCommand::StopAcquisition,
                BackendCommand::Disconnect,
                BackendCommand::Shutdown
            ]
        );
    }

    #[test]
    fn test_commands_rejected_after_backend_shutdown() {
        let mut h = Harness::connected();
        h.deliver(BackendMessage::Shutdown);
        assert!(matches!(h.controller.tare(), Err(UtmError::Channel(_))));
        assert!(matches!(h.controller.refresh_ports(), Err(UtmError::Channel(_))));
        assert!(h.sent().is_empty());
    }

    #[test]
    fn test_suggested_filename() {
        let h = Harness::new();
        let name = h.controller.suggested_filename();
        assert!(name.starts_with("utm_test_data_"));
        assert!(name.ends_with(".csv"));
        assert_eq!(name.len(), "utm_test_data_YYYYMMDD_HHMMSS.csv".len());
    }
}
