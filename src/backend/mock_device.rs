//! Simulated testing machine
//!
//! [`MockUtmDevice`] implements [`SerialLink`] without any hardware. It is used
//! by the test suite and, with the `mock-device` feature, offered in the port
//! list so the interface can be exercised on a desk.
//!
//! # Behavior
//!
//! - Every written line is recorded and can be inspected through a
//!   [`MockDeviceHandle`].
//! - Tests can queue arbitrary inbound lines, including noise and malformed
//!   data lines.
//! - In simulation mode the device streams a load/displacement ramp while
//!   started (`1`) and goes quiet after `0`, honoring tare and mode commands.
//! - A read failure can be injected to emulate a cable being pulled.
//!
//! # Example
//!
//! ```ignore
//! use utm_rs::backend::mock_device::MockUtmDevice;
//!
//! let device = MockUtmDevice::new();
//! let handle = device.handle();
//! handle.push_line(";10;2;1.5;100");
//! // ... hand `device` to the backend, then:
//! assert_eq!(handle.written_lines(), vec!["c\n", "1\n"]);
//! ```

use crate::backend::link_trait::SerialLink;
use crate::backend::protocol::DATA_PREFIX;
use crate::error::{Result, UtmError};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Port name under which the simulated machine is listed
pub const MOCK_PORT_NAME: &str = "MOCK";

/// Interval between simulated data lines
const SIMULATION_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Default)]
struct MockState {
    open: bool,
    port: Option<String>,
    written: Vec<String>,
    inbound: VecDeque<String>,
    fail_open: Option<String>,
    fail_next_read: Option<String>,
    fail_writes: bool,
    simulate: bool,
    streaming: bool,
    tension: bool,
    tick: u64,
    tare_offset_g: f64,
    last_generated: Option<Instant>,
}

impl MockState {
    fn handle_command(&mut self, line: &str) {
        let command = line.trim();
        match command {
            "1" => {
                self.streaming = true;
                self.last_generated = None;
            }
            "0" => self.streaming = false,
            "c" => self.tension = false,
            "v" => self.tension = true,
            "t" => self.tare_offset_g = self.simulated_mass(),
            _ if command.starts_with("w ") => {
                if self.simulate {
                    self.inbound
                        .push_back(format!("Calibrated with {}\n", &command[2..]));
                }
            }
            _ => {}
        }
    }

    fn simulated_mass(&self) -> f64 {
        let sign = if self.tension { 1.0 } else { -1.0 };
        sign * (self.tick as f64 * 12.5)
    }

    fn generate(&mut self) {
        if !(self.simulate && self.streaming) {
            return;
        }
        let due = self
            .last_generated
            .map_or(true, |t| t.elapsed() >= SIMULATION_INTERVAL);
        if !due {
            return;
        }

        self.tick += 1;
        let sign = if self.tension { 1.0 } else { -1.0 };
        let mass = self.simulated_mass() - self.tare_offset_g;
        let displacement = sign * self.tick as f64 * 0.05;
        let voltage = 3.3 - (self.tick % 100) as f64 * 0.001;
        let resistance = 1000.0 + self.tick as f64 * 0.4;
        self.inbound.push_back(format!(
            "{p}{:.3}{p}{:.3}{p}{:.3}{p}{:.2}\n",
            mass,
            displacement,
            voltage,
            resistance,
            p = DATA_PREFIX
        ));
        self.last_generated = Some(Instant::now());
    }
}

/// Shared view into a [`MockUtmDevice`] that stays usable after the device
/// has been moved into the backend
#[derive(Debug, Clone)]
pub struct MockDeviceHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockDeviceHandle {
    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue an inbound line; the terminator is added
    pub fn push_line(&self, line: &str) {
        self.lock().inbound.push_back(format!("{}\n", line));
    }

    /// Lines written to the device so far, terminators included
    pub fn written_lines(&self) -> Vec<String> {
        self.lock().written.clone()
    }

    /// Whether the device currently considers itself open
    pub fn is_open(&self) -> bool {
        self.lock().open
    }

    /// Whether a start command was received without a later stop
    pub fn is_streaming(&self) -> bool {
        self.lock().streaming
    }

    /// Make the next `open` fail with the given driver message
    pub fn fail_open(&self, message: &str) {
        self.lock().fail_open = Some(message.to_string());
    }

    /// Make the next read fail as if the cable was pulled
    pub fn fail_next_read(&self, message: &str) {
        self.lock().fail_next_read = Some(message.to_string());
    }

    /// Make every write fail
    pub fn fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    /// Number of queued inbound lines
    pub fn pending_lines(&self) -> usize {
        self.lock().inbound.len()
    }
}

/// Simulated universal testing machine
#[derive(Debug)]
pub struct MockUtmDevice {
    state: Arc<Mutex<MockState>>,
}

impl Default for MockUtmDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl MockUtmDevice {
    /// Create a scripted device that only returns queued lines
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Create a device that streams a synthetic test while started
    pub fn simulated() -> Self {
        let device = Self::new();
        device.handle().lock().simulate = true;
        device
    }

    /// Get a handle for inspecting and scripting the device
    pub fn handle(&self) -> MockDeviceHandle {
        MockDeviceHandle {
            state: Arc::clone(&self.state),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SerialLink for MockUtmDevice {
    fn open(&mut self, port: &str) -> Result<()> {
        let mut state = self.lock();
        if let Some(message) = state.fail_open.take() {
            return Err(UtmError::Connection(format!("{}: {}", port, message)));
        }
        state.open = true;
        state.port = Some(port.to_string());
        tracing::info!("Mock device opened as {}", port);
        Ok(())
    }

    fn close(&mut self) {
        let mut state = self.lock();
        state.open = false;
        state.port = None;
        state.streaming = false;
    }

    fn is_open(&self) -> bool {
        self.lock().open
    }

    fn port_name(&self) -> Option<String> {
        self.lock().port.clone()
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        let mut state = self.lock();
        if !state.open {
            return Err(UtmError::NotConnected);
        }
        if state.fail_writes {
            return Err(UtmError::Connection("write failed: mock".to_string()));
        }
        state.written.push(line.to_string());
        state.handle_command(line);
        Ok(())
    }

    fn bytes_available(&mut self) -> Result<usize> {
        let mut state = self.lock();
        if !state.open {
            return Err(UtmError::NotConnected);
        }
        if state.fail_next_read.is_some() {
            // Surface the failure on the following read
            return Ok(1);
        }
        state.generate();
        Ok(state.inbound.iter().map(|l| l.len()).sum())
    }

    fn read_line(&mut self) -> Result<Option<String>> {
        let mut state = self.lock();
        if !state.open {
            return Err(UtmError::NotConnected);
        }
        if let Some(message) = state.fail_next_read.take() {
            state.open = false;
            return Err(UtmError::ConnectionLost(message));
        }
        match state.inbound.pop_front() {
            Some(line) => {
                Ok(Some(line))
            }
            None => {
                Ok(None)
            }
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::protocol::{parse_line, DeviceCommand};

    #[test]
    fn test_records_writes() {
        let mut device = MockUtmDevice::new();
        let handle = device.handle();
        device.open(MOCK_PORT_NAME).unwrap();

        device.write_command(&DeviceCommand::Tension).unwrap();
        device.write_command(&DeviceCommand::Calibrate(200.0)).unwrap();

        assert_eq!(handle.written_lines(), vec!["v\n", "w 200.0\n"]);
        assert_eq!(device.port_name().as_deref(), Some(MOCK_PORT_NAME));
    }

    #[test]
    fn test_closed_device_rejects_io() {
        let mut device = MockUtmDevice::new();
        assert!(matches!(device.write_line("t\n"), Err(UtmError::NotConnected)));
        assert!(device.bytes_available().is_err());
    }

    #[test]
    fn test_queued_lines_round_trip() {
        let mut device = MockUtmDevice::new();
        let handle = device.handle();
        device.open(MOCK_PORT_NAME).unwrap();

        handle.push_line("boot ok");
        assert!(device.bytes_available().unwrap() > 0);
        assert_eq!(device.read_line().unwrap().as_deref(), Some("boot ok\n"));
        assert_eq!(device.bytes_available().unwrap(), 0);
        assert_eq!(device.read_line().unwrap(), None);
    }

    #[test]
    fn test_injected_failures() {
        let mut device = MockUtmDevice::new();
        let handle = device.handle();

        handle.fail_open("Permission denied");
        let err = device.open("COM9").unwrap_err();
        assert!(err.to_string().contains("Permission denied"));
        assert!(!handle.is_open());

        device.open("COM9").unwrap();
        handle.fail_next_read("device disconnected");
        assert_eq!(device.bytes_available().unwrap(), 1);
        assert!(matches!(
            device.read_line(),
            Err(UtmError::ConnectionLost(_))
        ));
        assert!(!device.is_open());
    }

    #[test]
    fn test_simulation_streams_parseable_lines() {
        let mut device = MockUtmDevice::simulated();
        let handle = device.handle();
        device.open(MOCK_PORT_NAME).unwrap();

        // Quiet until started
        assert_eq!(device.bytes_available().unwrap(), 0);

        device.write_command(&DeviceCommand::Tension).unwrap();
        device.write_command(&DeviceCommand::Start).unwrap();
        assert!(handle.is_streaming());
        assert!(device.bytes_available().unwrap() > 0);

        let line = device.read_line().unwrap().unwrap();
        let reading = parse_line(line.trim_end()).unwrap().unwrap();
        assert!(reading.mass_g > 0.0);
        assert!(reading.displacement_mm > 0.0);

        device.write_command(&DeviceCommand::Stop).unwrap();
        assert!(!handle.is_streaming());
    }
}
