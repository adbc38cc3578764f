//! Serial port backend using the `serialport` crate
//!
//! [`SerialPortLink`] is the production [`SerialLink`]: it opens the machine's
//! USB/RS-232 port at the fixed firmware baud rate and splits the incoming
//! byte stream into `\n`-terminated lines.

use crate::backend::link_trait::SerialLink;
use crate::backend::protocol::{BAUD_RATE, PORT_TIMEOUT};
use crate::error::{Result, UtmError};
use serialport::{SerialPort, SerialPortType};
use std::io::{ErrorKind, Read, Write};

/// Size of a single read from the driver
const READ_CHUNK: usize = 256;

/// Information about an available serial port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    /// System name (`/dev/ttyUSB0`, `COM3`, ...)
    pub name: String,
    /// Human readable description
    pub description: String,
}

impl std::fmt::Display for PortInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.description.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{} ({})", self.name, self.description)
        }
    }
}

fn describe_port_type(port_type: &SerialPortType) -> String {
    match port_type {
        SerialPortType::UsbPort(usb) => {
            let label = match (&usb.manufacturer, &usb.product) {
                (Some(m), Some(p)) => format!("{} {}", m, p),
                (Some(m), None) => m.clone(),
                (None, Some(p)) => p.clone(),
                (None, None) => "USB serial".to_string(),
            };
            format!("{} [{:04x}:{:04x}]", label, usb.vid, usb.pid)
        }
        SerialPortType::PciPort => "PCI serial".to_string(),
        SerialPortType::BluetoothPort => "Bluetooth serial".to_string(),
        SerialPortType::Unknown => String::new(),
    }
}

/// Enumerate the serial ports currently present on the system
///
/// Enumeration failures are logged and produce an empty list.
pub fn available_ports() -> Vec<PortInfo> {
    match serialport::available_ports() {
        Ok(ports) => ports
            .into_iter()
            .map(|p| {
                let info = PortInfo {
                    description: describe_port_type(&p.port_type),
                    name: p.port_name,
                };
                tracing::debug!("Port: {}, Desc: {}", info.name, info.description);
                info
            })
            .collect(),
        Err(e) => {
            tracing::warn!("Failed to enumerate serial ports: {}", e);
            Vec::new()
        }
    }
}

/// Connection to the machine over a real serial port
#[derive(Default)]
pub struct SerialPortLink {
    port: Option<Box<dyn SerialPort>>,
    name: Option<String>,
    /// Bytes read past the last returned line
    pending: Vec<u8>,
}

impl SerialPortLink {
    /// Create a closed link
    pub fn new() -> Self {
        Self::default()
    }

    fn has_complete_line(&self) -> bool {
        self.pending.contains(&b'\n')
    }
}

impl SerialLink for SerialPortLink {
    fn open(&mut self, port: &str) -> Result<()> {
        if self.port.is_some() {
            self.close();
        }

        let opened = serialport::new(port, BAUD_RATE)
            .timeout(PORT_TIMEOUT)
            .open()
            .map_err(|e| UtmError::Connection(format!("{}: {}", port, e)))?;

        tracing::info!(
            "Opened {} at {} baud ({:?} timeout)",
            port,
            BAUD_RATE,
            PORT_TIMEOUT
        );
        self.port = Some(opened);
        self.name = Some(port.to_string());
        self.pending.clear();
        Ok(())
    }

    fn close(&mut self) {
        if let Some(port) = self.port.take() {
            drop(port);
            tracing::info!(
                "Serial port {} closed",
                self.name.as_deref().unwrap_or("<unnamed>")
            );
        }
        self.name = None;
        self.pending.clear();
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn port_name(&self) -> Option<String> {
        self.name.clone()
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        let port = self.port.as_mut().ok_or(UtmError::NotConnected)?;
        tracing::trace!("-> {:?}", line);
        port.write_all(line.as_bytes())
            .and_then(|_| port.flush())
            .map_err(|e| UtmError::Connection(format!("write failed: {}", e)))?;
        Ok(())
    }

    fn bytes_available(&mut self) -> Result<usize> {
        let buffered = if self.has_complete_line() {
            self.pending.len()
        } else {
            0
        };
        let port = self.port.as_mut().ok_or(UtmError::NotConnected)?;
        let waiting = port
            .bytes_to_read()
            .map_err(|e| UtmError::ConnectionLost(e.to_string()))?;
        Ok(buffered + waiting as usize)
    }

    fn read_line(&mut self) -> Result<Option<String>> {
        let Some(port) = self.port.as_mut() else {
            return Err(UtmError::NotConnected);
        };

        loop {
            if let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = self.pending.drain(..=pos).collect();
                return Ok(Some(String::from_utf8_lossy(&line).into_owned()));
            }

            let mut buf = [0u8; READ_CHUNK];
            match port.read(&mut buf) {
                Ok(0) => {
                    return Err(UtmError::ConnectionLost(
                        "port reported end of stream".to_string(),
                    ))
                }
                Ok(n) => {
                    self.pending.extend_from_slice(&buf[..n]);
                }
                Err(e) if e.kind() == ErrorKind::TimedOut => return Ok(None),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(UtmError::ConnectionLost(e.to_string())),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closed_link() {
        let mut link = SerialPortLink::new();
        assert!(!link.is_open());
        assert!(link.port_name().is_none());
        assert!(matches!(link.write_line("t\n"), Err(UtmError::NotConnected)));
        assert!(matches!(link.read_line(), Err(UtmError::NotConnected)));

        // Closing twice is harmless
        link.close();
        link.close();
        assert!(!link.is_open());
    }

    #[test]
    fn test_open_missing_port_fails() {
        let mut link = SerialPortLink::new();
        let err = link
            .open("/dev/utm-rs-does-not-exist")
            .unwrap_err();
        assert!(matches!(err, UtmError::Connection(_)));
        assert!(err.to_string().contains("/dev/utm-rs-does-not-exist"));
        assert!(!link.is_open());
    }

    #[test]
    fn test_port_info_display() {
        let info = PortInfo {
            name: "COM3".to_string(),
            description: "CP210x [10c4:ea60]".to_string(),
        };
        assert_eq!(info.to_string(), "COM3 (CP210x [10c4:ea60])");

        let bare = PortInfo {
            name: "/dev/ttyS0".to_string(),
            description: String::new(),
        };
        assert_eq!(bare.to_string(), "/dev/ttyS0");
    }

    #[test]
    #[ignore = "Port enumeration touches system devices"]
    fn test_available_ports_does_not_panic() {
        let _ = available_ports().len();
    }
}
