//! SerialLink trait for a unified connection interface
//!
//! This module provides a common trait for everything that can stand in for
//! the machine's serial port: the real port (via the `serialport` crate) and
//! the simulated machine used for testing.
//!
//! Only one link is open at a time. Writing requires an open link, and
//! closing an already closed link is a no-op.

use crate::backend::protocol::DeviceCommand;
use crate::error::Result;

/// Unified interface for the machine connection
///
/// Implementations must be `Send` so the acquisition worker can own them.
///
/// # Example
///
/// ```ignore
/// fn send_tare(link: &mut dyn SerialLink) -> Result<()> {
///     link.write_command(&DeviceCommand::Tare)
/// }
/// ```
#[cfg_attr(test, mockall::automock)]
pub trait SerialLink: Send {
    /// Open the named port
    ///
    /// Fails with [`UtmError::Connection`](crate::error::UtmError::Connection)
    /// carrying the driver's message when the port cannot be opened.
    fn open(&mut self, port: &str) -> Result<()>;

    /// Close the port; safe to call when already closed
    fn close(&mut self);

    /// Check if the port is open
    fn is_open(&self) -> bool;

    /// Name of the open port
    fn port_name(&self) -> Option<String>;

    /// Write one raw line; the caller supplies the terminator
    fn write_line(&mut self, line: &str) -> Result<()>;

    /// Write a protocol command
    fn write_command(&mut self, command: &DeviceCommand) -> Result<()> {
        self.write_line(&command.encode())
    }

    /// Number of bytes waiting to be read
    fn bytes_available(&mut self) -> Result<usize>;

    /// Read up to and including the next `\n`
    ///
    /// Returns `Ok(None)` if the I/O timeout expired before a full line
    /// arrived; partial data is kept for the next call. Any other I/O failure
    /// is reported as [`UtmError::ConnectionLost`](crate::error::UtmError::ConnectionLost).
    fn read_line(&mut self) -> Result<Option<String>>;
}
