//! Application module
//!
//! Convenient access point for the desktop application entry.

pub use crate::frontend::UtmApp;

pub use crate::controller::{ControlAvailability, CurrentValues, StatusView};
