//! glhub-usb - USB backend for Genesys Logic hubs
//!
//! Implements the `glhub-core` transport traits on top of `nusb`. Vendor
//! requests go to the default control endpoint of the device; no interface
//! is claimed, so the kernel hub driver stays bound.
//!
//! # Example
//!
//! ```no_run
//! use glhub_core::{Hub, HubConfig};
//! use glhub_usb::UsbConnector;
//!
//! let mut connector = UsbConnector::new();
//! let mut hub = Hub::open(&mut connector, 0x05e3, 0x0610, HubConfig::default())?;
//! println!("Firmware: {}", hub.read_fw_version()?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod device;
mod error;

pub use device::{list_devices, UsbConnector, UsbDeviceInfo, UsbTransport};
pub use error::{Result, UsbError};

/// Genesys Logic USB vendor ID
pub const GENESYS_VID: u16 = 0x05E3;
