//! glhub-core - Vendor command protocol for Genesys Logic USB hubs
//!
//! Genesys Logic hub controllers expose a private command set over USB
//! vendor control transfers. Through it a host can read and write the
//! controller's XRAM, access the SPI configuration flash, proxy SMBus/I2C
//! transactions to downstream peripherals and reprogram the hub firmware
//! in-system.
//!
//! This crate implements the command encoding and the workflows built on
//! it. It does not talk to USB directly: backends implement
//! [`ControlTransport`] and [`HubConnector`] (see `glhub-usb` for real
//! hardware and `glhub-dummy` for an in-memory emulator).
//!
//! # Example
//!
//! ```ignore
//! use glhub_core::{Hub, HubConfig, NoProgress};
//!
//! fn update<C: glhub_core::HubConnector>(connector: &mut C, image: &[u8]) -> glhub_core::Result<()> {
//!     let hub = Hub::open(connector, 0x05e3, 0x0610, HubConfig::default())?;
//!     println!("Firmware: {}", hub.read_fw_version()?);
//!     let hub = hub.program_flash(connector, image, &mut NoProgress)?;
//!     println!("Firmware after update: {}", hub.read_fw_version()?);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod cancel;
pub mod config;
pub mod error;
pub mod hub;
pub mod i2c;
pub mod isp;
pub mod memory;
pub mod progress;
pub mod protocol;
pub mod spi;
pub mod transport;

pub use cancel::CancelToken;
pub use config::{parse_options, HubConfig};
pub use error::{Error, Result};
pub use hub::{FirmwareVersion, Hub};
pub use i2c::I2cAddress;
pub use memory::Region;
pub use progress::{IspProgress, IspStage, NoProgress};
pub use protocol::SpiStatus;
pub use transport::{ControlTransport, HubConnector};
