//! nusb device lookup and control transfers

use std::time::Duration;

use glhub_core::{ControlTransport, HubConnector};
use nusb::transfer::{ControlIn, ControlOut, ControlType, Recipient};
use nusb::MaybeFuture;

use crate::error::{Result, UsbError};

/// A connected device matching a VID/PID filter
#[derive(Debug, Clone)]
pub struct UsbDeviceInfo {
    /// Bus identifier
    pub bus: String,
    /// Device address on the bus
    pub address: u8,
    /// USB vendor ID
    pub vid: u16,
    /// USB product ID
    pub pid: u16,
    /// Product string, if the device reported one
    pub product: Option<String>,
}

/// List connected devices with the given vendor ID (and product ID, if set)
pub fn list_devices(vid: u16, pid: Option<u16>) -> Result<Vec<UsbDeviceInfo>> {
    let devices = nusb::list_devices()
        .wait()
        .map_err(|e| UsbError::ListFailed(e.to_string()))?
        .filter(|d| d.vendor_id() == vid && pid.map_or(true, |p| d.product_id() == p))
        .map(|d| UsbDeviceInfo {
            bus: d.bus_id().to_string(),
            address: d.device_address(),
            vid: d.vendor_id(),
            pid: d.product_id(),
            product: d.product_string().map(str::to_string),
        })
        .collect();

    Ok(devices)
}

/// Finds hubs on the system USB buses
#[derive(Debug, Default)]
pub struct UsbConnector {
    /// Pick the Nth matching device (0-indexed)
    pub device_index: usize,
}

impl UsbConnector {
    /// Connector that opens the first matching device
    pub fn new() -> Self {
        Self::default()
    }

    /// Connector that opens the Nth matching device
    pub fn with_index(device_index: usize) -> Self {
        Self { device_index }
    }
}

impl HubConnector for UsbConnector {
    type Transport = UsbTransport;
    type Error = UsbError;

    fn open(&mut self, vid: u16, pid: u16) -> Result<Option<UsbTransport>> {
        let device_info = match nusb::list_devices()
            .wait()
            .map_err(|e| UsbError::ListFailed(e.to_string()))?
            .filter(|d| d.vendor_id() == vid && d.product_id() == pid)
            .nth(self.device_index)
        {
            Some(info) => info,
            None => return Ok(None),
        };

        log::info!(
            "Opening hub {:04x}:{:04x} at bus {} address {}",
            vid,
            pid,
            device_info.bus_id(),
            device_info.device_address()
        );

        let device = device_info
            .open()
            .wait()
            .map_err(|e| UsbError::OpenFailed(e.to_string()))?;

        Ok(Some(UsbTransport { device }))
    }
}

/// Opened hub, talking over the default control endpoint
pub struct UsbTransport {
    device: nusb::Device,
}

impl ControlTransport for UsbTransport {
    type Error = UsbError;

    fn control_in(
        &mut self,
        request: u8,
        value: u16,
        index: u16,
        length: usize,
        timeout: Duration,
    ) -> Result<Vec<u8>> {
        let length = u16::try_from(length)
            .map_err(|_| UsbError::TransferFailed(format!("IN length {} too large", length)))?;

        let data = self
            .device
            .control_in(
                ControlIn {
                    control_type: ControlType::Vendor,
                    recipient: Recipient::Device,
                    request,
                    value,
                    index,
                    length,
                },
                timeout,
            )
            .wait()?;

        Ok(data)
    }

    fn control_out(
        &mut self,
        request: u8,
        value: u16,
        index: u16,
        data: &[u8],
        timeout: Duration,
    ) -> Result<()> {
        self.device
            .control_out(
                ControlOut {
                    control_type: ControlType::Vendor,
                    recipient: Recipient::Device,
                    request,
                    value,
                    index,
                    data,
                },
                timeout,
            )
            .wait()?;

        Ok(())
    }
}
