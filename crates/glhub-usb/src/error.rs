//! Error types for the USB backend

use std::fmt;

/// Result type for USB backend operations
pub type Result<T> = std::result::Result<T, UsbError>;

/// Errors that can occur when talking to a hub over USB
#[derive(Debug)]
pub enum UsbError {
    /// Enumerating USB devices failed
    ListFailed(String),
    /// Failed to open device
    OpenFailed(String),
    /// Control transfer failed
    TransferFailed(String),
}

impl fmt::Display for UsbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UsbError::ListFailed(msg) => write!(f, "Failed to list USB devices: {}", msg),
            UsbError::OpenFailed(msg) => write!(f, "Failed to open hub: {}", msg),
            UsbError::TransferFailed(msg) => write!(f, "USB transfer failed: {}", msg),
        }
    }
}

impl std::error::Error for UsbError {}

impl From<nusb::Error> for UsbError {
    fn from(e: nusb::Error) -> Self {
        UsbError::OpenFailed(e.to_string())
    }
}

impl From<nusb::transfer::TransferError> for UsbError {
    fn from(e: nusb::transfer::TransferError) -> Self {
        UsbError::TransferFailed(e.to_string())
    }
}
