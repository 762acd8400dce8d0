//! Error types for glhub-core

use thiserror::Error;

/// Boxed error coming from a transport backend
pub type TransportError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors returned by hub operations
///
/// Nothing in this crate retries: every error surfaces to the caller as soon
/// as it happens, and no flash rollback is attempted.
#[derive(Debug, Error)]
pub enum Error {
    /// Argument rejected before any transfer was issued
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// No device with the requested identifiers is connected
    #[error("device not found (VID:{vid:04x} PID:{pid:04x})")]
    DeviceNotFound {
        /// USB vendor ID
        vid: u16,
        /// USB product ID
        pid: u16,
    },

    /// SPI status reported a program failure after the busy-wait
    #[error("SPI program error (status 0x{status:02x})")]
    SpiProgramError {
        /// Final status register value
        status: u8,
    },

    /// SPI status reported an erase failure after the busy-wait
    #[error("SPI erase error (status 0x{status:02x})")]
    SpiEraseError {
        /// Final status register value
        status: u8,
    },

    /// Flash contents differ from the image after writing
    #[error("verification failed at 0x{addr:05x}: expected 0x{expected:02x}, found 0x{found:02x}")]
    VerificationError {
        /// Address of the first mismatching byte
        addr: u32,
        /// Byte from the source image
        expected: u8,
        /// Byte read back from flash
        found: u8,
    },

    /// The device returned fewer bytes than requested
    #[error("short read: expected {expected} bytes, got {actual}")]
    ShortRead {
        /// Requested length
        expected: usize,
        /// Received length
        actual: usize,
    },

    /// Busy-wait deadline exceeded
    #[error("timed out waiting for SPI operation to complete")]
    Timeout,

    /// Operation interrupted through a cancel token
    #[error("operation cancelled")]
    Cancelled,

    /// Control transfer failed
    #[error("transport error: {0}")]
    Transport(#[source] TransportError),
}

impl Error {
    /// Wrap a backend error
    pub fn transport<E>(e: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Transport(Box::new(e))
    }
}

/// Result type alias using the core Error type
pub type Result<T> = std::result::Result<T, Error>;
