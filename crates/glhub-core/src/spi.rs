//! SPI pass-through and the busy-wait protocol
//!
//! SPI opcodes are forwarded to the configuration flash through the
//! Read/Write vendor commands. After any operation that programs or erases,
//! the status register is polled until the busy bit clears, then read once
//! more: the error bits only mean something once the flash is idle.

use crate::error::{Error, Result};
use crate::hub::Hub;
use crate::protocol::{spi_opcodes, Command, ControlRequest, SpiStatus, SUB_SPI01};
use crate::transport::ControlTransport;

/// Length of the JEDEC ID response
pub const JEDEC_ID_LEN: usize = 3;

/// Map the error bits of a final (idle) status read to a result
///
/// A program error takes precedence when both error bits are set. The
/// busy bit is ignored.
pub fn check_status(status: SpiStatus) -> Result<()> {
    if status.contains(SpiStatus::PROGRAM_ERROR) {
        Err(Error::SpiProgramError {
            status: status.bits(),
        })
    } else if status.contains(SpiStatus::ERASE_ERROR) {
        Err(Error::SpiEraseError {
            status: status.bits(),
        })
    } else {
        Ok(())
    }
}

impl<T: ControlTransport> Hub<T> {
    /// Issue an SPI read of `length` bytes for `opcode`
    pub fn read_spi(&mut self, opcode: u8, length: usize) -> Result<Vec<u8>> {
        self.read_spi_with_sub(SUB_SPI01, opcode, length)
    }

    /// SPI read on an explicit sub-bank code
    ///
    /// Only [`SUB_SPI01`] is known to be needed; [`crate::protocol::SUB_SPI02`]
    /// is accepted by the hardware but its meaning is undocumented.
    pub fn read_spi_with_sub(&mut self, sub: u16, opcode: u8, length: usize) -> Result<Vec<u8>> {
        self.control_read_exact(ControlRequest::spi(Command::Read, opcode, sub), length)
    }

    /// Issue an SPI write command, then wait for it to complete
    pub fn write_spi(&mut self, opcode: u8) -> Result<()> {
        self.control_write(ControlRequest::spi(Command::Write, opcode, SUB_SPI01), &[])?;
        self.wait_busy()
    }

    /// Read the 3-byte JEDEC ID of the configuration flash
    pub fn read_spi_id(&mut self) -> Result<[u8; JEDEC_ID_LEN]> {
        let data = self.read_spi(spi_opcodes::RDID, JEDEC_ID_LEN)?;
        Ok([data[0], data[1], data[2]])
    }

    /// Read the flash status register
    pub fn read_spi_status(&mut self) -> Result<SpiStatus> {
        let data = self.read_spi(spi_opcodes::RDSR, 1)?;
        Ok(SpiStatus::from_bits_retain(data[0]))
    }

    /// Poll the status register until the busy bit clears, then check the
    /// error bits on one more read
    ///
    /// Polls are spaced by the configured poll interval. Gives up with
    /// [`Error::Timeout`] after `busy_timeout`, or [`Error::Cancelled`] if
    /// the session's cancel token fires.
    pub fn wait_busy(&mut self) -> Result<()> {
        let max_polls = self.config().max_polls();
        let interval = self.config().poll_interval;

        let mut polls = 0u64;
        loop {
            self.check_cancelled()?;
            let status = self.read_spi_status()?;
            if !status.contains(SpiStatus::BUSY) {
                break;
            }
            polls += 1;
            if polls >= max_polls {
                log::warn!("SPI still busy after {} polls", polls);
                return Err(Error::Timeout);
            }
            self.transport_mut().delay(interval);
        }
        if polls > 0 {
            log::debug!("SPI ready after {} polls", polls);
        }

        let status = self.read_spi_status()?;
        check_status(status).inspect_err(|_| {
            log::warn!("SPI status 0x{:02x} after operation", status.bits());
        })
    }

    /// Erase the whole configuration flash
    ///
    /// The hub must be in ISP mode.
    pub fn erase_chip(&mut self) -> Result<()> {
        log::info!("Erasing SPI flash");
        self.write_spi(spi_opcodes::CHIP_ERASE)
    }
}
