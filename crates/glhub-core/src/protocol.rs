//! Genesys Logic hub vendor command encoding
//!
//! Every command is a vendor control transfer. The opcode goes into
//! `bRequest`; sub-function codes, addresses and SPI/SMBus arguments are
//! packed into `wValue` and `wIndex` as described below.
//!
//! | Region | wValue | wIndex |
//! |---|---|---|
//! | XRAM | `0x04` | address |
//! | Flash | `0x00 \| ((addr >> 4) & 0xF000)` | `addr & 0xFFFF` |
//! | SPI | `(spi_cmd << 8) \| 0x01` | 0 |
//! | SMBus read | `(addr & 0xFF) \| 1 \| (cmd << 8)` | 0 |
//! | SMBus write | `(addr & 0xFE) \| (reg << 8)` | 0 |
//!
//! A single transfer moves at most [`WINDOW_SIZE`] bytes and never crosses a
//! window boundary.

use bitflags::bitflags;

/// Largest payload of a single control transfer
pub const WINDOW_SIZE: usize = 4096;

/// Flash addresses are 20 bits wide (4-bit bank + 16-bit offset)
pub const FLASH_ADDR_LIMIT: u32 = 1 << 20;

/// XRAM addresses fit in `wIndex`
pub const XRAM_ADDR_LIMIT: u32 = 1 << 16;

/// Vendor opcodes (`bRequest`)
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Verify
    Verify = 0x71,
    /// Read XRAM
    ReadXram = 0x72,
    /// Write a single XRAM byte
    WriteXram = 0x73,
    /// Switch mode (ISP on/off, reset)
    Switch = 0x81,
    /// Read flash / SPI / firmware version
    Read = 0x82,
    /// Write flash / SPI
    Write = 0x83,
    /// Signed variant of [`Command::Switch`]
    SwitchSigned = 0xA1,
    /// Signed variant of [`Command::Read`]
    ReadSigned = 0xA2,
    /// Signed variant of [`Command::Write`]
    WriteSigned = 0xA3,
    /// SMBus/I2C read
    ReadSmbus = 0xAA,
    /// SMBus/I2C write
    WriteSmbus = 0xAB,
    /// Hardware security
    HwSecurity = 0xAC,
}

// Sub-functions of Read/Write
/// Flash access (bank bits are OR'd in)
pub const SUB_FLASH: u16 = 0x00;
/// SPI pass-through, sub-bank 1
pub const SUB_SPI01: u16 = 0x01;
/// SPI pass-through, sub-bank 2 (meaning undocumented)
pub const SUB_SPI02: u16 = 0x02;
/// Firmware version
pub const SUB_FW_VER: u16 = 0x03;

// Sub-functions of Switch
/// Leave ISP mode
pub const SUB_ISP_OFF: u16 = 0x00;
/// Enter ISP mode
pub const SUB_ISP_ON: u16 = 0x01;
/// Reset the hub (it disconnects and re-enumerates)
pub const SUB_RESET: u16 = 0x03;

// Sub-functions of ReadXram/WriteXram
/// XRAM window
pub const SUB_XRAM: u16 = 0x04;
/// Second XRAM window (meaning undocumented)
pub const SUB_XRAM05: u16 = 0x05;

/// Length of the firmware version response
pub const FW_VER_LEN: usize = 2;

/// SPI flash opcodes forwarded by the pass-through
pub mod spi_opcodes {
    /// Read Status Register
    pub const RDSR: u8 = 0x05;
    /// Read JEDEC ID
    pub const RDID: u8 = 0x9F;
    /// Chip Erase
    pub const CHIP_ERASE: u8 = 0xC7;
}

bitflags! {
    /// SPI flash status register as reported by the hub
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SpiStatus: u8 {
        /// Operation in progress
        const BUSY          = 1 << 0;
        /// Last erase failed
        const ERASE_ERROR   = 1 << 5;
        /// Last program failed
        const PROGRAM_ERROR = 1 << 6;
    }
}

/// A fully encoded vendor request, minus data stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlRequest {
    /// Opcode (`bRequest`)
    pub command: Command,
    /// `wValue`
    pub value: u16,
    /// `wIndex`
    pub index: u16,
}

impl ControlRequest {
    /// Request with explicit fields
    pub const fn new(command: Command, value: u16, index: u16) -> Self {
        Self {
            command,
            value,
            index,
        }
    }

    /// Flash read or write at `addr`
    pub const fn flash(command: Command, addr: u32) -> Self {
        let (value, index) = flash_window(addr);
        Self::new(command, value, index)
    }

    /// XRAM read or write at `addr`
    pub const fn xram(command: Command, addr: u32) -> Self {
        Self::new(command, SUB_XRAM, addr as u16)
    }

    /// SPI pass-through of `opcode` on sub-bank `sub`
    pub const fn spi(command: Command, opcode: u8, sub: u16) -> Self {
        Self::new(command, spi_value(opcode, sub), 0)
    }

    /// Switch-mode request with the given sub-function
    pub const fn switch(sub: u16) -> Self {
        Self::new(Command::Switch, sub, 0)
    }

    /// SMBus read from bus address `addr`, register/command `cmd`
    pub const fn smbus_read(addr: u8, cmd: u8) -> Self {
        Self::new(Command::ReadSmbus, smbus_read_value(addr, cmd), 0)
    }

    /// SMBus write to bus address `addr`, register/command `reg`
    pub const fn smbus_write(addr: u8, reg: u8) -> Self {
        Self::new(Command::WriteSmbus, smbus_write_value(addr, reg), 0)
    }
}

/// Pack a flash address into (wValue, wIndex)
///
/// Address bits 16..20 select the bank and land in wValue bits 12..16.
#[inline]
pub const fn flash_window(addr: u32) -> (u16, u16) {
    let bank = ((addr >> 4) & 0xF000) as u16;
    (SUB_FLASH | bank, (addr & 0xFFFF) as u16)
}

/// wValue for an SPI pass-through command
#[inline]
pub const fn spi_value(opcode: u8, sub: u16) -> u16 {
    ((opcode as u16) << 8) | sub
}

/// wValue for an SMBus read (R/W bit set)
#[inline]
pub const fn smbus_read_value(addr: u8, cmd: u8) -> u16 {
    (addr as u16 & 0xFF) | 1 | ((cmd as u16) << 8)
}

/// wValue for an SMBus write (R/W bit clear)
#[inline]
pub const fn smbus_write_value(addr: u8, reg: u8) -> u16 {
    (addr as u16 & 0xFE) | ((reg as u16) << 8)
}

/// Split `[addr, addr + len)` into transfers that stay inside one window
pub fn windows(addr: u32, len: usize) -> Windows {
    Windows {
        addr,
        remaining: len,
    }
}

/// Iterator over `(address, length)` pairs produced by [`windows`]
#[derive(Debug, Clone)]
pub struct Windows {
    addr: u32,
    remaining: usize,
}

impl Iterator for Windows {
    type Item = (u32, usize);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let to_boundary = WINDOW_SIZE - (self.addr as usize % WINDOW_SIZE);
        let len = to_boundary.min(self.remaining);
        let item = (self.addr, len);
        self.addr += len as u32;
        self.remaining -= len;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = if self.remaining == 0 {
            0
        } else {
            let head = self.addr as usize % WINDOW_SIZE;
            (head + self.remaining).div_ceil(WINDOW_SIZE)
        };
        (n, Some(n))
    }
}

impl ExactSizeIterator for Windows {}
