//! glhub-dummy - In-memory hub emulator for testing
//!
//! Emulates the vendor command set of a Genesys Logic hub: XRAM, a 1 MiB SPI
//! configuration flash behind the SPI pass-through, the status register
//! busy/error protocol, SMBus peripherals, ISP mode and reset with
//! re-enumeration. Delays advance a virtual clock instead of sleeping.
//!
//! Failures can be injected through [`DummyState`] to exercise error paths.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use glhub_core::protocol::{
    spi_opcodes, Command, SpiStatus, FLASH_ADDR_LIMIT, SUB_FLASH, SUB_FW_VER, SUB_ISP_OFF,
    SUB_ISP_ON, SUB_RESET, SUB_SPI01, SUB_SPI02, SUB_XRAM, WINDOW_SIZE, XRAM_ADDR_LIMIT,
};
use glhub_core::{ControlTransport, HubConnector};
use thiserror::Error;

/// Errors the emulated device reports as failed transfers
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DummyError {
    /// Transfer on a session from before the last reset
    #[error("device disconnected")]
    Disconnected,
    /// Request the emulated firmware does not handle
    #[error("request 0x{request:02x} value 0x{value:04x} stalled")]
    Stall {
        /// Opcode
        request: u8,
        /// wValue
        value: u16,
    },
    /// Flash access outside ISP mode
    #[error("flash access requires ISP mode")]
    NotInIsp,
    /// No peripheral at the SMBus address
    #[error("no ACK from SMBus address 0x{0:02x}")]
    Nak(u8),
    /// Transfer larger than one window or crossing a window boundary
    #[error("transfer of {len} bytes at 0x{addr:05x} crosses a window")]
    Overflow {
        /// Start address
        addr: u32,
        /// Length
        len: usize,
    },
}

/// Configuration for the dummy hub
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// USB vendor ID
    pub vid: u16,
    /// USB product ID
    pub pid: u16,
    /// Firmware version bytes
    pub fw_version: [u8; 2],
    /// JEDEC ID of the configuration flash
    pub jedec_id: [u8; 3],
    /// Flash size in bytes
    pub flash_size: usize,
    /// Status reads reporting busy after each program/erase
    pub busy_polls: u32,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            vid: 0x05E3,
            pid: 0x0610,
            fw_version: [0x32, 0x98],
            jedec_id: [0xEF, 0x40, 0x14], // Winbond W25Q80
            flash_size: FLASH_ADDR_LIMIT as usize,
            busy_polls: 2,
        }
    }
}

/// One transfer as seen by the emulated device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggedTransfer {
    /// Opcode
    pub request: u8,
    /// wValue
    pub value: u16,
    /// wIndex
    pub index: u16,
    /// Requested length (IN) or data length (OUT)
    pub len: usize,
    /// Direction
    pub inbound: bool,
}

/// Complete emulated device state, exposed for inspection and fault injection
#[derive(Debug)]
pub struct DummyState {
    /// Configuration the device was created with
    pub config: DummyConfig,
    /// Controller XRAM
    pub xram: Vec<u8>,
    /// SPI flash contents
    pub flash: Vec<u8>,
    /// ISP mode active
    pub isp_mode: bool,
    /// Remaining busy status reads of the current operation
    pub busy_left: u32,
    /// Error bits latched by the last operation
    pub error_bits: SpiStatus,
    /// Keep the busy bit set forever
    pub stuck_busy: bool,
    /// Latch the erase-error bit on the next chip erase
    pub fail_erase: bool,
    /// Latch the program-error bit on the flash write at this address
    pub fail_program_at: Option<u32>,
    /// Stall the flash write transfer at this address
    pub stall_write_at: Option<u32>,
    /// Flip this flash address in every read response
    pub corrupt_read_at: Option<u32>,
    /// Device comes back after a reset
    pub reenumerates: bool,
    /// Currently on the bus
    pub connected: bool,
    /// Incremented on every reset; transports from older generations fail
    pub generation: u32,
    /// Number of resets seen
    pub resets: u32,
    /// SMBus peripherals by bus address: 256 byte-wide registers each
    pub smbus: HashMap<u8, Vec<u8>>,
    /// All transfers, in order
    pub log: Vec<LoggedTransfer>,
    /// Virtual time spent in delays
    pub elapsed: Duration,
}

impl DummyState {
    fn new(config: DummyConfig) -> Self {
        Self {
            xram: vec![0; XRAM_ADDR_LIMIT as usize],
            flash: vec![0xFF; config.flash_size],
            config,
            isp_mode: false,
            busy_left: 0,
            error_bits: SpiStatus::empty(),
            stuck_busy: false,
            fail_erase: false,
            fail_program_at: None,
            stall_write_at: None,
            corrupt_read_at: None,
            reenumerates: true,
            connected: true,
            generation: 0,
            resets: 0,
            smbus: HashMap::new(),
            log: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }

    /// Attach an SMBus peripheral at bus address `addr`
    pub fn add_smbus_device(&mut self, addr: u8) {
        self.smbus.insert(addr & 0xFE, vec![0; 256]);
    }

    fn status(&mut self) -> u8 {
        let mut status = self.error_bits;
        if self.stuck_busy || self.busy_left > 0 {
            status |= SpiStatus::BUSY;
            self.busy_left = self.busy_left.saturating_sub(1);
        }
        status.bits()
    }

    fn start_operation(&mut self) {
        self.busy_left = self.config.busy_polls;
        self.error_bits = SpiStatus::empty();
    }

    fn flash_range(&self, value: u16, index: u16, len: usize) -> Result<usize, DummyError> {
        let addr = ((value as u32 & 0xF000) << 4) | index as u32;
        let offset = addr as usize % WINDOW_SIZE;
        if offset + len > WINDOW_SIZE || addr as usize + len > self.flash.len() {
            return Err(DummyError::Overflow { addr, len });
        }
        Ok(addr as usize)
    }

    fn handle_in(
        &mut self,
        request: u8,
        value: u16,
        index: u16,
        len: usize,
    ) -> Result<Vec<u8>, DummyError> {
        let stall = DummyError::Stall { request, value };
        match request {
            r if r == Command::Read as u8 => match value & 0xFF {
                SUB_FLASH => {
                    let addr = self.flash_range(value, index, len)?;
                    let mut data = self.flash[addr..addr + len].to_vec();
                    if let Some(bad) = self.corrupt_read_at {
                        let bad = bad as usize;
                        if (addr..addr + len).contains(&bad) {
                            data[bad - addr] ^= 0xFF;
                        }
                    }
                    Ok(data)
                }
                SUB_SPI01 | SUB_SPI02 => match (value >> 8) as u8 {
                    spi_opcodes::RDSR => Ok(vec![self.status(); len.min(1)]),
                    spi_opcodes::RDID => {
                        Ok(self.config.jedec_id.iter().copied().take(len).collect())
                    }
                    _ => Err(stall),
                },
                SUB_FW_VER => Ok(self.config.fw_version.iter().copied().take(len).collect()),
                _ => Err(stall),
            },
            r if r == Command::ReadXram as u8 && value == SUB_XRAM => {
                let addr = index as usize;
                let end = (addr + len).min(self.xram.len());
                Ok(self.xram[addr..end].to_vec())
            }
            r if r == Command::ReadSmbus as u8 && value & 1 == 1 => {
                let addr = (value & 0xFE) as u8;
                let reg = (value >> 8) as usize;
                let regs = self.smbus.get(&addr).ok_or(DummyError::Nak(addr))?;
                Ok((0..len).map(|i| regs[(reg + i) % regs.len()]).collect())
            }
            _ => Err(stall),
        }
    }

    fn handle_out(
        &mut self,
        request: u8,
        value: u16,
        index: u16,
        data: &[u8],
    ) -> Result<(), DummyError> {
        let stall = DummyError::Stall { request, value };
        match request {
            r if r == Command::Write as u8 => match value & 0xFF {
                SUB_FLASH => {
                    if !self.isp_mode {
                        return Err(DummyError::NotInIsp);
                    }
                    let addr = self.flash_range(value, index, data.len())?;
                    if self.stall_write_at == Some(addr as u32) {
                        return Err(stall);
                    }
                    // Programming can only clear bits
                    let cells = &mut self.flash[addr..addr + data.len()];
                    for (cell, &byte) in cells.iter_mut().zip(data) {
                        *cell &= byte;
                    }
                    self.start_operation();
                    if self.fail_program_at == Some(addr as u32) {
                        self.error_bits |= SpiStatus::PROGRAM_ERROR;
                    }
                    Ok(())
                }
                SUB_SPI01 | SUB_SPI02 if (value >> 8) as u8 == spi_opcodes::CHIP_ERASE => {
                    if !self.isp_mode {
                        return Err(DummyError::NotInIsp);
                    }
                    self.start_operation();
                    if self.fail_erase {
                        self.error_bits |= SpiStatus::ERASE_ERROR;
                    } else {
                        self.flash.fill(0xFF);
                    }
                    Ok(())
                }
                _ => Err(stall),
            },
            r if r == Command::WriteXram as u8 && value == SUB_XRAM && data.len() == 1 => {
                self.xram[index as usize] = data[0];
                Ok(())
            }
            r if r == Command::Switch as u8 => match value {
                SUB_ISP_OFF => {
                    self.isp_mode = false;
                    Ok(())
                }
                SUB_ISP_ON => {
                    self.isp_mode = true;
                    Ok(())
                }
                SUB_RESET => {
                    log::debug!("dummy: reset");
                    self.resets += 1;
                    self.generation += 1;
                    self.isp_mode = false;
                    self.busy_left = 0;
                    self.error_bits = SpiStatus::empty();
                    self.connected = false;
                    Ok(())
                }
                _ => Err(stall),
            },
            r if r == Command::WriteSmbus as u8 && value & 1 == 0 => {
                let addr = (value & 0xFE) as u8;
                let reg = (value >> 8) as usize;
                let regs = self.smbus.get_mut(&addr).ok_or(DummyError::Nak(addr))?;
                let n = regs.len();
                for (i, &byte) in data.iter().enumerate() {
                    regs[(reg + i) % n] = byte;
                }
                Ok(())
            }
            _ => Err(stall),
        }
    }
}

/// Shared handle to one emulated hub
///
/// Clones refer to the same device. Tests keep one clone to inspect state
/// while the core drives another through [`DummyConnector`].
#[derive(Debug, Clone)]
pub struct DummyHub {
    state: Arc<Mutex<DummyState>>,
}

impl DummyHub {
    /// Create a new dummy hub with the given configuration
    pub fn new(config: DummyConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(DummyState::new(config))),
        }
    }

    /// Create a new dummy hub with default configuration
    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }

    /// Lock the device state
    pub fn state(&self) -> MutexGuard<'_, DummyState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Connector that finds this hub by its configured identifiers
    pub fn connector(&self) -> DummyConnector {
        DummyConnector { hub: self.clone() }
    }
}

/// [`HubConnector`] for a [`DummyHub`]
#[derive(Debug, Clone)]
pub struct DummyConnector {
    hub: DummyHub,
}

impl HubConnector for DummyConnector {
    type Transport = DummyTransport;
    type Error = DummyError;

    fn open(&mut self, vid: u16, pid: u16) -> Result<Option<DummyTransport>, DummyError> {
        let mut state = self.hub.state();
        if vid != state.config.vid || pid != state.config.pid {
            return Ok(None);
        }
        if !state.connected {
            if !state.reenumerates {
                return Ok(None);
            }
            state.connected = true;
        }
        Ok(Some(DummyTransport {
            hub: self.hub.clone(),
            generation: state.generation,
        }))
    }
}

/// Session transport to a [`DummyHub`]
#[derive(Debug)]
pub struct DummyTransport {
    hub: DummyHub,
    generation: u32,
}

impl DummyTransport {
    fn live_state(&self) -> Result<MutexGuard<'_, DummyState>, DummyError> {
        let state = self.hub.state();
        if !state.connected || state.generation != self.generation {
            return Err(DummyError::Disconnected);
        }
        Ok(state)
    }
}

impl ControlTransport for DummyTransport {
    type Error = DummyError;

    fn control_in(
        &mut self,
        request: u8,
        value: u16,
        index: u16,
        length: usize,
        _timeout: Duration,
    ) -> Result<Vec<u8>, DummyError> {
        let mut state = self.live_state()?;
        state.log.push(LoggedTransfer {
            request,
            value,
            index,
            len: length,
            inbound: true,
        });
        state.handle_in(request, value, index, length)
    }

    fn control_out(
        &mut self,
        request: u8,
        value: u16,
        index: u16,
        data: &[u8],
        _timeout: Duration,
    ) -> Result<(), DummyError> {
        let mut state = self.live_state()?;
        state.log.push(LoggedTransfer {
            request,
            value,
            index,
            len: data.len(),
            inbound: false,
        });
        state.handle_out(request, value, index, data)
    }

    fn delay(&mut self, duration: Duration) {
        // No real delay needed for in-memory operations
        self.hub.state().elapsed += duration;
    }
}
