//! SMBus/I2C bridge to peripherals behind the hub

use std::fmt;

use crate::error::{Error, Result};
use crate::hub::Hub;
use crate::protocol::ControlRequest;
use crate::transport::ControlTransport;

/// Address of a downstream I2C device in bus form: the 7-bit address in
/// bits 1..8, with bit 0 reserved for the R/W flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct I2cAddress(u8);

impl I2cAddress {
    /// From the 8-bit bus form (e.g. `0xA0` for an EEPROM at 0x50)
    ///
    /// The R/W bit is ignored; each command sets it as needed.
    pub const fn from_bus(byte: u8) -> Self {
        Self(byte & 0xFE)
    }

    /// From a 7-bit address
    pub fn from_7bit(addr: u8) -> Result<Self> {
        if addr > 0x7F {
            return Err(Error::InvalidArgument(format!(
                "I2C address 0x{:02x} is not 7-bit",
                addr
            )));
        }
        Ok(Self(addr << 1))
    }

    /// Bus form with R/W bit clear
    pub const fn bus(self) -> u8 {
        self.0
    }

    /// 7-bit address
    pub const fn addr7(self) -> u8 {
        self.0 >> 1
    }
}

impl fmt::Display for I2cAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02x}", self.addr7())
    }
}

impl<T: ControlTransport> Hub<T> {
    /// Read `length` bytes from a peripheral
    pub fn i2c_read(&mut self, addr: I2cAddress, length: usize) -> Result<Vec<u8>> {
        self.i2c_read_register(addr, 0, length)
    }

    /// Read `length` bytes from register/command `reg` of a peripheral
    pub fn i2c_read_register(
        &mut self,
        addr: I2cAddress,
        reg: u8,
        length: usize,
    ) -> Result<Vec<u8>> {
        log::debug!("I2C read {} reg 0x{:02x} len {}", addr, reg, length);
        self.control_read_exact(ControlRequest::smbus_read(addr.bus(), reg), length)
    }

    /// Write to a peripheral
    ///
    /// `data[0]` is the register/command byte, the rest is payload. Empty
    /// `data` is rejected before anything is sent.
    pub fn i2c_write(&mut self, addr: I2cAddress, data: &[u8]) -> Result<()> {
        let (&reg, payload) = data.split_first().ok_or_else(|| {
            Error::InvalidArgument("I2C write needs at least a register byte".into())
        })?;
        self.i2c_write_register(addr, reg, payload)
    }

    /// Write `payload` to register/command `reg` of a peripheral
    pub fn i2c_write_register(&mut self, addr: I2cAddress, reg: u8, payload: &[u8]) -> Result<()> {
        log::debug!(
            "I2C write {} reg 0x{:02x} len {}",
            addr,
            reg,
            payload.len()
        );
        self.control_write(ControlRequest::smbus_write(addr.bus(), reg), payload)
    }
}
