//! I2C bridge commands

use glhub_core::{ControlTransport, Hub, I2cAddress};

use super::memory::hex_dump;
use super::CmdResult;

/// Read from a peripheral, optionally starting at `register`
pub fn run_read<T: ControlTransport>(
    hub: &mut Hub<T>,
    address: u8,
    register: Option<u8>,
    length: u32,
) -> CmdResult {
    let addr = I2cAddress::from_7bit(address)?;
    let length = length as usize;
    let data = match register {
        Some(reg) => hub.i2c_read_register(addr, reg, length)?,
        None => hub.i2c_read(addr, length)?,
    };
    print!("{}", hex_dump(u32::from(register.unwrap_or(0)), &data));
    Ok(())
}

/// Write `data` to a peripheral; the first byte selects the register
pub fn run_write<T: ControlTransport>(hub: &mut Hub<T>, address: u8, data: &[u8]) -> CmdResult {
    let addr = I2cAddress::from_7bit(address)?;
    hub.i2c_write(addr, data)?;
    println!("Wrote {} bytes to I2C device {}", data.len(), addr);
    Ok(())
}
