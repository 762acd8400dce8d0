//! Info command implementation

use glhub_core::{ControlTransport, Hub, SpiStatus};

use super::CmdResult;

/// Print firmware version and SPI flash identity
pub fn run_info<T: ControlTransport>(hub: &mut Hub<T>) -> CmdResult {
    let version = hub.read_fw_version()?;
    let id = hub.read_spi_id()?;
    let status = hub.read_spi_status()?;

    println!("Hub:              {:04x}:{:04x}", hub.vid(), hub.pid());
    println!("Firmware version: {}", version);
    println!(
        "SPI flash ID:     {:02X} {:02X}{:02X}",
        id[0], id[1], id[2]
    );
    println!(
        "SPI status:       0x{:02X}{}",
        status.bits(),
        describe_status(status)
    );

    Ok(())
}

fn describe_status(status: SpiStatus) -> String {
    let mut flags = Vec::new();
    if status.contains(SpiStatus::BUSY) {
        flags.push("busy");
    }
    if status.contains(SpiStatus::ERASE_ERROR) {
        flags.push("erase error");
    }
    if status.contains(SpiStatus::PROGRAM_ERROR) {
        flags.push("program error");
    }
    if flags.is_empty() {
        String::new()
    } else {
        format!(" ({})", flags.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_status() {
        assert_eq!(describe_status(SpiStatus::empty()), "");
        assert_eq!(describe_status(SpiStatus::BUSY), " (busy)");
        assert_eq!(
            describe_status(SpiStatus::ERASE_ERROR | SpiStatus::PROGRAM_ERROR),
            " (erase error, program error)"
        );
    }
}
