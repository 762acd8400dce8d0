//! CLI command implementations
//!
//! Every command except `list` runs against an open [`Hub`] session. All of
//! them are generic over the backend's [`HubConnector`].

mod flash;
mod i2c;
mod info;
mod list;
mod memory;

use glhub_core::{Hub, HubConnector};

use crate::backend::BackendSpec;
use crate::cli::Commands;

type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Open the hub through `connector` and run `command` on it
pub fn run<C>(connector: &mut C, spec: &BackendSpec, command: Commands) -> CmdResult
where
    C: HubConnector,
{
    if let Commands::List = command {
        return list::run_list(spec);
    }

    let mut hub = Hub::open(connector, spec.vid, spec.pid, spec.config.clone())?;

    match command {
        Commands::List => Ok(()),
        Commands::Info => info::run_info(&mut hub),
        Commands::Read {
            region,
            address,
            length,
            output,
        } => memory::run_read(&mut hub, region.into(), address, length, output.as_deref()),
        Commands::WriteXram { address, data } => memory::run_write_xram(&mut hub, address, &data.0),
        Commands::Isp { off } => {
            hub.set_isp_mode(!off)?;
            println!("ISP mode {}", if off { "off" } else { "on" });
            Ok(())
        }
        Commands::Erase => flash::run_erase(&mut hub),
        Commands::Program { input } => flash::run_program(hub, connector, &input),
        Commands::Verify { input } => flash::run_verify(&mut hub, &input),
        Commands::I2cRead {
            address,
            register,
            length,
        } => i2c::run_read(&mut hub, address, register, length),
        Commands::I2cWrite { address, data } => i2c::run_write(&mut hub, address, &data.0),
        Commands::Reset => {
            println!("Resetting hub...");
            let hub = hub.reset(connector)?;
            println!("Hub {:04x}:{:04x} is back", hub.vid(), hub.pid());
            Ok(())
        }
    }
}

#[cfg(all(test, feature = "dummy"))]
mod tests {
    use super::*;
    use crate::cli::{HexBytes, RegionArg};
    use glhub_dummy::{DummyConfig, DummyHub};
    use std::path::PathBuf;

    fn spec() -> BackendSpec {
        BackendSpec::parse("dummy:reset-delay=10ms").unwrap()
    }

    fn image_file(name: &str, data: &[u8]) -> PathBuf {
        let path = std::env::temp_dir().join(format!("glhub-{}-{}.bin", name, std::process::id()));
        std::fs::write(&path, data).unwrap();
        path
    }

    #[test]
    fn test_program_then_verify() {
        let dummy = DummyHub::new(DummyConfig::default());
        let mut connector = dummy.connector();
        let image: Vec<u8> = (0..6000u32).map(|i| (i % 97) as u8).collect();
        let input = image_file("program", &image);

        run(&mut connector, &spec(), Commands::Program { input: input.clone() }).unwrap();
        assert_eq!(&dummy.state().flash[..image.len()], &image[..]);
        assert_eq!(dummy.state().resets, 1);

        run(&mut connector, &spec(), Commands::Verify { input: input.clone() }).unwrap();
        std::fs::remove_file(input).unwrap();
    }

    #[test]
    fn test_verify_mismatch_fails() {
        let dummy = DummyHub::new(DummyConfig::default());
        let mut connector = dummy.connector();
        let input = image_file("mismatch", &[0x00; 16]);

        assert!(run(&mut connector, &spec(), Commands::Verify { input: input.clone() }).is_err());
        std::fs::remove_file(input).unwrap();
    }

    #[test]
    fn test_xram_and_i2c() {
        let dummy = DummyHub::new(DummyConfig::default());
        dummy.state().add_smbus_device(0xA0);
        let mut connector = dummy.connector();

        run(
            &mut connector,
            &spec(),
            Commands::WriteXram {
                address: 0x4000,
                data: HexBytes(vec![1, 2, 3]),
            },
        )
        .unwrap();
        assert_eq!(&dummy.state().xram[0x4000..0x4003], &[1, 2, 3]);

        let output = std::env::temp_dir().join(format!("glhub-xram-{}.bin", std::process::id()));
        run(
            &mut connector,
            &spec(),
            Commands::Read {
                region: RegionArg::Xram,
                address: 0x4000,
                length: 3,
                output: Some(output.clone()),
            },
        )
        .unwrap();
        assert_eq!(std::fs::read(&output).unwrap(), vec![1, 2, 3]);
        std::fs::remove_file(output).unwrap();

        run(
            &mut connector,
            &spec(),
            Commands::I2cWrite {
                address: 0x50,
                data: HexBytes(vec![0x10, 0xAB]),
            },
        )
        .unwrap();
        run(
            &mut connector,
            &spec(),
            Commands::I2cRead {
                address: 0x50,
                register: Some(0x10),
                length: 1,
            },
        )
        .unwrap();
        assert!(run(
            &mut connector,
            &spec(),
            Commands::I2cRead {
                address: 0x80,
                register: None,
                length: 1,
            },
        )
        .is_err());
    }

    #[test]
    fn test_device_not_found() {
        let dummy = DummyHub::new(DummyConfig {
            pid: 0x0620,
            ..Default::default()
        });
        let mut connector = dummy.connector();
        assert!(run(&mut connector, &spec(), Commands::Info).is_err());
    }
}
