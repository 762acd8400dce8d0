//! glhub - Genesys Logic USB hub vendor command tool
//!
//! Talks to GL35xx-family hubs over their vendor control requests to read
//! and write controller memory, drive the SPI configuration flash, reach
//! I2C peripherals behind the hub, and reprogram the hub firmware.
//!
//! Backends are selected with `--device`:
//! - `usb[:vid=05e3,pid=0610,index=0,timeout=1000,...]` for real hardware
//! - `dummy[:...]` for an in-memory emulated hub

mod backend;
mod cli;
mod commands;

use backend::{BackendKind, BackendSpec};
use clap::Parser;
use cli::Cli;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    let spec = BackendSpec::parse(&cli.device)?;

    let result: Result<(), Box<dyn std::error::Error>> = match spec.kind {
        #[cfg(feature = "usb")]
        BackendKind::Usb => {
            let mut connector = glhub_usb::UsbConnector::with_index(spec.index);
            commands::run(&mut connector, &spec, cli.command)
        }
        #[cfg(feature = "dummy")]
        BackendKind::Dummy => {
            let dummy = glhub_dummy::DummyHub::new(glhub_dummy::DummyConfig {
                vid: spec.vid,
                pid: spec.pid,
                ..Default::default()
            });
            // EEPROM-like peripheral for the i2c commands
            dummy.state().add_smbus_device(0xA0);
            let mut connector = dummy.connector();
            commands::run(&mut connector, &spec, cli.command)
        }
        #[allow(unreachable_patterns)]
        kind => Err(format!("backend {:?} not compiled in", kind).into()),
    };

    if let Err(e) = result {
        log::error!("{}", e);
        std::process::exit(1);
    }

    Ok(())
}
