//! CLI argument parsing

use clap::{Parser, Subcommand, ValueEnum};
use glhub_core::Region;
use std::path::PathBuf;

/// Parse a string as a hex or decimal u32
pub fn parse_hex_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

/// Parse a string as a hex or decimal u8
fn parse_hex_u8(s: &str) -> Result<u8, String> {
    let v = parse_hex_u32(s)?;
    u8::try_from(v).map_err(|_| format!("Value out of range: {}", s))
}

/// Byte string given on the command line as hex
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HexBytes(pub Vec<u8>);

/// Parse a hex byte string like "deadbeef", "de:ad:be:ef" or "de ad be ef"
pub fn parse_hex_bytes(s: &str) -> Result<HexBytes, String> {
    let digits: String = s
        .chars()
        .filter(|c| !matches!(c, ' ' | ':' | ',' | '_'))
        .collect();
    let digits = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
        .unwrap_or(&digits);
    if let Some(c) = digits.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(format!("Invalid hex digit '{}' in '{}'", c, s));
    }
    if digits.len() % 2 != 0 {
        return Err(format!("Odd number of hex digits in '{}'", s));
    }
    digits
        .as_bytes()
        .chunks(2)
        .map(|pair| {
            let pair = std::str::from_utf8(pair).map_err(|e| e.to_string())?;
            u8::from_str_radix(pair, 16).map_err(|e| format!("Invalid hex byte '{}': {}", pair, e))
        })
        .collect::<Result<Vec<u8>, String>>()
        .map(HexBytes)
}

#[derive(Parser)]
#[command(name = "glhub")]
#[command(author, version, about = "Genesys Logic USB hub vendor command tool", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Backend and options, e.g. "usb:pid=0610,timeout=2000" or "dummy"
    #[arg(short, long, global = true, default_value = "usb")]
    pub device: String,

    #[command(subcommand)]
    pub command: Commands,
}

/// Address space selector
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum RegionArg {
    /// SPI configuration flash
    Flash,
    /// Controller XRAM
    Xram,
}

impl From<RegionArg> for Region {
    fn from(r: RegionArg) -> Self {
        match r {
            RegionArg::Flash => Region::Flash,
            RegionArg::Xram => Region::Xram,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// List connected Genesys Logic devices
    List,

    /// Show firmware version and SPI flash ID/status
    Info,

    /// Read flash or XRAM to a file (or hex dump to stdout)
    Read {
        /// Address space
        #[arg(short, long, value_enum, default_value = "flash")]
        region: RegionArg,

        /// Start address
        #[arg(short, long, value_parser = parse_hex_u32, default_value = "0")]
        address: u32,

        /// Number of bytes
        #[arg(short, long, value_parser = parse_hex_u32)]
        length: u32,

        /// Output file; hex dump to stdout if omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write bytes to XRAM
    WriteXram {
        /// Start address
        #[arg(short, long, value_parser = parse_hex_u32)]
        address: u32,

        /// Data as hex, e.g. "de ad be ef"
        #[arg(value_parser = parse_hex_bytes)]
        data: HexBytes,
    },

    /// Switch ISP mode on (default) or off
    Isp {
        /// Leave ISP mode instead of entering it
        #[arg(long)]
        off: bool,
    },

    /// Enter ISP mode and erase the whole SPI flash
    Erase,

    /// Reprogram the hub firmware: ISP, erase, write, verify, reset
    Program {
        /// Firmware image
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Compare SPI flash contents with a file
    Verify {
        /// Firmware image
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Read from an I2C/SMBus peripheral behind the hub
    I2cRead {
        /// 7-bit peripheral address
        #[arg(short, long, value_parser = parse_hex_u8)]
        address: u8,

        /// Register/command byte
        #[arg(short, long, value_parser = parse_hex_u8)]
        register: Option<u8>,

        /// Number of bytes
        #[arg(short, long, value_parser = parse_hex_u32, default_value = "1")]
        length: u32,
    },

    /// Write to an I2C/SMBus peripheral; the first byte is the register
    I2cWrite {
        /// 7-bit peripheral address
        #[arg(short, long, value_parser = parse_hex_u8)]
        address: u8,

        /// Register byte followed by payload, as hex
        #[arg(value_parser = parse_hex_bytes)]
        data: HexBytes,
    },

    /// Reset the hub and wait for it to come back
    Reset,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_u32() {
        assert_eq!(parse_hex_u32("0x1000"), Ok(0x1000));
        assert_eq!(parse_hex_u32("4096"), Ok(4096));
        assert!(parse_hex_u32("0xZZ").is_err());
    }

    #[test]
    fn test_parse_hex_bytes() {
        let bytes = HexBytes(vec![0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(parse_hex_bytes("deadbeef"), Ok(bytes.clone()));
        assert_eq!(parse_hex_bytes("de:ad be,ef"), Ok(bytes));
        assert_eq!(parse_hex_bytes("0x10"), Ok(HexBytes(vec![0x10])));
        assert!(parse_hex_bytes("abc").is_err());
        assert!(parse_hex_bytes("zz").is_err());
        assert!(parse_hex_bytes("aé1").is_err());
        assert!(parse_hex_bytes("ééé").is_err());
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from([
            "glhub", "-d", "dummy", "i2c-write", "-a", "0x50", "10 01 02",
        ])
        .unwrap();
        assert_eq!(cli.device, "dummy");
        match cli.command {
            Commands::I2cWrite { address, data } => {
                assert_eq!(address, 0x50);
                assert_eq!(data, HexBytes(vec![0x10, 0x01, 0x02]));
            }
            _ => panic!("wrong subcommand"),
        }
    }
}
