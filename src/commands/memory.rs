//! Read and XRAM write commands

use std::fs::File;
use std::io::Write;
use std::path::Path;

use glhub_core::{ControlTransport, Hub, Region};
use indicatif::{ProgressBar, ProgressStyle};

use super::CmdResult;

/// Read `length` bytes of `region` from `address` to a file or stdout
pub fn run_read<T: ControlTransport>(
    hub: &mut Hub<T>,
    region: Region,
    address: u32,
    length: u32,
    output: Option<&Path>,
) -> CmdResult {
    let length = length as usize;
    println!(
        "Reading {} bytes of {:?} from 0x{:05x}...",
        length, region, address
    );

    let pb = ProgressBar::new(length as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta}) Reading")?
            .progress_chars("#>-"),
    );

    let data = hub.read_linear_with(region, address, length, |done| pb.set_position(done as u64));
    pb.finish_and_clear();
    let data = data?;

    match output {
        Some(path) => {
            let mut file = File::create(path)?;
            file.write_all(&data)?;
            println!("Wrote {} bytes to {:?}", data.len(), path);
        }
        None => print!("{}", hex_dump(address, &data)),
    }

    Ok(())
}

/// Write `data` to XRAM at `address`
pub fn run_write_xram<T: ControlTransport>(hub: &mut Hub<T>, address: u32, data: &[u8]) -> CmdResult {
    if data.is_empty() {
        return Err("no data to write".into());
    }
    hub.write_xram(address, data)?;
    println!("Wrote {} bytes to XRAM at 0x{:04x}", data.len(), address);
    Ok(())
}

/// Classic 16-bytes-per-line hex dump
pub fn hex_dump(base: u32, data: &[u8]) -> String {
    let mut out = String::new();
    for (i, chunk) in data.chunks(16).enumerate() {
        let addr = base as usize + i * 16;
        out.push_str(&format!("{:05x}: ", addr));
        for (j, b) in chunk.iter().enumerate() {
            if j == 8 {
                out.push(' ');
            }
            out.push_str(&format!("{:02x} ", b));
        }
        for j in chunk.len()..16 {
            if j == 8 {
                out.push(' ');
            }
            out.push_str("   ");
        }
        out.push(' ');
        out.extend(chunk.iter().map(|&b| {
            if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '.'
            }
        }));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_dump() {
        let dump = hex_dump(0x100, b"GL3523 hub\x00\x01");
        assert_eq!(
            dump,
            "00100: 47 4c 33 35 32 33 20 68  75 62 00 01              GL3523 hub..\n"
        );
    }

    #[test]
    fn test_hex_dump_multiline() {
        let data = [0xFFu8; 20];
        let dump = hex_dump(0, &data);
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("00000: ff ff"));
        assert!(lines[1].starts_with("00010: ff ff ff ff "));
    }
}
