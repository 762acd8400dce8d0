//! List command implementation

use crate::backend::{BackendKind, BackendSpec};

use super::CmdResult;

/// List devices reachable through the selected backend
pub fn run_list(spec: &BackendSpec) -> CmdResult {
    match spec.kind {
        BackendKind::Usb => list_usb_devices(spec.vid),
        BackendKind::Dummy => {
            println!("#    ID          Product");
            println!("0    {:04x}:{:04x}   Emulated hub", spec.vid, spec.pid);
            Ok(())
        }
    }
}

#[cfg(feature = "usb")]
fn list_usb_devices(vid: u16) -> CmdResult {
    let devices = glhub_usb::list_devices(vid, None)?;
    if devices.is_empty() {
        println!("No devices with vendor ID {:04x} found", vid);
        return Ok(());
    }

    println!("{:<4} {:<10} {:<8} {:<11} Product", "#", "Bus", "Address", "ID");
    for (i, dev) in devices.iter().enumerate() {
        println!(
            "{:<4} {:<10} {:<8} {:04x}:{:04x}   {}",
            i,
            dev.bus,
            dev.address,
            dev.vid,
            dev.pid,
            dev.product.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

#[cfg(not(feature = "usb"))]
fn list_usb_devices(_vid: u16) -> CmdResult {
    Err("USB support not compiled in".into())
}
