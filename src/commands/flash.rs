//! Erase, program and verify commands

use std::path::Path;
use std::time::Duration;

use glhub_core::{ControlTransport, Hub, HubConnector, IspProgress, IspStage};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use super::CmdResult;

/// Progress reporter using indicatif
struct IndicatifProgress {
    multi: MultiProgress,
    current_bar: Option<ProgressBar>,
}

impl IndicatifProgress {
    fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            current_bar: None,
        }
    }

    fn create_bar(&mut self, total: u64, phase: &str) {
        self.finish_current();
        let pb = self.multi.add(ProgressBar::new(total));
        pb.set_style(
            ProgressStyle::default_bar()
                .template(&format!(
                    "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{bytes}}/{{total_bytes}} ({{bytes_per_sec}}, {{eta}}) {}",
                    phase
                ))
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        self.current_bar = Some(pb);
    }

    fn create_spinner(&mut self, message: String) {
        self.finish_current();
        let pb = self.multi.add(ProgressBar::new_spinner());
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(100));
        self.current_bar = Some(pb);
    }

    fn update(&mut self, done: usize, total: usize, phase: &str) {
        if self.current_bar.as_ref().and_then(|pb| pb.length()) != Some(total as u64) {
            self.create_bar(total as u64, phase);
        }
        if let Some(pb) = &self.current_bar {
            pb.set_position(done as u64);
        }
    }

    fn finish_current(&mut self) {
        if let Some(pb) = self.current_bar.take() {
            pb.finish_and_clear();
        }
    }
}

impl IspProgress for IndicatifProgress {
    fn stage(&mut self, stage: IspStage) {
        match stage {
            IspStage::Erasing => self.create_spinner("Erasing flash...".into()),
            IspStage::ResetIssued => self.create_spinner("Resetting hub...".into()),
            IspStage::Reconnecting => self.create_spinner("Waiting for the hub...".into()),
            IspStage::Writing | IspStage::Verifying => self.finish_current(),
            IspStage::Done => {
                self.finish_current();
                println!("Done.");
            }
            _ => {
                self.finish_current();
                if let Err(e) = self.multi.println(format!("{}", stage)) {
                    log::debug!("Failed to print stage: {}", e);
                }
            }
        }
    }

    fn write_progress(&mut self, bytes_written: usize, total_bytes: usize) {
        self.update(bytes_written, total_bytes, "Writing");
    }

    fn verify_progress(&mut self, bytes_read: usize, total_bytes: usize) {
        self.update(bytes_read, total_bytes, "Verifying");
    }
}

impl Drop for IndicatifProgress {
    fn drop(&mut self) {
        self.finish_current();
    }
}

/// Enter ISP mode and erase the whole flash
pub fn run_erase<T: ControlTransport>(hub: &mut Hub<T>) -> CmdResult {
    let mut progress = IndicatifProgress::new();
    hub.set_isp_mode(true)?;
    progress.create_spinner("Erasing flash...".into());
    hub.erase_chip()?;
    progress.finish_current();
    println!("Erase complete. The hub stays in ISP mode until reset.");
    Ok(())
}

/// Full reprogramming run
pub fn run_program<C: HubConnector>(
    hub: Hub<impl ControlTransport>,
    connector: &mut C,
    input: &Path,
) -> CmdResult {
    let image = std::fs::read(input)?;
    println!("Programming {} bytes from {:?}", image.len(), input);

    let mut progress = IndicatifProgress::new();
    let mut hub = hub.program_flash(connector, &image, &mut progress)?;
    drop(progress);

    println!("Firmware version: {}", hub.read_fw_version()?);
    Ok(())
}

/// Compare flash contents against a file
pub fn run_verify<T: ControlTransport>(hub: &mut Hub<T>, input: &Path) -> CmdResult {
    let image = std::fs::read(input)?;
    if image.is_empty() {
        return Err(format!("{:?} is empty", input).into());
    }
    println!("Verifying {} bytes against {:?}", image.len(), input);

    let mut progress = IndicatifProgress::new();
    let total = image.len();
    let result = hub.verify_flash_with(0, &image, |done| progress.verify_progress(done, total));
    progress.finish_current();
    result?;

    println!("Verification passed.");
    Ok(())
}
