//! Progress reporting for the ISP workflow

use std::fmt;

/// Steps of a full reprogramming run, in the order they are entered
///
/// The sequence is strictly linear. A failure in any stage aborts the run;
/// there is no resume point, the whole workflow must be restarted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IspStage {
    /// Nothing issued yet
    Idle,
    /// Switch-mode "ISP on" sent
    IspEnabled,
    /// Chip erase issued, waiting for completion
    Erasing,
    /// Chip erase completed without error
    Erased,
    /// Image chunks being written
    Writing,
    /// Reading back the image range
    Verifying,
    /// Flash matches the image
    Verified,
    /// Reset sent; the hub is re-enumerating
    ResetIssued,
    /// Looking the hub up again
    Reconnecting,
    /// New session acquired
    Done,
}

impl fmt::Display for IspStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IspStage::Idle => "idle",
            IspStage::IspEnabled => "ISP enabled",
            IspStage::Erasing => "erasing",
            IspStage::Erased => "erased",
            IspStage::Writing => "writing",
            IspStage::Verifying => "verifying",
            IspStage::Verified => "verified",
            IspStage::ResetIssued => "reset issued",
            IspStage::Reconnecting => "reconnecting",
            IspStage::Done => "done",
        };
        f.write_str(s)
    }
}

/// Callback for progress reporting during reprogramming
pub trait IspProgress {
    /// Called when a new stage is entered
    fn stage(&mut self, stage: IspStage);

    /// Called after every written chunk
    fn write_progress(&mut self, bytes_written: usize, total_bytes: usize);

    /// Called after every verified window
    fn verify_progress(&mut self, bytes_read: usize, total_bytes: usize);
}

/// A no-op progress reporter
pub struct NoProgress;

impl IspProgress for NoProgress {
    fn stage(&mut self, _stage: IspStage) {}
    fn write_progress(&mut self, _bytes_written: usize, _total_bytes: usize) {}
    fn verify_progress(&mut self, _bytes_read: usize, _total_bytes: usize) {}
}
