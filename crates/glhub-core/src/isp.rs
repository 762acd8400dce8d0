//! In-system reprogramming of the hub firmware
//!
//! The full workflow is:
//!
//! 1. enter ISP mode (no read-back exists)
//! 2. chip erase, with busy-wait and error check
//! 3. write the image from address 0 in window-sized chunks, busy-wait after each
//! 4. read the whole range back and compare
//! 5. reset, wait for re-enumeration and look the hub up again
//!
//! Any failure aborts immediately. Flash is never rolled back: an erase
//! failure leaves the hub in ISP mode with undefined contents, a write or
//! verify failure leaves whatever was written. Rerunning the workflow from
//! the start recovers, since erase is idempotent.

use crate::error::{Error, Result};
use crate::hub::Hub;
use crate::memory::Region;
use crate::progress::{IspProgress, IspStage};
use crate::transport::{ControlTransport, HubConnector};

fn enter<P: IspProgress + ?Sized>(current: &mut IspStage, next: IspStage, progress: &mut P) {
    log::info!("ISP: {}", next);
    *current = next;
    progress.stage(next);
}

impl<T: ControlTransport> Hub<T> {
    /// Replace the hub firmware with `image`
    ///
    /// Consumes the session, since the final reset invalidates it, and
    /// returns the re-acquired one.
    pub fn program_flash<C, P>(
        mut self,
        connector: &mut C,
        image: &[u8],
        progress: &mut P,
    ) -> Result<Hub<C::Transport>>
    where
        C: HubConnector,
        P: IspProgress + ?Sized,
    {
        if image.is_empty() {
            return Err(Error::InvalidArgument("firmware image is empty".into()));
        }
        Region::Flash.check_range(0, image.len())?;

        let mut stage = IspStage::Idle;
        if let Err(e) = self.flash_image(image, progress, &mut stage) {
            log::error!("ISP aborted while {}: {}", stage, e);
            return Err(e);
        }

        let hub = self
            .reset_and_reconnect(connector, progress, &mut stage)
            .inspect_err(|e| log::error!("ISP aborted while {}: {}", stage, e))?;
        enter(&mut stage, IspStage::Done, progress);
        Ok(hub)
    }

    /// Steps 1-4: ISP on, erase, write, verify
    fn flash_image<P>(&mut self, image: &[u8], progress: &mut P, stage: &mut IspStage) -> Result<()>
    where
        P: IspProgress + ?Sized,
    {
        let total = image.len();

        self.check_cancelled()?;
        self.set_isp_mode(true)?;
        enter(stage, IspStage::IspEnabled, progress);

        self.check_cancelled()?;
        enter(stage, IspStage::Erasing, progress);
        self.erase_chip()?;
        enter(stage, IspStage::Erased, progress);

        enter(stage, IspStage::Writing, progress);
        self.write_flash_with(0, image, |n| progress.write_progress(n, total))?;

        enter(stage, IspStage::Verifying, progress);
        self.verify_flash_with(0, image, |n| progress.verify_progress(n, total))?;
        enter(stage, IspStage::Verified, progress);

        Ok(())
    }

    /// Step 5: reset and re-acquire the session
    fn reset_and_reconnect<C, P>(
        self,
        connector: &mut C,
        progress: &mut P,
        stage: &mut IspStage,
    ) -> Result<Hub<C::Transport>>
    where
        C: HubConnector,
        P: IspProgress + ?Sized,
    {
        self.check_cancelled()?;
        self.reset_with(connector, |next| enter(stage, next, progress))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HubConfig;
    use crate::progress::NoProgress;
    use crate::transport::mock::{MockConnector, MockTransport, Transfer};

    #[derive(Default)]
    struct Recorder {
        stages: Vec<IspStage>,
        written: Vec<usize>,
    }

    impl IspProgress for Recorder {
        fn stage(&mut self, stage: IspStage) {
            self.stages.push(stage);
        }
        fn write_progress(&mut self, bytes_written: usize, _total_bytes: usize) {
            self.written.push(bytes_written);
        }
        fn verify_progress(&mut self, _bytes_read: usize, _total_bytes: usize) {}
    }

    fn hub() -> Hub<MockTransport> {
        Hub::new(MockTransport::new(), 0x05e3, 0x0610, HubConfig::default())
    }

    #[test]
    fn test_empty_image_rejected() {
        let mut connector = MockConnector::new(1);
        assert!(matches!(
            hub().program_flash(&mut connector, &[], &mut NoProgress),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_oversized_image_rejected() {
        let mut connector = MockConnector::new(1);
        let image = vec![0; (1 << 20) + 1];
        assert!(matches!(
            hub().program_flash(&mut connector, &image, &mut NoProgress),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_sequence_against_mock() {
        // The mock answers reads with a fill pattern, so use it as the image
        let image: Vec<u8> = (0..0x1800)
            .map(crate::transport::mock::fill)
            .collect();
        let mut hub = hub();
        let mut rec = Recorder::default();

        let mut stage = IspStage::Idle;
        hub.flash_image(&image, &mut rec, &mut stage).unwrap();
        assert_eq!(stage, IspStage::Verified);
        assert_eq!(rec.written, vec![0x1000, 0x1800]);

        let outs = hub.transport().outs();
        assert_eq!(outs.len(), 4);
        assert_eq!(
            outs[0],
            Transfer::Out {
                request: 0x81,
                value: 0x01,
                index: 0,
                data: vec![]
            }
        );
        assert_eq!(
            outs[1],
            Transfer::Out {
                request: 0x83,
                value: 0xC701,
                index: 0,
                data: vec![]
            }
        );

        let mut connector = MockConnector::new(1);
        let hub = hub
            .reset_and_reconnect(&mut connector, &mut rec, &mut stage)
            .unwrap();
        assert_eq!((hub.vid(), hub.pid()), (0x05e3, 0x0610));
        assert_eq!(
            rec.stages,
            vec![
                IspStage::IspEnabled,
                IspStage::Erasing,
                IspStage::Erased,
                IspStage::Writing,
                IspStage::Verifying,
                IspStage::Verified,
                IspStage::ResetIssued,
                IspStage::Reconnecting,
            ]
        );
    }

    #[test]
    fn test_stage_order() {
        assert!(IspStage::Idle < IspStage::IspEnabled);
        assert!(IspStage::Verified < IspStage::ResetIssued);
        assert_eq!(IspStage::ResetIssued.to_string(), "reset issued");
    }
}
