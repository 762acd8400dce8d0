//! Transport traits
//!
//! The core never touches USB itself. A backend provides the vendor control
//! transfer primitive through [`ControlTransport`] and device lookup through
//! [`HubConnector`]. This allows:
//! - real hardware through `glhub-usb` (nusb)
//! - an in-memory emulator through `glhub-dummy`
//! - scripted mocks in unit tests

use std::time::Duration;

/// Vendor control transfers on an opened hub
///
/// All requests are of vendor type with device recipient.
pub trait ControlTransport {
    /// Backend error, wrapped opaquely into [`crate::Error::Transport`]
    type Error: std::error::Error + Send + Sync + 'static;

    /// Device-to-host transfer of up to `length` bytes
    ///
    /// Backends may return fewer bytes than requested; callers check.
    fn control_in(
        &mut self,
        request: u8,
        value: u16,
        index: u16,
        length: usize,
        timeout: Duration,
    ) -> Result<Vec<u8>, Self::Error>;

    /// Host-to-device transfer with `data` as the data stage
    fn control_out(
        &mut self,
        request: u8,
        value: u16,
        index: u16,
        data: &[u8],
        timeout: Duration,
    ) -> Result<(), Self::Error>;

    /// Block the calling thread for `duration`
    ///
    /// Emulated backends override this to advance virtual time instead.
    fn delay(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Locates a hub by its USB identifiers and opens it
pub trait HubConnector {
    /// Transport handed out for an opened device
    type Transport: ControlTransport;
    /// Lookup/open failure
    type Error: std::error::Error + Send + Sync + 'static;

    /// Open the first device matching `vid`/`pid`
    ///
    /// Returns `Ok(None)` when no such device is connected.
    fn open(&mut self, vid: u16, pid: u16) -> Result<Option<Self::Transport>, Self::Error>;
}

#[cfg(test)]
pub(crate) mod mock {
    //! Scripted transport for unit tests

    use super::*;
    use std::collections::VecDeque;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Transfer {
        In {
            request: u8,
            value: u16,
            index: u16,
            length: usize,
        },
        Out {
            request: u8,
            value: u16,
            index: u16,
            data: Vec<u8>,
        },
    }

    #[derive(Debug, thiserror::Error)]
    #[error("mock transfer failed")]
    pub struct MockError;

    /// Answers IN transfers from a queue, falling back to
    /// `fill(index + i)` when the queue is empty
    #[derive(Default)]
    pub struct MockTransport {
        pub log: Vec<Transfer>,
        pub responses: VecDeque<Vec<u8>>,
        pub delays: Vec<Duration>,
        pub fail_at: Option<usize>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn respond(&mut self, data: &[u8]) {
            self.responses.push_back(data.to_vec());
        }

        pub fn ins(&self) -> Vec<Transfer> {
            self.log
                .iter()
                .filter(|t| matches!(t, Transfer::In { .. }))
                .cloned()
                .collect()
        }

        pub fn outs(&self) -> Vec<Transfer> {
            self.log
                .iter()
                .filter(|t| matches!(t, Transfer::Out { .. }))
                .cloned()
                .collect()
        }

        fn check_fail(&self) -> Result<(), MockError> {
            match self.fail_at {
                Some(n) if self.log.len() > n => Err(MockError),
                _ => Ok(()),
            }
        }
    }

    pub fn fill(addr: usize) -> u8 {
        (addr % 251) as u8
    }

    impl ControlTransport for MockTransport {
        type Error = MockError;

        fn control_in(
            &mut self,
            request: u8,
            value: u16,
            index: u16,
            length: usize,
            _timeout: Duration,
        ) -> Result<Vec<u8>, MockError> {
            self.log.push(Transfer::In {
                request,
                value,
                index,
                length,
            });
            self.check_fail()?;
            Ok(self.responses.pop_front().unwrap_or_else(|| {
                let base = ((value as usize & 0xF000) << 4) | index as usize;
                (0..length).map(|i| fill(base + i)).collect()
            }))
        }

        fn control_out(
            &mut self,
            request: u8,
            value: u16,
            index: u16,
            data: &[u8],
            _timeout: Duration,
        ) -> Result<(), MockError> {
            self.log.push(Transfer::Out {
                request,
                value,
                index,
                data: data.to_vec(),
            });
            self.check_fail()
        }

        fn delay(&mut self, duration: Duration) {
            self.delays.push(duration);
        }
    }

    /// Connector that hands out fresh mocks until `remaining` is exhausted
    pub struct MockConnector {
        pub remaining: usize,
        pub lookups: Vec<(u16, u16)>,
    }

    impl MockConnector {
        pub fn new(remaining: usize) -> Self {
            Self {
                remaining,
                lookups: Vec::new(),
            }
        }
    }

    impl HubConnector for MockConnector {
        type Transport = MockTransport;
        type Error = MockError;

        fn open(&mut self, vid: u16, pid: u16) -> Result<Option<MockTransport>, MockError> {
            self.lookups.push((vid, pid));
            if self.remaining == 0 {
                return Ok(None);
            }
            self.remaining -= 1;
            Ok(Some(MockTransport::new()))
        }
    }
}
