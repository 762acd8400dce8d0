//! Device session
//!
//! A [`Hub`] owns an opened device together with the identifiers used to
//! find it. Resetting the hub makes it drop off the bus, so
//! [`Hub::reset`] consumes the session and returns a freshly looked-up one.

use std::fmt;
use std::time::Duration;

use crate::cancel::CancelToken;
use crate::config::HubConfig;
use crate::error::{Error, Result};
use crate::progress::IspStage;
use crate::protocol::{
    Command, ControlRequest, FW_VER_LEN, SUB_FW_VER, SUB_ISP_OFF, SUB_ISP_ON, SUB_RESET,
};
use crate::transport::{ControlTransport, HubConnector};

/// Raw firmware version as reported by the hub
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FirmwareVersion(pub [u8; FW_VER_LEN]);

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x}.{:02x}", self.0[0], self.0[1])
    }
}

/// An opened Genesys Logic hub
pub struct Hub<T> {
    transport: T,
    vid: u16,
    pid: u16,
    config: HubConfig,
    cancel: Option<CancelToken>,
}

impl<T: ControlTransport> Hub<T> {
    /// Wrap an already opened transport
    pub fn new(transport: T, vid: u16, pid: u16, config: HubConfig) -> Self {
        Self {
            transport,
            vid,
            pid,
            config,
            cancel: None,
        }
    }

    /// Look up and open the first hub matching `vid`/`pid`
    pub fn open<C>(connector: &mut C, vid: u16, pid: u16, config: HubConfig) -> Result<Self>
    where
        C: HubConnector<Transport = T>,
    {
        log::debug!("Looking up hub {:04x}:{:04x}", vid, pid);
        let transport = connector
            .open(vid, pid)
            .map_err(Error::transport)?
            .ok_or(Error::DeviceNotFound { vid, pid })?;
        log::info!("Opened hub {:04x}:{:04x}", vid, pid);
        Ok(Self::new(transport, vid, pid, config))
    }

    /// Re-acquire a session by identifiers, e.g. after the device re-enumerated
    pub fn reconnect<C>(connector: &mut C, vid: u16, pid: u16, config: HubConfig) -> Result<Self>
    where
        C: HubConnector<Transport = T>,
    {
        Self::open(connector, vid, pid, config)
    }

    /// Attach a cancel token checked by long-running operations
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// The attached cancel token, if any
    pub fn cancel_token(&self) -> Option<&CancelToken> {
        self.cancel.as_ref()
    }

    /// USB vendor ID this session was opened with
    pub fn vid(&self) -> u16 {
        self.vid
    }

    /// USB product ID this session was opened with
    pub fn pid(&self) -> u16 {
        self.pid
    }

    /// Session configuration
    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Underlying transport, mutably
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Give up the session and return the transport
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Inbound vendor transfer; may return fewer than `length` bytes
    pub fn control_read(&mut self, req: ControlRequest, length: usize) -> Result<Vec<u8>> {
        log::trace!(
            "IN  {:?} (0x{:02x}) value=0x{:04x} index=0x{:04x} len={}",
            req.command,
            req.command as u8,
            req.value,
            req.index,
            length
        );
        self.transport
            .control_in(
                req.command as u8,
                req.value,
                req.index,
                length,
                self.config.transfer_timeout,
            )
            .map_err(Error::transport)
    }

    /// Outbound vendor transfer
    pub fn control_write(&mut self, req: ControlRequest, data: &[u8]) -> Result<()> {
        log::trace!(
            "OUT {:?} (0x{:02x}) value=0x{:04x} index=0x{:04x} len={}",
            req.command,
            req.command as u8,
            req.value,
            req.index,
            data.len()
        );
        self.transport
            .control_out(
                req.command as u8,
                req.value,
                req.index,
                data,
                self.config.transfer_timeout,
            )
            .map_err(Error::transport)
    }

    /// Inbound transfer that must return exactly `length` bytes
    pub(crate) fn control_read_exact(
        &mut self,
        req: ControlRequest,
        length: usize,
    ) -> Result<Vec<u8>> {
        let data = self.control_read(req, length)?;
        if data.len() < length {
            return Err(Error::ShortRead {
                expected: length,
                actual: data.len(),
            });
        }
        Ok(data)
    }

    pub(crate) fn check_cancelled(&self) -> Result<()> {
        match &self.cancel {
            Some(token) => token.check(),
            None => Ok(()),
        }
    }

    /// Sleep `duration` in slices of the poll interval, honoring cancellation
    pub(crate) fn wait(&mut self, duration: Duration) -> Result<()> {
        let slice = self.config.poll_interval.max(Duration::from_millis(1));
        let mut left = duration;
        while !left.is_zero() {
            self.check_cancelled()?;
            let step = left.min(slice);
            self.transport.delay(step);
            left -= step;
        }
        self.check_cancelled()
    }

    /// Read the 2-byte firmware version
    pub fn read_fw_version(&mut self) -> Result<FirmwareVersion> {
        let data = self.control_read_exact(
            ControlRequest::new(Command::Read, SUB_FW_VER, 0),
            FW_VER_LEN,
        )?;
        Ok(FirmwareVersion([data[0], data[1]]))
    }

    /// Enter or leave ISP mode
    ///
    /// The hub does not acknowledge the mode change; there is no read-back.
    pub fn set_isp_mode(&mut self, on: bool) -> Result<()> {
        let sub = if on { SUB_ISP_ON } else { SUB_ISP_OFF };
        log::debug!("ISP mode {}", if on { "on" } else { "off" });
        self.control_write(ControlRequest::switch(sub), &[])
    }

    /// Reset the hub and look it up again once it has re-enumerated
    ///
    /// The current session is consumed. The returned session carries over
    /// the configuration and cancel token. A single lookup is attempted
    /// after `reset_delay`; if it finds nothing, [`Error::DeviceNotFound`]
    /// is returned and retrying is up to the caller.
    pub fn reset<C: HubConnector>(self, connector: &mut C) -> Result<Hub<C::Transport>> {
        self.reset_with(connector, |_| {})
    }

    pub(crate) fn reset_with<C, F>(
        mut self,
        connector: &mut C,
        mut on_stage: F,
    ) -> Result<Hub<C::Transport>>
    where
        C: HubConnector,
        F: FnMut(IspStage),
    {
        log::info!("Resetting hub {:04x}:{:04x}", self.vid, self.pid);
        self.control_write(ControlRequest::switch(SUB_RESET), &[])?;
        on_stage(IspStage::ResetIssued);

        let delay = self.config.reset_delay;
        self.wait(delay)?;
        on_stage(IspStage::Reconnecting);

        let Hub {
            transport,
            vid,
            pid,
            config,
            cancel,
        } = self;
        drop(transport);

        let hub = Hub::<C::Transport>::open(connector, vid, pid, config)?;
        Ok(match cancel {
            Some(token) => hub.with_cancel_token(token),
            None => hub,
        })
    }
}
