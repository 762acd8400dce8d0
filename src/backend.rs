//! Backend selection
//!
//! The `--device` argument takes the form `name[:key=value,...]`. Keys
//! `vid`, `pid` and `index` pick the device; everything else goes to
//! [`glhub_core::parse_options`].

use glhub_core::{parse_options, HubConfig};
use thiserror::Error;

/// Default Genesys Logic vendor ID
pub const DEFAULT_VID: u16 = 0x05E3;
/// Default product ID (GL3523 family)
pub const DEFAULT_PID: u16 = 0x0610;

/// Backend selection errors
#[derive(Debug, Error)]
pub enum BackendError {
    /// Name not known or not compiled in
    #[error("unknown backend '{0}' (available: {1})")]
    Unknown(String, String),
    /// Malformed `key=value` pair
    #[error("invalid option '{0}': expected key=value")]
    MalformedOption(String),
    /// Value does not parse
    #[error("invalid value '{value}' for '{key}'")]
    InvalidValue {
        /// Option key
        key: String,
        /// Offending value
        value: String,
    },
    /// Rejected by the core option parser
    #[error(transparent)]
    Config(#[from] glhub_core::Error),
}

/// Supported backend kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Real hardware over nusb
    Usb,
    /// In-memory emulator
    Dummy,
}

impl BackendKind {
    fn from_name(name: &str) -> Result<Self, BackendError> {
        match name {
            #[cfg(feature = "usb")]
            "usb" => Ok(Self::Usb),
            #[cfg(feature = "dummy")]
            "dummy" => Ok(Self::Dummy),
            _ => Err(BackendError::Unknown(name.to_string(), available().join(", "))),
        }
    }
}

/// Backend names compiled into this binary
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available() -> Vec<&'static str> {
    let mut names = Vec::new();
    #[cfg(feature = "usb")]
    names.push("usb");
    #[cfg(feature = "dummy")]
    names.push("dummy");
    names
}

/// Parsed `--device` argument
#[derive(Debug, Clone)]
pub struct BackendSpec {
    pub kind: BackendKind,
    pub vid: u16,
    pub pid: u16,
    /// Nth matching device
    pub index: usize,
    pub config: HubConfig,
}

fn parse_u16_hex(key: &str, value: &str) -> Result<u16, BackendError> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    u16::from_str_radix(digits, 16).map_err(|_| BackendError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

impl BackendSpec {
    /// Parse `name[:key=value,...]`
    pub fn parse(s: &str) -> Result<Self, BackendError> {
        let (name, params) = match s.split_once(':') {
            Some((name, params)) => (name, params),
            None => (s, ""),
        };
        let kind = BackendKind::from_name(name.trim())?;

        let mut vid = DEFAULT_VID;
        let mut pid = DEFAULT_PID;
        let mut index = 0;
        let mut rest = Vec::new();

        for pair in params.split(',').filter(|p| !p.trim().is_empty()) {
            let (key, value) = pair
                .split_once('=')
                .map(|(k, v)| (k.trim(), v.trim()))
                .ok_or_else(|| BackendError::MalformedOption(pair.to_string()))?;
            match key {
                "vid" => vid = parse_u16_hex(key, value)?,
                "pid" => pid = parse_u16_hex(key, value)?,
                "index" => {
                    index = value.parse().map_err(|_| BackendError::InvalidValue {
                        key: key.to_string(),
                        value: value.to_string(),
                    })?
                }
                _ => rest.push((key, value)),
            }
        }

        let config = parse_options(&rest)?;
        log::debug!(
            "Backend {:?} {:04x}:{:04x} index {} {:?}",
            kind,
            vid,
            pid,
            index,
            config
        );

        Ok(Self {
            kind,
            vid,
            pid,
            index,
            config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    #[cfg(feature = "usb")]
    fn test_parse_defaults() {
        let spec = BackendSpec::parse("usb").unwrap();
        assert_eq!(spec.kind, BackendKind::Usb);
        assert_eq!(spec.vid, DEFAULT_VID);
        assert_eq!(spec.pid, DEFAULT_PID);
        assert_eq!(spec.index, 0);
        assert_eq!(spec.config, HubConfig::default());
    }

    #[test]
    #[cfg(feature = "usb")]
    fn test_parse_options() {
        let spec = BackendSpec::parse("usb:pid=0620,index=1,timeout=2s,poll=5ms").unwrap();
        assert_eq!(spec.vid, DEFAULT_VID);
        assert_eq!(spec.pid, 0x0620);
        assert_eq!(spec.index, 1);
        assert_eq!(spec.config.transfer_timeout, Duration::from_secs(2));
        assert_eq!(spec.config.poll_interval, Duration::from_millis(5));
    }

    #[test]
    #[cfg(feature = "dummy")]
    fn test_parse_dummy() {
        let spec = BackendSpec::parse("dummy:vid=0x1234").unwrap();
        assert_eq!(spec.kind, BackendKind::Dummy);
        assert_eq!(spec.vid, 0x1234);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            BackendSpec::parse("ch341a"),
            Err(BackendError::Unknown(..))
        ));
        #[cfg(feature = "dummy")]
        {
            assert!(matches!(
                BackendSpec::parse("dummy:pid"),
                Err(BackendError::MalformedOption(_))
            ));
            assert!(matches!(
                BackendSpec::parse("dummy:pid=xyz"),
                Err(BackendError::InvalidValue { .. })
            ));
            assert!(matches!(
                BackendSpec::parse("dummy:speed=9"),
                Err(BackendError::Config(_))
            ));
        }
    }
}
