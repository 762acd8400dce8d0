//! Hub session configuration

use std::time::Duration;

use crate::error::{Error, Result};

/// Default timeout of a single control transfer
pub const DEFAULT_TRANSFER_TIMEOUT: Duration = Duration::from_millis(1000);
/// Default delay between SPI status polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);
/// Default deadline of one busy-wait (chip erase is the slowest case)
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(200);
/// Default wait for the hub to re-enumerate after reset
pub const DEFAULT_RESET_DELAY: Duration = Duration::from_secs(5);

/// Timing parameters of a hub session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubConfig {
    /// Timeout passed to every control transfer
    pub transfer_timeout: Duration,
    /// Sleep between two SPI status reads while busy
    pub poll_interval: Duration,
    /// Give up waiting for the busy bit after this long
    pub busy_timeout: Duration,
    /// Wait between issuing reset and looking the device up again
    pub reset_delay: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            transfer_timeout: DEFAULT_TRANSFER_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            reset_delay: DEFAULT_RESET_DELAY,
        }
    }
}

impl HubConfig {
    /// Maximum number of status polls before [`Error::Timeout`]
    pub fn max_polls(&self) -> u64 {
        let poll_ms = self.poll_interval.as_millis().max(1);
        u64::try_from(self.busy_timeout.as_millis() / poll_ms)
            .unwrap_or(u64::MAX)
            .max(1)
    }
}

/// Parse a duration given in milliseconds, with optional `ms` or `s` suffix
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim().to_lowercase();
    if let Some(ms) = s.strip_suffix("ms") {
        ms.trim().parse().ok().map(Duration::from_millis)
    } else if let Some(secs) = s.strip_suffix('s') {
        secs.trim().parse().ok().map(Duration::from_secs)
    } else {
        s.parse().ok().map(Duration::from_millis)
    }
}

/// Parse options from key=value pairs
///
/// Recognized keys: `timeout`, `poll`, `busy-timeout`, `reset-delay`.
pub fn parse_options(options: &[(&str, &str)]) -> Result<HubConfig> {
    let mut config = HubConfig::default();

    for (key, value) in options {
        let slot = match *key {
            "timeout" => &mut config.transfer_timeout,
            "poll" => &mut config.poll_interval,
            "busy-timeout" | "busy_timeout" => &mut config.busy_timeout,
            "reset-delay" | "reset_delay" => &mut config.reset_delay,
            _ => {
                return Err(Error::InvalidArgument(format!("unknown option: {}", key)));
            }
        };
        *slot = parse_duration(value)
            .ok_or_else(|| Error::InvalidArgument(format!("{}: {}", key, value)))?;
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("250"), Some(Duration::from_millis(250)));
        assert_eq!(parse_duration("250ms"), Some(Duration::from_millis(250)));
        assert_eq!(parse_duration("5s"), Some(Duration::from_secs(5)));
        assert_eq!(parse_duration("5S"), Some(Duration::from_secs(5)));
        assert_eq!(parse_duration("fast"), None);
    }

    #[test]
    fn test_parse_options() {
        let config = parse_options(&[("timeout", "2000"), ("reset-delay", "1s")]).unwrap();
        assert_eq!(config.transfer_timeout, Duration::from_millis(2000));
        assert_eq!(config.reset_delay, Duration::from_secs(1));
        assert_eq!(config.poll_interval, DEFAULT_POLL_INTERVAL);

        assert!(matches!(
            parse_options(&[("speed", "1")]),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            parse_options(&[("poll", "soon")]),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_max_polls() {
        let config = HubConfig::default();
        assert_eq!(config.max_polls(), 20_000);

        let config = HubConfig {
            poll_interval: Duration::ZERO,
            busy_timeout: Duration::from_millis(50),
            ..HubConfig::default()
        };
        assert_eq!(config.max_polls(), 50);

        let config = HubConfig {
            poll_interval: Duration::from_millis(1),
            busy_timeout: Duration::MAX,
            ..HubConfig::default()
        };
        assert_eq!(config.max_polls(), u64::MAX);
    }
}
