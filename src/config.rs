//! Reader configuration.

use std::time::Duration;

/// Default device path of the controller's serial link.
pub const DEFAULT_PATH: &str = "/dev/ttyUSB0";
/// Default serial speed (baud).
pub const DEFAULT_SPEED: u32 = 115_200;
/// Default sleep between polls in a blocking read.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);
/// Default per-round wait for a Hello after a Ping.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(1);

/// Where the controller lives and how to poll it.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ReaderConfig {
    /// Device path, e.g. `/dev/ttyACM0`
    pub path: String,
    /// Serial speed in baud
    pub speed: u32,
    /// Sleep between polls in [`Reader::read_blocking`](crate::Reader::read_blocking)
    #[cfg_attr(feature = "serde", serde(with = "millis"))]
    pub poll_interval: Duration,
    /// Per-attempt wait in [`Reader::wait_for_ping`](crate::Reader::wait_for_ping)
    #[cfg_attr(feature = "serde", serde(with = "millis"))]
    pub handshake_timeout: Duration,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_PATH.to_string(),
            speed: DEFAULT_SPEED,
            poll_interval: DEFAULT_POLL_INTERVAL,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }
}

impl ReaderConfig {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn speed(mut self, speed: u32) -> Self {
        self.speed = speed;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Parse a JSON config document. Missing keys take their defaults;
    /// durations are given in milliseconds.
    #[cfg(feature = "json")]
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// Durations as integer milliseconds.
#[cfg(feature = "serde")]
mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = ReaderConfig::default();
        assert_eq!(c.speed, 115_200);
        assert_eq!(c.poll_interval, Duration::from_millis(100));
        assert_eq!(c.handshake_timeout, Duration::from_secs(1));
    }

    #[test]
    fn builder() {
        let c = ReaderConfig::new("/tmp/ttysKEG2")
            .speed(57_600)
            .poll_interval(Duration::from_millis(5));
        assert_eq!(c.path, "/tmp/ttysKEG2");
        assert_eq!(c.speed, 57_600);
        assert_eq!(c.poll_interval, Duration::from_millis(5));
        assert_eq!(c.handshake_timeout, DEFAULT_HANDSHAKE_TIMEOUT);
    }

    #[cfg(feature = "json")]
    #[test]
    fn from_json_partial() {
        let c = ReaderConfig::from_json(r#"{"path": "/dev/ttyACM0", "poll_interval": 20}"#).unwrap();
        assert_eq!(c.path, "/dev/ttyACM0");
        assert_eq!(c.speed, DEFAULT_SPEED);
        assert_eq!(c.poll_interval, Duration::from_millis(20));
    }
}
