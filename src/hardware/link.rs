//! Link interface trait and configuration

use crate::core::constants::{DEFAULT_BAUD_RATE, DEFAULT_PORT, OPEN_SETTLE_MS, READ_TIMEOUT_MS};
use crate::core::RawLine;
use crate::hardware::{ConnectionError, LinkResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Byte-stream connection to a line-oriented device
pub trait Link {
    /// Write raw bytes; no framing is added
    fn write(&mut self, data: &[u8]) -> LinkResult<()>;

    /// Number of received bytes not yet consumed (non-blocking)
    fn bytes_available(&mut self) -> LinkResult<usize>;

    /// Read one `\n`-terminated line, waiting at most `timeout`
    /// Returns Ok(None) if nothing arrived before the timeout
    fn read_line(&mut self, timeout: Duration) -> LinkResult<Option<RawLine>>;

    /// Discard received bytes that have not been read
    fn flush_input(&mut self) -> LinkResult<()>;

    /// Discard written bytes that have not been transmitted
    fn flush_output(&mut self) -> LinkResult<()>;

    /// Release the connection; calling it on a closed link does nothing
    fn close(&mut self);

    fn is_open(&self) -> bool;

    /// Identifier of the underlying port, used in diagnostics
    fn port_name(&self) -> &str;

    /// Block for `duration`; simulated links advance their own clock instead
    fn pause(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

impl<L: Link + ?Sized> Link for Box<L> {
    fn write(&mut self, data: &[u8]) -> LinkResult<()> {
        (**self).write(data)
    }

    fn bytes_available(&mut self) -> LinkResult<usize> {
        (**self).bytes_available()
    }

    fn read_line(&mut self, timeout: Duration) -> LinkResult<Option<RawLine>> {
        (**self).read_line(timeout)
    }

    fn flush_input(&mut self) -> LinkResult<()> {
        (**self).flush_input()
    }

    fn flush_output(&mut self) -> LinkResult<()> {
        (**self).flush_output()
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn port_name(&self) -> &str {
        (**self).port_name()
    }

    fn pause(&mut self, duration: Duration) {
        (**self).pause(duration)
    }
}

/// Serial link parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Device path, e.g. `/dev/ttyACM0` or `COM3`
    pub port: String,
    /// Line speed in baud
    pub baud_rate: u32,
    /// Timeout for a single blocking read (milliseconds)
    pub read_timeout_ms: u64,
    /// Wait after opening before the link is used (milliseconds)
    pub open_settle_ms: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout_ms: READ_TIMEOUT_MS,
            open_settle_ms: OPEN_SETTLE_MS,
        }
    }
}

impl LinkConfig {
    pub fn serial(port: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port: port.into(),
            baud_rate,
            ..Default::default()
        }
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn open_settle(&self) -> Duration {
        Duration::from_millis(self.open_settle_ms)
    }

    pub fn validate(&self) -> Result<(), ConnectionError> {
        if self.port.trim().is_empty() {
            return Err(ConnectionError::InvalidConfig {
                parameter: "port".to_string(),
                value: format!("{:?}", self.port),
            });
        }

        if self.baud_rate == 0 {
            return Err(ConnectionError::InvalidConfig {
                parameter: "baud_rate".to_string(),
                value: self.baud_rate.to_string(),
            });
        }

        if self.read_timeout_ms == 0 {
            return Err(ConnectionError::InvalidConfig {
                parameter: "read_timeout_ms".to_string(),
                value: self.read_timeout_ms.to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = LinkConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.open_settle(), Duration::from_secs(2));
    }

    #[test]
    fn test_invalid_config() {
        let mut config = LinkConfig::serial("/dev/ttyACM0", 115200);
        config.baud_rate = 0;
        assert!(matches!(
            config.validate(),
            Err(ConnectionError::InvalidConfig { ref parameter, .. }) if parameter == "baud_rate"
        ));

        let config = LinkConfig::serial("  ", 9600);
        assert!(config.validate().is_err());

        let mut config = LinkConfig::default();
        config.read_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: LinkConfig = serde_json::from_str(r#"{"port": "COM3"}"#).unwrap();
        assert_eq!(config.port, "COM3");
        assert_eq!(config.baud_rate, DEFAULT_BAUD_RATE);
        assert_eq!(config.read_timeout_ms, READ_TIMEOUT_MS);
    }
}
