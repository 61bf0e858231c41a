//! Link and connection error types

use std::string::FromUtf8Error;

/// Failure of a raw operation on an open (or supposedly open) link
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// Operation attempted after the link was closed
    #[error("link to {port} is not open")]
    NotOpen { port: String },

    /// Read or write failure reported by the operating system
    #[error("I/O error during {operation}")]
    Io {
        operation: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// Port-level control failure (buffer clear, queue query)
    #[error("serial port error during {operation}")]
    Port {
        operation: &'static str,
        #[source]
        source: serialport::Error,
    },

    /// Device sent bytes that are not valid UTF-8
    #[error("received line is not valid UTF-8")]
    Decode {
        #[source]
        source: FromUtf8Error,
    },
}

/// Result type for link operations
pub type LinkResult<T> = Result<T, LinkError>;

/// Failure to establish a link; fatal to the calling operation
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// Port missing, busy, or permission denied
    #[error("failed to open serial port {port}")]
    Open {
        port: String,
        #[source]
        source: serialport::Error,
    },

    /// Link settings rejected before any open was attempted
    #[error("invalid link configuration: {parameter} = {value}")]
    InvalidConfig { parameter: String, value: String },
}

impl ConnectionError {
    /// Connection failures are never retried automatically; the caller decides
    pub fn is_recoverable(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = LinkError::NotOpen { port: "/dev/ttyACM0".to_string() };
        assert_eq!(err.to_string(), "link to /dev/ttyACM0 is not open");

        let err = ConnectionError::InvalidConfig {
            parameter: "baud_rate".to_string(),
            value: "0".to_string(),
        };
        assert_eq!(err.to_string(), "invalid link configuration: baud_rate = 0");
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_decode_error_keeps_source() {
        let bad = String::from_utf8(vec![0xff, 0xfe]).unwrap_err();
        let err = LinkError::Decode { source: bad };
        assert!(std::error::Error::source(&err).is_some());
    }
}
