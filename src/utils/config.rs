//! Application configuration stored as JSON

use crate::hardware::{ConnectionError, LinkConfig};
use crate::protocol::TransactionConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Invalid parameter value
    #[error("invalid {parameter} = {value}: {reason}")]
    InvalidParameter {
        parameter: String,
        value: String,
        reason: String,
    },

    /// Configuration file could not be read or written
    #[error("config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error
    #[error("config file {path} is not valid: {source}")]
    Serialization {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl From<ConnectionError> for ConfigError {
    fn from(err: ConnectionError) -> Self {
        match err {
            ConnectionError::InvalidConfig { parameter, value } => ConfigError::InvalidParameter {
                parameter: format!("link.{}", parameter),
                value,
                reason: "rejected by link settings".to_string(),
            },
            other => ConfigError::InvalidParameter {
                parameter: "link".to_string(),
                value: String::new(),
                reason: other.to_string(),
            },
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Serial link settings
    pub link: LinkConfig,
    /// Transaction timing
    pub transaction: TransactionConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.link.validate()?;
        self.transaction.validate()?;
        Ok(())
    }

    /// Load configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().display().to_string();

        let content = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path_str.clone(),
            source,
        })?;

        let config: AppConfig =
            serde_json::from_str(&content).map_err(|source| ConfigError::Serialization {
                path: path_str.clone(),
                source,
            })?;

        config.validate()?;
        debug!(path = %path_str, "configuration loaded");
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise use defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::load_from_file(path)
        } else {
            debug!(path = %path.as_ref().display(), "no configuration file, using defaults");
            Ok(Self::default())
        }
    }

    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path_str = path.as_ref().display().to_string();
        self.validate()?;

        let mut content =
            serde_json::to_string_pretty(self).map_err(|source| ConfigError::Serialization {
                path: path_str.clone(),
                source,
            })?;
        content.push('\n');

        if let Some(parent) = path.as_ref().parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: path_str.clone(),
                source,
            })?;
        }

        fs::write(&path, content).map_err(|source| ConfigError::Io {
            path: path_str,
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_returns_default() {
        let temp = tempfile::tempdir().unwrap();
        let config = AppConfig::load_or_default(temp.path().join("missing.json")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_save_then_load() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("nested").join("config.json");

        let mut config = AppConfig::default();
        config.link.port = "/dev/ttyACM1".to_string();
        config.transaction.drain_limit = Some(4);
        config.save_to_file(&path).unwrap();

        assert_eq!(AppConfig::load_from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("config.json");
        fs::write(&path, r#"{ "link": { "port": "COM4", "baud_rate": 115200 } }"#).unwrap();

        let config = AppConfig::load_from_file(&path).unwrap();
        assert_eq!(config.link.port, "COM4");
        assert_eq!(config.link.baud_rate, 115200);
        assert_eq!(config.transaction, TransactionConfig::default());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("config.json");
        fs::write(&path, r#"{ "link": { "baud_rate": 0 } }"#).unwrap();

        assert!(matches!(
            AppConfig::load_from_file(&path),
            Err(ConfigError::InvalidParameter { ref parameter, .. })
                if parameter == "link.baud_rate"
        ));

        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            AppConfig::load_from_file(&path),
            Err(ConfigError::Serialization { .. })
        ));
    }
}
