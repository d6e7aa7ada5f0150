//! Logger configuration
//!
//! Read-only once a logger is built. Every field has a default, so a
//! partial JSON document such as `{"default_level": "Warn"}` is valid.

use super::error::{LoggerError, Result};
use super::formatter::{Formatter, DEFAULT_PATTERN};
use super::log_level::LogLevel;
use super::overflow_policy::OverflowPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default capacity of the async delivery queue
pub const DEFAULT_QUEUE_CAPACITY: usize = 8192;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub default_level: LogLevel,
    pub pattern: String,
    pub queue_capacity: usize,
    pub overflow_policy: OverflowPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_level: LogLevel::Trace,
            pattern: DEFAULT_PATTERN.to_string(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            overflow_policy: OverflowPolicy::default(),
        }
    }
}

impl Config {
    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            LoggerError::io_operation(
                "reading logger configuration",
                format!("cannot read '{}'", path.display()),
                e,
            )
        })?;
        Self::from_json_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            return Err(LoggerError::config(
                "queue_capacity",
                "must be greater than zero",
            ));
        }
        if let OverflowPolicy::BlockWithTimeout(timeout) = &self.overflow_policy {
            if timeout.is_zero() {
                return Err(LoggerError::config(
                    "overflow_policy",
                    "BlockWithTimeout requires a non-zero timeout",
                ));
            }
        }
        Formatter::with_pattern(self.pattern.as_str())?;
        Ok(())
    }

    /// Formatter for the configured pattern
    pub fn formatter(&self) -> Result<Formatter> {
        Formatter::with_pattern(self.pattern.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.default_level, LogLevel::Trace);
        assert_eq!(config.pattern, DEFAULT_PATTERN);
        assert_eq!(config.queue_capacity, DEFAULT_QUEUE_CAPACITY);
        assert_eq!(config.overflow_policy, OverflowPolicy::AlertAndDrop);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json() {
        let config = Config::from_json_str(r#"{"default_level": "Warn", "queue_capacity": 16}"#).unwrap();
        assert_eq!(config.default_level, LogLevel::Warn);
        assert_eq!(config.queue_capacity, 16);
        assert_eq!(config.pattern, DEFAULT_PATTERN);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(Config::from_json_str(r#"{"queue_capacity": 0}"#)
            .unwrap_err()
            .is_configuration());
        assert!(Config::from_json_str(r#"{"pattern": "%Q %v"}"#)
            .unwrap_err()
            .is_configuration());
        assert!(Config::from_json_str("{not json").is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"overflow_policy": "DropOldest"}}"#).unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.overflow_policy, OverflowPolicy::DropOldest);

        assert!(Config::from_file("/nonexistent/logger.json").is_err());
    }
}
