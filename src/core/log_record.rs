//! Log record structure

use super::context::ContextFields;
use super::log_level::LogLevel;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A single log event
///
/// Built once per admitted log call and dropped after every sink has seen
/// it. There are no mutators: fields are fixed at construction.
#[derive(Debug, Clone, Serialize)]
pub struct LogRecord {
    logger_name: String,
    level: LogLevel,
    message: String,
    timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "ContextFields::is_empty")]
    fields: ContextFields,
}

impl LogRecord {
    pub fn new(logger_name: impl Into<String>, level: LogLevel, message: impl Into<String>) -> Self {
        Self::with_fields(logger_name, level, message, ContextFields::new())
    }

    pub fn with_fields(
        logger_name: impl Into<String>,
        level: LogLevel,
        message: impl Into<String>,
        fields: ContextFields,
    ) -> Self {
        Self {
            logger_name: logger_name.into(),
            level,
            message: message.into(),
            timestamp: Utc::now(),
            fields,
        }
    }

    #[inline]
    pub fn logger_name(&self) -> &str {
        &self.logger_name
    }

    #[inline]
    pub fn level(&self) -> LogLevel {
        self.level
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[inline]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn fields(&self) -> &ContextFields {
        &self.fields
    }

    /// Look up one of the record's own fields
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }
}
