//! Filter chain
//!
//! A filter is a predicate over a record and the ambient context captured
//! at the call site. Loggers AND their filters together and stop at the
//! first rejection.

use super::context::ContextFields;
use super::error::Result;
use super::log_level::LogLevel;
use super::log_record::LogRecord;
use regex::Regex;
use std::fmt;
use std::sync::Arc;

pub trait Filter: Send + Sync {
    /// `true` admits the record
    fn should_log(&self, record: &LogRecord, ambient: &ContextFields) -> bool;
}

/// Look a key up in the ambient context first, then in the record's fields
fn lookup<'a>(record: &'a LogRecord, ambient: &'a ContextFields, key: &str) -> Option<&'a str> {
    ambient
        .get(key)
        .map(String::as_str)
        .or_else(|| record.field(key))
}

/// Admits records at or above a minimum level
#[derive(Debug, Clone, Copy)]
pub struct LevelFilter {
    min_level: LogLevel,
}

impl LevelFilter {
    pub fn new(min_level: LogLevel) -> Self {
        Self { min_level }
    }
}

impl Filter for LevelFilter {
    fn should_log(&self, record: &LogRecord, _ambient: &ContextFields) -> bool {
        record.level() >= self.min_level
    }
}

/// Admits records whose field `key` equals `expected`
///
/// Records without the field are rejected.
#[derive(Debug, Clone)]
pub struct FieldFilter {
    key: String,
    expected: String,
}

impl FieldFilter {
    pub fn new(key: impl Into<String>, expected: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            expected: expected.into(),
        }
    }
}

impl Filter for FieldFilter {
    fn should_log(&self, record: &LogRecord, ambient: &ContextFields) -> bool {
        lookup(record, ambient, &self.key) == Some(self.expected.as_str())
    }
}

/// Regex match against the message or a named field
///
/// A missing field matches as the empty string. With `invert` set the
/// filter admits exactly the records the pattern does not match.
#[derive(Debug, Clone)]
pub struct RegexFilter {
    pattern: Regex,
    invert: bool,
    field: Option<String>,
}

impl RegexFilter {
    /// Match against the record's message
    pub fn new(pattern: &str, invert: bool) -> Result<Self> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            invert,
            field: None,
        })
    }

    /// Match against a context or record field
    pub fn for_field(field: impl Into<String>, pattern: &str, invert: bool) -> Result<Self> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            invert,
            field: Some(field.into()),
        })
    }
}

impl Filter for RegexFilter {
    fn should_log(&self, record: &LogRecord, ambient: &ContextFields) -> bool {
        let subject = match &self.field {
            Some(key) => lookup(record, ambient, key).unwrap_or(""),
            None => record.message(),
        };
        self.pattern.is_match(subject) != self.invert
    }
}

type Predicate = dyn Fn(&LogRecord, &ContextFields) -> bool + Send + Sync;

/// Arbitrary closure filter
pub struct LambdaFilter {
    predicate: Box<Predicate>,
}

impl LambdaFilter {
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&LogRecord, &ContextFields) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Box::new(predicate),
        }
    }
}

impl Filter for LambdaFilter {
    fn should_log(&self, record: &LogRecord, ambient: &ContextFields) -> bool {
        (self.predicate)(record, ambient)
    }
}

impl fmt::Debug for LambdaFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LambdaFilter").finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositeMode {
    /// Every child must admit
    And,
    /// At least one child must admit
    Or,
}

/// Combines child filters; an empty composite admits everything
pub struct CompositeFilter {
    mode: CompositeMode,
    filters: Vec<Arc<dyn Filter>>,
}

impl CompositeFilter {
    pub fn new(mode: CompositeMode) -> Self {
        Self {
            mode,
            filters: Vec::new(),
        }
    }

    pub fn add_filter(&mut self, filter: Arc<dyn Filter>) {
        self.filters.push(filter);
    }

    /// Builder form of [`add_filter`](Self::add_filter)
    #[must_use = "builder methods return a new value"]
    pub fn with(mut self, filter: Arc<dyn Filter>) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn mode(&self) -> CompositeMode {
        self.mode
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl Filter for CompositeFilter {
    fn should_log(&self, record: &LogRecord, ambient: &ContextFields) -> bool {
        if self.filters.is_empty() {
            return true;
        }
        match self.mode {
            CompositeMode::And => self.filters.iter().all(|f| f.should_log(record, ambient)),
            CompositeMode::Or => self.filters.iter().any(|f| f.should_log(record, ambient)),
        }
    }
}

impl fmt::Debug for CompositeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeFilter")
            .field("mode", &self.mode)
            .field("filters", &self.filters.len())
            .finish()
    }
}
