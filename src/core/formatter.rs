//! Pattern-based line formatter
//!
//! A pattern mixes literal text with `%` directives:
//!
//! | Directive | Expands to |
//! |-----------|------------|
//! | `%l` | level name (`INFO`) |
//! | `%n` | logger name |
//! | `%v` | message |
//! | `%%` | a literal `%` |
//! | anything else | a chrono strftime directive over local time |
//!
//! The default pattern `%Y-%m-%d %H:%M:%S [%l] %n: %v` renders
//! `2025-01-08 10:30:45 [INFO] svc: message`.

use super::error::{LoggerError, Result};
use super::log_level::LogLevel;
use super::log_record::LogRecord;
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local};
use std::borrow::Cow;
use std::fmt::Write as _;

/// Default line pattern
pub const DEFAULT_PATTERN: &str = "%Y-%m-%d %H:%M:%S [%l] %n: %v";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(String),
    Level,
    LoggerName,
    Message,
    Time(String),
}

#[derive(Debug, Clone)]
pub struct Formatter {
    pattern: String,
    tokens: Vec<Token>,
}

impl Formatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a formatter from a custom pattern
    ///
    /// # Errors
    ///
    /// Returns `InvalidFormatPattern` if the pattern ends in a bare `%` or
    /// contains a time directive chrono does not understand.
    pub fn with_pattern(pattern: impl Into<String>) -> Result<Self> {
        let pattern = pattern.into();
        let tokens = parse_pattern(&pattern)?;
        Ok(Self { pattern, tokens })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Render a line stamped with the current local time
    pub fn format(&self, logger_name: &str, level: LogLevel, message: &str) -> String {
        self.format_at(&Local::now(), logger_name, level, message)
    }

    /// Render a line using the record's own timestamp
    pub fn format_record(&self, record: &LogRecord) -> String {
        let local: DateTime<Local> = record.timestamp().into();
        self.format_at(&local, record.logger_name(), record.level(), record.message())
    }

    pub fn format_at(
        &self,
        timestamp: &DateTime<Local>,
        logger_name: &str,
        level: LogLevel,
        message: &str,
    ) -> String {
        let mut out = String::with_capacity(self.pattern.len() + logger_name.len() + message.len() + 16);
        for token in &self.tokens {
            match token {
                Token::Literal(text) => out.push_str(text),
                Token::Level => out.push_str(level.to_str()),
                Token::LoggerName => out.push_str(logger_name),
                Token::Message => out.push_str(&sanitize_message(message)),
                Token::Time(spec) => {
                    // Directives are validated at construction
                    let _ = write!(out, "{}", timestamp.format(spec));
                }
            }
        }
        out
    }
}

impl Default for Formatter {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_PATTERN.to_string(),
            tokens: parse_pattern(DEFAULT_PATTERN).unwrap_or_default(),
        }
    }
}

/// Escape line breaks and tabs so one record always renders as one line
///
/// Prevents forged entries via embedded newlines (log injection).
pub fn sanitize_message(message: &str) -> Cow<'_, str> {
    if !message.contains(['\n', '\r', '\t']) {
        return Cow::Borrowed(message);
    }
    Cow::Owned(
        message
            .replace('\n', "\\n")
            .replace('\r', "\\r")
            .replace('\t', "\\t"),
    )
}

fn parse_pattern(pattern: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut chars = pattern.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            literal.push(c);
            continue;
        }

        // Optional strftime modifiers (%-d, %.3f, %:z, %_H ...)
        let mut spec = String::from("%");
        while let Some(&m) = chars.peek() {
            if matches!(m, '-' | '_' | '0' | '.' | ':' | '#') || m.is_ascii_digit() {
                spec.push(m);
                chars.next();
            } else {
                break;
            }
        }

        let directive = chars
            .next()
            .ok_or_else(|| LoggerError::format_pattern(pattern, "dangling '%' at end of pattern"))?;

        let special = match (spec.len(), directive) {
            (1, '%') => {
                literal.push('%');
                continue;
            }
            (1, 'l') => Some(Token::Level),
            (1, 'n') => Some(Token::LoggerName),
            (1, 'v') => Some(Token::Message),
            _ => None,
        };

        if !literal.is_empty() {
            tokens.push(Token::Literal(std::mem::take(&mut literal)));
        }

        match special {
            Some(token) => tokens.push(token),
            None => {
                spec.push(directive);
                if StrftimeItems::new(&spec).any(|item| matches!(item, Item::Error)) {
                    return Err(LoggerError::format_pattern(
                        pattern,
                        format!("unsupported directive '{}'", spec),
                    ));
                }
                tokens.push(Token::Time(spec));
            }
        }
    }

    if !literal.is_empty() {
        tokens.push(Token::Literal(literal));
    }
    Ok(tokens)
}
