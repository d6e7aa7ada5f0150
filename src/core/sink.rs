//! Sink trait for log output destinations

use super::error::Result;
use super::log_level::LogLevel;
use std::sync::atomic::{AtomicU8, Ordering};

/// An output destination for formatted log lines
///
/// Sinks are shared as `Arc<dyn Sink>` (one sink may be attached to several
/// loggers or a [`MultiSink`](crate::sinks::MultiSink)), so every method
/// takes `&self` and implementations guard their own mutable state.
///
/// `log` must not call back into a logger: loggers invoke sinks while
/// holding their own lock.
pub trait Sink: Send + Sync {
    /// Format and write one record
    ///
    /// Records below the sink's own level are dropped and return `Ok(())`.
    fn log(&self, logger_name: &str, level: LogLevel, message: &str) -> Result<()>;

    fn flush(&self) -> Result<()>;

    /// Minimum level this sink accepts
    fn level(&self) -> LogLevel;

    fn set_level(&self, level: LogLevel);

    fn name(&self) -> &str;

    #[inline]
    fn should_log(&self, level: LogLevel) -> bool {
        level != LogLevel::Off && level >= self.level()
    }
}

/// Lock-free per-sink level threshold
#[derive(Debug)]
pub struct SinkLevel(AtomicU8);

impl SinkLevel {
    pub const fn new(level: LogLevel) -> Self {
        Self(AtomicU8::new(level as u8))
    }

    #[inline]
    pub fn get(&self) -> LogLevel {
        LogLevel::from_ordinal(self.0.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn set(&self, level: LogLevel) {
        self.0.store(level.ordinal(), Ordering::Relaxed);
    }
}

impl Default for SinkLevel {
    fn default() -> Self {
        Self::new(LogLevel::Trace)
    }
}
