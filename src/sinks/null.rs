//! Discarding sink

use crate::core::{LogLevel, Result, Sink, SinkLevel};

/// Accepts and discards everything; useful for benchmarks and for measuring
/// pipeline overhead without I/O
#[derive(Debug, Default)]
pub struct NullSink {
    level: SinkLevel,
}

impl NullSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Sink for NullSink {
    #[inline]
    fn log(&self, _logger_name: &str, _level: LogLevel, _message: &str) -> Result<()> {
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }

    fn level(&self) -> LogLevel {
        self.level.get()
    }

    fn set_level(&self, level: LogLevel) {
        self.level.set(level);
    }

    fn name(&self) -> &str {
        "null"
    }
}
