//! Sinks shared by the unit tests

use super::error::{LoggerError, Result};
use super::log_level::LogLevel;
use super::sink::{Sink, SinkLevel};
use parking_lot::{Mutex, MutexGuard};

/// Records every line it receives
///
/// `hold()` blocks delivery until the returned guard drops, which lets
/// tests back up an async queue deterministically.
#[derive(Default)]
pub(crate) struct CaptureSink {
    lines: Mutex<Vec<(String, LogLevel, String)>>,
    gate: Mutex<()>,
    level: SinkLevel,
}

impl CaptureSink {
    pub(crate) fn messages(&self) -> Vec<String> {
        self.lines.lock().iter().map(|(_, _, m)| m.clone()).collect()
    }

    pub(crate) fn entries(&self) -> Vec<(String, LogLevel, String)> {
        self.lines.lock().clone()
    }

    pub(crate) fn hold(&self) -> MutexGuard<'_, ()> {
        self.gate.lock()
    }
}

impl Sink for CaptureSink {
    fn log(&self, logger_name: &str, level: LogLevel, message: &str) -> Result<()> {
        let _gate = self.gate.lock();
        if self.should_log(level) {
            self.lines
                .lock()
                .push((logger_name.to_string(), level, message.to_string()));
        }
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
        "capture"
    }
}

pub(crate) struct FailingSink;

impl Sink for FailingSink {
    fn log(&self, _: &str, _: LogLevel, _: &str) -> Result<()> {
        Err(LoggerError::sink_unavailable("failing"))
    }

    fn flush(&self) -> Result<()> {
        Err(LoggerError::sink_unavailable("failing"))
    }

    fn level(&self) -> LogLevel {
        LogLevel::Trace
    }

    fn set_level(&self, _: LogLevel) {}

    fn name(&self) -> &str {
        "failing"
    }
}

pub(crate) struct PanickingSink;

impl Sink for PanickingSink {
    fn log(&self, _: &str, _: LogLevel, _: &str) -> Result<()> {
        panic!("sink exploded");
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }

    fn level(&self) -> LogLevel {
        LogLevel::Trace
    }

    fn set_level(&self, _: LogLevel) {}

    fn name(&self) -> &str {
        "panicking"
    }
}
