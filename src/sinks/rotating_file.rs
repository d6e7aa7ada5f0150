//! Size-rotated file sink
//!
//! ```text
//! app.log      active file
//! app.1.log    most recent history
//! app.N.log    oldest kept (N = max_files)
//! ```

use super::rotation::RotatingWriter;
use crate::core::{Formatter, LogLevel, Result, Sink, SinkLevel};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};

pub struct RotatingFileSink {
    inner: Mutex<RotatingWriter>,
    path: PathBuf,
    formatter: Formatter,
    level: SinkLevel,
}

impl RotatingFileSink {
    /// Open (or continue) `path`, rotating once it reaches `max_size` bytes
    /// and keeping at most `max_files` history files
    pub fn new(path: impl Into<PathBuf>, max_size: u64, max_files: usize) -> Result<Self> {
        let path = path.into();
        let inner = RotatingWriter::open(path.clone(), max_size, max_files, Vec::new())?;
        Ok(Self {
            inner: Mutex::new(inner),
            path,
            formatter: Formatter::default(),
            level: SinkLevel::default(),
        })
    }

    #[must_use]
    pub fn with_formatter(mut self, formatter: Formatter) -> Self {
        self.formatter = formatter;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes written to the active file since it was opened or rotated
    pub fn current_size(&self) -> u64 {
        self.inner.lock().current_size()
    }

    pub fn max_size(&self) -> u64 {
        self.inner.lock().max_size()
    }

    pub fn max_files(&self) -> usize {
        self.inner.lock().max_files()
    }

    pub fn rotation_count(&self) -> u64 {
        self.inner.lock().rotations()
    }

    /// Rotate now regardless of size
    pub fn rotate(&self) -> Result<()> {
        self.inner.lock().rotate()
    }
}

impl Sink for RotatingFileSink {
    fn log(&self, logger_name: &str, level: LogLevel, message: &str) -> Result<()> {
        if !self.should_log(level) {
            return Ok(());
        }
        let line = self.formatter.format(logger_name, level, message);
        self.inner.lock().write_line(&line)?;
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        self.inner.lock().flush()
    }

    fn level(&self) -> LogLevel {
        self.level.get()
    }

    fn set_level(&self, level: LogLevel) {
        self.level.set(level);
    }

    fn name(&self) -> &str {
        "rotating_file"
    }
}
