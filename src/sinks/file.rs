//! Append-mode file sink

use crate::core::{diagnostics, Formatter, LogLevel, LoggerError, Result, Sink, SinkLevel};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Appends formatted lines to a single file
///
/// [`FileSink::new`] never fails: if the file cannot be opened the problem
/// is reported on stderr and the sink stays unusable (`is_open()` is false,
/// every `log` returns `SinkUnavailable`, which the logger counts without
/// reporting again). Use [`FileSink::try_new`] to fail fast instead.
pub struct FileSink {
    path: PathBuf,
    writer: Mutex<Option<BufWriter<File>>>,
    formatter: Formatter,
    level: SinkLevel,
}

fn open(path: &Path) -> std::io::Result<BufWriter<File>> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    Ok(BufWriter::new(file))
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let writer = match open(&path) {
            Ok(writer) => Some(writer),
            Err(e) => {
                diagnostics::error(format_args!("Cannot open log file '{}': {}", path.display(), e));
                None
            }
        };
        Self {
            path,
            writer: Mutex::new(writer),
            formatter: Formatter::default(),
            level: SinkLevel::default(),
        }
    }

    pub fn try_new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let writer = open(&path).map_err(|e| {
            LoggerError::io_operation("opening log file", format!("cannot open '{}'", path.display()), e)
        })?;
        Ok(Self {
            path,
            writer: Mutex::new(Some(writer)),
            formatter: Formatter::default(),
            level: SinkLevel::default(),
        })
    }

    #[must_use]
    pub fn with_formatter(mut self, formatter: Formatter) -> Self {
        self.formatter = formatter;
        self
    }

    pub fn is_open(&self) -> bool {
        self.writer.lock().is_some()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Sink for FileSink {
    fn log(&self, logger_name: &str, level: LogLevel, message: &str) -> Result<()> {
        if !self.should_log(level) {
            return Ok(());
        }
        let line = self.formatter.format(logger_name, level, message);

        let mut guard = self.writer.lock();
        let writer = guard
            .as_mut()
            .ok_or_else(|| LoggerError::sink_unavailable(self.path.display().to_string()))?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        if let Some(writer) = self.writer.lock().as_mut() {
            writer.flush()?;
        }
        Ok(())
    }

    fn level(&self) -> LogLevel {
        self.level.get()
    }

    fn set_level(&self, level: LogLevel) {
        self.level.set(level);
    }

    fn name(&self) -> &str {
        "file"
    }
}

impl Drop for FileSink {
    fn drop(&mut self) {
        // Ensure all buffered data is flushed to disk
        let _ = Sink::flush(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_writes_formatted_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        let sink = FileSink::try_new(&path)
            .unwrap()
            .with_formatter(Formatter::with_pattern("%l %n %v").unwrap());

        sink.log("svc", LogLevel::Info, "one").unwrap();
        sink.log("svc", LogLevel::Error, "two").unwrap();
        sink.flush().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "INFO svc one\nERROR svc two\n");
    }

    #[test]
    fn test_appends_to_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        fs::write(&path, "existing\n").unwrap();

        let sink = FileSink::new(&path).with_formatter(Formatter::with_pattern("%v").unwrap());
        sink.log("svc", LogLevel::Info, "new").unwrap();
        sink.flush().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "existing\nnew\n");
    }

    #[test]
    fn test_unopenable_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing-dir").join("app.log");

        assert!(FileSink::try_new(&path).is_err());

        let sink = FileSink::new(&path);
        assert!(!sink.is_open());
        let err = sink.log("svc", LogLevel::Info, "lost").unwrap_err();
        assert!(matches!(err, LoggerError::SinkUnavailable { .. }));
    }
}
