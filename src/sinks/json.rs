//! JSON Lines file sink
//!
//! Each record becomes one object per line, ready for ELK or Loki
//! ingestion:
//!
//! ```text
//! {"timestamp":"2024-05-01T12:00:00.123Z","logger":"api","level":"INFO","message":"started"}
//! ```

use crate::core::{LogLevel, LoggerError, Result, Sink, SinkLevel};
use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Serialize)]
struct JsonLine<'a> {
    timestamp: String,
    logger: &'a str,
    level: &'static str,
    message: &'a str,
}

pub struct JsonSink {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
    level: SinkLevel,
}

impl JsonSink {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                LoggerError::io_operation("opening json log", format!("cannot open '{}'", path.display()), e)
            })?;

        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
            level: SinkLevel::default(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Sink for JsonSink {
    fn log(&self, logger_name: &str, level: LogLevel, message: &str) -> Result<()> {
        if !self.should_log(level) {
            return Ok(());
        }
        let line = JsonLine {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            logger: logger_name,
            level: level.to_str(),
            message,
        };

        let mut writer = self.writer.lock();
        serde_json::to_writer(&mut *writer, &line)?;
        writer.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        self.writer.lock().flush()?;
        Ok(())
    }

    fn level(&self) -> LogLevel {
        self.level.get()
    }

    fn set_level(&self, level: LogLevel) {
        self.level.set(level);
    }

    fn name(&self) -> &str {
        "json"
    }
}

impl Drop for JsonSink {
    fn drop(&mut self) {
        let _ = self.writer.lock().flush();
    }
}
