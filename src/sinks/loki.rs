//! Grafana Loki push sink
//!
//! Entries are buffered and pushed in batches:
//!
//! ```text
//! {"streams":[{"labels":"{app=\"api\"}","entries":[{"ts":"<nanos>","line":"..."}, ...]}]}
//! ```

use crate::core::{Formatter, LogLevel, Result, Sink, SinkLevel};
#[cfg(feature = "loki")]
use crate::core::LoggerError;
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};

pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Delivers one serialized batch to the push endpoint
pub trait LokiTransport: Send + Sync {
    fn send(&self, url: &str, payload: &str) -> Result<()>;
}

/// Blocking HTTP transport
#[cfg(feature = "loki")]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

#[cfg(feature = "loki")]
impl HttpTransport {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("rust_log_pipeline/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(5))
            .build()
            .map_err(|e| LoggerError::config("loki", format!("failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[cfg(feature = "loki")]
impl LokiTransport for HttpTransport {
    fn send(&self, url: &str, payload: &str) -> Result<()> {
        let response = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(payload.to_owned())
            .send()
            .map_err(|e| LoggerError::network(url, e.to_string()))?;

        if !response.status().is_success() {
            return Err(LoggerError::network(url, format!("push rejected: {}", response.status())));
        }
        Ok(())
    }
}

pub struct LokiSink {
    url: String,
    labels: String,
    transport: Box<dyn LokiTransport>,
    buffer: Mutex<Vec<Value>>,
    batch_size: usize,
    failed_batches: AtomicU64,
    formatter: Formatter,
    level: SinkLevel,
}

impl LokiSink {
    /// Push to `url` over HTTP, tagging the stream with `labels`
    /// (e.g. `{app="api"}`)
    #[cfg(feature = "loki")]
    pub fn new(url: impl Into<String>, labels: impl Into<String>) -> Result<Self> {
        Ok(Self::with_transport(url, labels, Box::new(HttpTransport::new()?)))
    }

    pub fn with_transport(
        url: impl Into<String>,
        labels: impl Into<String>,
        transport: Box<dyn LokiTransport>,
    ) -> Self {
        Self {
            url: url.into(),
            labels: labels.into(),
            transport,
            buffer: Mutex::new(Vec::with_capacity(DEFAULT_BATCH_SIZE)),
            batch_size: DEFAULT_BATCH_SIZE,
            failed_batches: AtomicU64::new(0),
            formatter: Formatter::default(),
            level: SinkLevel::default(),
        }
    }

    #[must_use]
    pub fn with_formatter(mut self, formatter: Formatter) -> Self {
        self.formatter = formatter;
        self
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn pending(&self) -> usize {
        self.buffer.lock().len()
    }

    /// Batches the transport refused; their entries are gone
    pub fn failed_batches(&self) -> u64 {
        self.failed_batches.load(Ordering::Relaxed)
    }

    fn payload(&self, entries: Vec<Value>) -> String {
        json!({
            "streams": [{
                "labels": self.labels,
                "entries": entries,
            }]
        })
        .to_string()
    }

    /// Send the buffered entries; the buffer is cleared even on failure
    fn send_batch(&self, buffer: &mut Vec<Value>) -> Result<()> {
        if buffer.is_empty() {
            return Ok(());
        }
        let payload = self.payload(std::mem::take(buffer));
        self.transport.send(&self.url, &payload).map_err(|e| {
            self.failed_batches.fetch_add(1, Ordering::Relaxed);
            e
        })
    }
}

impl Sink for LokiSink {
    fn log(&self, logger_name: &str, level: LogLevel, message: &str) -> Result<()> {
        if !self.should_log(level) {
            return Ok(());
        }
        let now = Utc::now();
        let ts = now.timestamp_nanos_opt().unwrap_or_default();
        let line = self.formatter.format(logger_name, level, message);

        let mut buffer = self.buffer.lock();
        buffer.push(json!({ "ts": ts.to_string(), "line": line }));
        if buffer.len() >= self.batch_size {
            self.send_batch(&mut buffer)?;
        }
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        let mut buffer = self.buffer.lock();
        self.send_batch(&mut buffer)
    }

    fn level(&self) -> LogLevel {
        self.level.get()
    }

    fn set_level(&self, level: LogLevel) {
        self.level.set(level);
    }

    fn name(&self) -> &str {
        "loki"
    }
}

impl Drop for LokiSink {
    fn drop(&mut self) {
        let _ = Sink::flush(self);
    }
}
