//! Main logger implementation

use super::{
    config::Config,
    context::{ContextFields, LogContext, LoggerContext},
    diagnostics,
    error::Result,
    filter::Filter,
    log_level::LogLevel,
    log_record::LogRecord,
    metrics::LoggerMetrics,
    sink::{Sink, SinkLevel},
};
use crate::sinks::StdoutSink;
use parking_lot::Mutex;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

type RecordPredicate = dyn Fn(&LogRecord) -> bool + Send + Sync;

struct LoggerState {
    sinks: Vec<Arc<dyn Sink>>,
    filter_func: Option<Box<RecordPredicate>>,
    filters: Vec<Arc<dyn Filter>>,
}

impl LoggerState {
    fn has_filters(&self) -> bool {
        self.filter_func.is_some() || !self.filters.is_empty()
    }

    /// Single predicate first, then each filter in insertion order
    fn admits(&self, record: &LogRecord, ambient: &ContextFields) -> bool {
        if let Some(func) = &self.filter_func {
            if !func(record) {
                return false;
            }
        }
        self.filters.iter().all(|f| f.should_log(record, ambient))
    }
}

/// Synchronous logger: level gate, filter chain, then fan-out to sinks
///
/// Filter evaluation and fan-out happen under one lock, so records from
/// concurrent callers reach every sink in the same order. Sink failures are
/// counted in [`LoggerMetrics`] and never reach the caller.
///
/// # Example
///
/// ```
/// use rust_log_pipeline::prelude::*;
/// use std::sync::Arc;
///
/// let logger = Logger::builder("svc")
///     .min_level(LogLevel::Warn)
///     .sink(Arc::new(NullSink::new()))
///     .build();
///
/// logger.info("dropped by level");
/// logger.error("delivered");
/// assert_eq!(logger.metrics().total_logged(), 1);
/// ```
pub struct Logger {
    name: String,
    /// Outside the state lock so the level gate never waits on delivery
    min_level: SinkLevel,
    state: Mutex<LoggerState>,
    context: LoggerContext,
    metrics: Arc<LoggerMetrics>,
}

impl Logger {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            min_level: SinkLevel::new(LogLevel::Trace),
            state: Mutex::new(LoggerState {
                sinks: Vec::new(),
                filter_func: None,
                filters: Vec::new(),
            }),
            context: LoggerContext::new(),
            metrics: Arc::new(LoggerMetrics::new()),
        }
    }

    /// Logger writing to stdout with the configured level and pattern
    pub fn from_config(name: impl Into<String>, config: &Config) -> Result<Self> {
        config.validate()?;
        let logger = Self::new(name);
        logger.set_level(config.default_level);
        logger.add_sink(Arc::new(StdoutSink::with_formatter(config.formatter()?)));
        Ok(logger)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn level(&self) -> LogLevel {
        self.min_level.get()
    }

    pub fn set_level(&self, level: LogLevel) {
        self.min_level.set(level);
    }

    /// Whether a record at `level` passes the level gate
    #[inline]
    pub fn is_enabled(&self, level: LogLevel) -> bool {
        level != LogLevel::Off && level >= self.min_level.get()
    }

    pub fn add_sink(&self, sink: Arc<dyn Sink>) {
        self.state.lock().sinks.push(sink);
    }

    pub fn clear_sinks(&self) {
        self.state.lock().sinks.clear();
    }

    pub fn sink_count(&self) -> usize {
        self.state.lock().sinks.len()
    }

    pub fn add_filter(&self, filter: Arc<dyn Filter>) {
        self.state.lock().filters.push(filter);
    }

    /// Install the single predicate evaluated before the filter list
    pub fn set_filter_func<F>(&self, func: F)
    where
        F: Fn(&LogRecord) -> bool + Send + Sync + 'static,
    {
        self.state.lock().filter_func = Some(Box::new(func));
    }

    /// Remove the predicate and every filter
    pub fn clear_filters(&self) {
        let mut state = self.state.lock();
        state.filter_func = None;
        state.filters.clear();
    }

    /// Persistent fields merged into every record
    pub fn context(&self) -> &LoggerContext {
        &self.context
    }

    pub fn metrics(&self) -> &LoggerMetrics {
        &self.metrics
    }

    pub(crate) fn metrics_handle(&self) -> Arc<LoggerMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        self.dispatch(level, message.into(), ContextFields::new(), None);
    }

    /// Log with per-call fields; they take priority over the logger context
    pub fn log_with_fields(&self, level: LogLevel, message: impl Into<String>, fields: ContextFields) {
        self.dispatch(level, message.into(), fields, None);
    }

    /// Entry point for the async worker, which carries the producer's ambient snapshot
    pub(crate) fn log_with_ambient(&self, level: LogLevel, message: String, ambient: &ContextFields) {
        self.dispatch(level, message, ContextFields::new(), Some(ambient));
    }

    fn dispatch(
        &self,
        level: LogLevel,
        message: String,
        mut fields: ContextFields,
        ambient: Option<&ContextFields>,
    ) {
        if !self.is_enabled(level) {
            return;
        }

        let state = self.state.lock();

        self.context.merge_into(&mut fields);
        let record = LogRecord::with_fields(self.name.as_str(), level, message, fields);

        if state.has_filters() {
            let captured;
            let ambient = match ambient {
                Some(ambient) => ambient,
                None => {
                    captured = LogContext::get_all();
                    &captured
                }
            };
            if !state.admits(&record, ambient) {
                self.metrics.record_filtered();
                return;
            }
        }

        let start = Instant::now();
        for sink in &state.sinks {
            self.deliver(sink.as_ref(), &record);
        }
        self.metrics.record_latency(start.elapsed());
        self.metrics.record_logged();
    }

    /// Per-sink panic isolation: one failing sink never stops the others
    fn deliver(&self, sink: &dyn Sink, record: &LogRecord) {
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            sink.log(record.logger_name(), record.level(), record.message())
        }));

        match outcome {
            Ok(Ok(())) => {}
            // Already reported when the sink went unavailable; repeating it
            // per record would flood stderr
            Ok(Err(e)) if e.is_sink_unavailable() => {
                self.metrics.record_error();
            }
            Ok(Err(e)) => {
                self.metrics.record_error();
                diagnostics::error(format_args!(
                    "Sink '{}' failed for logger '{}': {}",
                    sink.name(),
                    self.name,
                    e
                ));
            }
            Err(payload) => {
                self.metrics.record_error();
                diagnostics::critical(format_args!(
                    "Sink '{}' panicked for logger '{}': {}. Other sinks continue to function.",
                    sink.name(),
                    self.name,
                    diagnostics::panic_message(payload.as_ref())
                ));
            }
        }
    }

    /// Flush every sink, returning the first failure
    pub fn flush(&self) -> Result<()> {
        let state = self.state.lock();
        let mut first_error = None;
        for sink in &state.sinks {
            if let Err(e) = sink.flush() {
                self.metrics.record_error();
                diagnostics::error(format_args!("Sink '{}' flush failed: {}", sink.name(), e));
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    #[inline]
    pub fn trace(&self, message: impl Into<String>) {
        self.log(LogLevel::Trace, message);
    }

    #[inline]
    pub fn debug(&self, message: impl Into<String>) {
        self.log(LogLevel::Debug, message);
    }

    #[inline]
    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    #[inline]
    pub fn warn(&self, message: impl Into<String>) {
        self.log(LogLevel::Warn, message);
    }

    #[inline]
    pub fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }

    #[inline]
    pub fn critical(&self, message: impl Into<String>) {
        self.log(LogLevel::Critical, message);
    }

    /// Create a builder for Logger
    #[must_use]
    pub fn builder(name: impl Into<String>) -> LoggerBuilder {
        LoggerBuilder::new(name)
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("min_level", &self.level())
            .field("sinks", &state.sinks.len())
            .field("filters", &state.filters.len())
            .finish()
    }
}

/// Builder for constructing Logger with a fluent API
///
/// # Example
/// ```
/// use rust_log_pipeline::prelude::*;
/// use std::sync::Arc;
///
/// let logger = Logger::builder("api")
///     .min_level(LogLevel::Debug)
///     .sink(Arc::new(StdoutSink::new()))
///     .filter(Arc::new(LevelFilter::new(LogLevel::Info)))
///     .context_field("service", "api")
///     .build();
/// assert_eq!(logger.level(), LogLevel::Debug);
/// ```
pub struct LoggerBuilder {
    name: String,
    min_level: LogLevel,
    sinks: Vec<Arc<dyn Sink>>,
    filters: Vec<Arc<dyn Filter>>,
    filter_func: Option<Box<RecordPredicate>>,
    context: Vec<(String, String)>,
}

impl LoggerBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            min_level: LogLevel::Trace,
            sinks: Vec::new(),
            filters: Vec::new(),
            filter_func: None,
            context: Vec::new(),
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn sink(mut self, sink: Arc<dyn Sink>) -> Self {
        self.sinks.push(sink);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn filter(mut self, filter: Arc<dyn Filter>) -> Self {
        self.filters.push(filter);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn filter_func<F>(mut self, func: F) -> Self
    where
        F: Fn(&LogRecord) -> bool + Send + Sync + 'static,
    {
        self.filter_func = Some(Box::new(func));
        self
    }

    /// Add a persistent context field
    #[must_use = "builder methods return a new value"]
    pub fn context_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.push((key.into(), value.into()));
        self
    }

    pub fn build(self) -> Logger {
        let logger = Logger::new(self.name);
        logger.set_level(self.min_level);
        {
            let mut state = logger.state.lock();
            state.sinks = self.sinks;
            state.filters = self.filters;
            state.filter_func = self.filter_func;
        }
        for (key, value) in self.context {
            logger.context.set(key, value);
        }
        logger
    }
}
