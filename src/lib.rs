//! # Rust Log Pipeline
//!
//! A multi-sink logging pipeline: application threads emit records, a filter
//! chain decides admissibility, and records fan out to pluggable sinks either
//! synchronously or through a background worker.
//!
//! ## Features
//!
//! - **Filter chains**: level, field, regex, closure and AND/OR composites
//! - **Async delivery**: bounded queue with configurable overflow policies
//! - **File sinks**: append, size rotation, rotation with gzip/zstd compression
//! - **Crash-time logging**: a lock-free, allocation-free signal-safe sink
//! - **Health reporting**: metrics snapshots graded against thresholds
//!
//! ## Example
//!
//! ```
//! use rust_log_pipeline::prelude::*;
//! use std::sync::Arc;
//!
//! let logger = Logger::builder("svc")
//!     .min_level(LogLevel::Warn)
//!     .sink(Arc::new(NullSink::new()))
//!     .build();
//!
//! logger.info("dropped: below Warn");
//! logger.error("delivered");
//! assert_eq!(logger.metrics().snapshot().messages_logged, 1);
//! ```

pub mod core;
pub mod macros;
pub mod sinks;

pub mod prelude {
    pub use crate::core::{
        AsyncLogger, CompositeFilter, CompositeMode, Config, ContextGuard, FieldFilter, Filter,
        Formatter, HealthChecker, HealthRegistry, HealthStatus, LambdaFilter, LevelFilter,
        LogContext, LogLevel, LogRecord, Logger, LoggerBuilder, LoggerError, OverflowPolicy,
        RegexFilter, Result, Sink,
    };
    pub use crate::sinks::{FileSink, MultiSink, NullSink, RotatingFileSink, StdoutSink};
}

pub use crate::core::{
    handle_health_check_request, AsyncLogger, AsyncLoggerBuilder, CompositeFilter, CompositeMode,
    Config, ContextFields, ContextGuard, FieldFilter, Filter, Formatter, HealthCheckConfig,
    HealthCheckResult, HealthChecker, HealthRegistry, HealthStatus, LambdaFilter, LevelFilter,
    LogContext, LogLevel, LogRecord, Logger, LoggerBuilder, LoggerContext, LoggerError,
    LoggerMetrics, MetricsSnapshot, OverflowCallback, OverflowPolicy, RegexFilter, Result, Sink,
    SinkLevel, DEFAULT_FLUSH_TIMEOUT, DEFAULT_PATTERN, DEFAULT_QUEUE_CAPACITY,
    DEFAULT_SHUTDOWN_TIMEOUT,
};
