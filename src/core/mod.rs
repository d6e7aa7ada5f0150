//! Core logger types and traits

pub mod async_logger;
pub mod config;
pub mod context;
pub(crate) mod diagnostics;
pub mod error;
pub mod filter;
pub mod formatter;
pub mod health;
pub mod log_level;
pub mod log_record;
pub mod logger;
pub mod metrics;
pub mod overflow_policy;
pub mod sink;

#[cfg(test)]
pub(crate) mod test_support;

pub use async_logger::{
    AsyncLogger, AsyncLoggerBuilder, DEFAULT_FLUSH_TIMEOUT, DEFAULT_SHUTDOWN_TIMEOUT,
};
pub use config::{Config, DEFAULT_QUEUE_CAPACITY};
pub use context::{ContextFields, ContextGuard, LogContext, LoggerContext};
pub use error::{LoggerError, Result};
pub use filter::{
    CompositeFilter, CompositeMode, FieldFilter, Filter, LambdaFilter, LevelFilter, RegexFilter,
};
pub use formatter::{sanitize_message, Formatter, DEFAULT_PATTERN};
pub use health::{
    handle_health_check_request, HealthCheckConfig, HealthCheckResult, HealthChecker,
    HealthRegistry, HealthStatus,
};
pub use log_level::LogLevel;
pub use log_record::LogRecord;
pub use logger::{Logger, LoggerBuilder};
pub use metrics::{LoggerMetrics, MetricsSnapshot};
pub use overflow_policy::{OverflowCallback, OverflowPolicy};
pub use sink::{Sink, SinkLevel};
