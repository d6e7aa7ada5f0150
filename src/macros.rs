//! Logging macros with `format!`-style arguments
//!
//! Every macro works with anything exposing `log(LogLevel, impl Into<String>)`,
//! so both [`Logger`](crate::Logger) and [`AsyncLogger`](crate::AsyncLogger)
//! can be passed.
//!
//! # Examples
//!
//! ```
//! use rust_log_pipeline::prelude::*;
//! use rust_log_pipeline::info;
//!
//! let logger = Logger::new("server");
//!
//! info!(logger, "Server started");
//!
//! let port = 8080;
//! info!(logger, "Server listening on port {}", port);
//! ```

/// Log a message at an explicit level.
///
/// ```
/// # use rust_log_pipeline::prelude::*;
/// # let logger = Logger::new("app");
/// use rust_log_pipeline::log;
/// log!(logger, LogLevel::Info, "Simple message");
/// log!(logger, LogLevel::Error, "Error code: {}", 500);
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, $($arg:tt)+) => {
        $logger.log($level, format!($($arg)+))
    };
}

/// Log only when `condition` holds; arguments are not formatted otherwise.
///
/// ```
/// # use rust_log_pipeline::prelude::*;
/// # let logger = Logger::new("app");
/// use rust_log_pipeline::log_if;
/// let retries = 4;
/// log_if!(logger, LogLevel::Warn, retries > 3, "Retried {} times", retries);
/// ```
#[macro_export]
macro_rules! log_if {
    ($logger:expr, $level:expr, $condition:expr, $($arg:tt)+) => {
        if $condition {
            $crate::log!($logger, $level, $($arg)+)
        }
    };
}

#[macro_export]
macro_rules! trace {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Trace, $($arg)+)
    };
}

#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Debug, $($arg)+)
    };
}

/// Log an info-level message.
///
/// ```
/// # use rust_log_pipeline::prelude::*;
/// # let logger = Logger::new("app");
/// use rust_log_pipeline::info;
/// info!(logger, "Processing {} items", 100);
/// ```
#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Info, $($arg)+)
    };
}

#[macro_export]
macro_rules! warn {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Warn, $($arg)+)
    };
}

#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Error, $($arg)+)
    };
}

/// Log a critical-level message.
///
/// ```
/// # use rust_log_pipeline::prelude::*;
/// # let logger = Logger::new("app");
/// use rust_log_pipeline::critical;
/// critical!(logger, "Unable to recover from error: {}", "disk full");
/// ```
#[macro_export]
macro_rules! critical {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Critical, $($arg)+)
    };
}
