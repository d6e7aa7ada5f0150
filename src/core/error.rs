//! Error types for the logging pipeline

pub type Result<T> = std::result::Result<T, LoggerError>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// IO error with context
    #[error("IO error while {operation}: {message}")]
    IoOperation {
        operation: String,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid regular expression handed to a filter
    #[error("Invalid filter pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Invalid formatter pattern
    #[error("Invalid format pattern '{pattern}': {message}")]
    InvalidFormatPattern { pattern: String, message: String },

    /// Queue full with buffer details
    #[error("Log queue full: {current}/{max} messages buffered")]
    QueueFull { current: usize, max: usize },

    /// Logger already stopped
    #[error("Logger already stopped")]
    LoggerStopped,

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// Sink could not be used (e.g. its file never opened)
    #[error("Sink '{sink}' is unavailable")]
    SinkUnavailable { sink: String },

    /// File rotation error
    #[error("File rotation failed for '{path}': {message}")]
    FileRotation { path: String, message: String },

    /// Compression of a rotated file failed
    #[error("Compression failed for '{path}': {message}")]
    Compression { path: String, message: String },

    /// Network sink error
    #[error("Network error for '{address}': {message}")]
    Network { address: String, message: String },

    /// One or more children of a composite sink failed
    #[error("{failed} of {total} sinks failed")]
    SinkFailures { failed: usize, total: usize },

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl LoggerError {
    /// Create an IO operation error with context
    pub fn io_operation(
        operation: impl Into<String>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        LoggerError::IoOperation {
            operation: operation.into(),
            message: message.into(),
            source,
        }
    }

    /// Create a queue full error with buffer details
    pub fn queue_full(current: usize, max: usize) -> Self {
        LoggerError::QueueFull { current, max }
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create a format pattern error
    pub fn format_pattern(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidFormatPattern {
            pattern: pattern.into(),
            message: message.into(),
        }
    }

    pub fn sink_unavailable(sink: impl Into<String>) -> Self {
        LoggerError::SinkUnavailable { sink: sink.into() }
    }

    /// Create a file rotation error
    pub fn file_rotation(path: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::FileRotation {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a compression error
    pub fn compression(path: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::Compression {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a network error
    pub fn network(address: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::Network {
            address: address.into(),
            message: message.into(),
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        LoggerError::Other(msg.into())
    }

    /// Whether this error stems from bad configuration rather than runtime I/O
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            LoggerError::InvalidConfiguration { .. }
                | LoggerError::InvalidPattern(_)
                | LoggerError::InvalidFormatPattern { .. }
        )
    }

    /// A sink that failed to open or lost its connection; the cause was
    /// reported when it happened
    pub fn is_sink_unavailable(&self) -> bool {
        matches!(self, LoggerError::SinkUnavailable { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = LoggerError::queue_full(100, 1000);
        assert!(matches!(err, LoggerError::QueueFull { .. }));

        let err = LoggerError::config("NetworkSink", "host:port expected");
        assert!(matches!(err, LoggerError::InvalidConfiguration { .. }));
        assert!(err.is_configuration());

        let err = LoggerError::sink_unavailable("file");
        assert!(!err.is_configuration());
        assert!(err.is_sink_unavailable());
    }

    #[test]
    fn test_error_display() {
        let err = LoggerError::queue_full(100, 1000);
        assert_eq!(err.to_string(), "Log queue full: 100/1000 messages buffered");

        let err = LoggerError::file_rotation("/var/log/app.log", "Disk full");
        assert_eq!(
            err.to_string(),
            "File rotation failed for '/var/log/app.log': Disk full"
        );

        let err = LoggerError::compression("app.1.log", "empty output");
        assert_eq!(err.to_string(), "Compression failed for 'app.1.log': empty output");
    }

    #[test]
    fn test_regex_error_converts() {
        let err: LoggerError = regex::Regex::new("(unclosed").unwrap_err().into();
        assert!(matches!(err, LoggerError::InvalidPattern(_)));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_io_operation_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = LoggerError::io_operation("writing log file", "cannot write to file", io_err);

        assert!(matches!(err, LoggerError::IoOperation { .. }));
        assert!(err.to_string().contains("writing log file"));
        assert!(err.to_string().contains("cannot write to file"));
    }
}
