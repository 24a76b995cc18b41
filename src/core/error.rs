//! Error types for the logger system

use serde::Serialize;
use std::fmt;

pub type Result<T> = std::result::Result<T, LoggerError>;

/// Phase of a destination operation that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HandlerPhase {
    Write,
    Flush,
    Close,
}

impl fmt::Display for HandlerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerPhase::Write => write!(f, "write"),
            HandlerPhase::Flush => write!(f, "flush"),
            HandlerPhase::Close => write!(f, "close"),
        }
    }
}

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
    IoError(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// A destination failed during one of its phases
    #[error("Destination '{destination}' failed to {phase}: {message}")]
    Handler {
        destination: String,
        phase: HandlerPhase,
        message: String,
    },

    /// A destination did not answer within the delivery bound
    #[error("Destination '{destination}' did not respond within {timeout_ms}ms")]
    DeliveryTimeout { destination: String, timeout_ms: u64 },

    /// Buffer full with details
    #[error("Log buffer full: {current}/{max} entries buffered")]
    QueueFull { current: usize, max: usize },

    /// Logger already closed
    #[error("Logger already stopped")]
    LoggerStopped,

    /// Channel send error
    #[error("Failed to send batch to destination worker '{0}'")]
    ChannelSendError(String),

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

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create a destination error for an arbitrary phase
    pub fn handler(
        destination: impl Into<String>,
        phase: HandlerPhase,
        message: impl Into<String>,
    ) -> Self {
        LoggerError::Handler {
            destination: destination.into(),
            phase,
            message: message.into(),
        }
    }

    /// Create a write error (batch delivery failed)
    pub fn write_error(destination: impl Into<String>, message: impl Into<String>) -> Self {
        Self::handler(destination, HandlerPhase::Write, message)
    }

    /// Create a flush error
    pub fn flush_error(destination: impl Into<String>, message: impl Into<String>) -> Self {
        Self::handler(destination, HandlerPhase::Flush, message)
    }

    /// Create a close error
    pub fn close_error(destination: impl Into<String>, message: impl Into<String>) -> Self {
        Self::handler(destination, HandlerPhase::Close, message)
    }

    pub fn delivery_timeout(destination: impl Into<String>, timeout: std::time::Duration) -> Self {
        LoggerError::DeliveryTimeout {
            destination: destination.into(),
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Create a queue full error with buffer details
    pub fn queue_full(current: usize, max: usize) -> Self {
        LoggerError::QueueFull { current, max }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        LoggerError::Other(msg.into())
    }

    /// Whether this error was raised while validating configuration
    pub fn is_config(&self) -> bool {
        matches!(self, LoggerError::InvalidConfiguration { .. })
    }

    /// Whether this error is attributed to a single destination
    pub fn is_handler(&self) -> bool {
        matches!(
            self,
            LoggerError::Handler { .. } | LoggerError::DeliveryTimeout { .. }
        )
    }

    /// The failing phase, if this is a destination error
    pub fn phase(&self) -> Option<HandlerPhase> {
        match self {
            LoggerError::Handler { phase, .. } => Some(*phase),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_error_creation() {
        let err = LoggerError::queue_full(100, 1000);
        assert!(matches!(err, LoggerError::QueueFull { .. }));

        let err = LoggerError::config("batch_size", "must be greater than zero");
        assert!(err.is_config());
        assert!(!err.is_handler());

        let err = LoggerError::write_error("datadog", "HTTP 503");
        assert!(err.is_handler());
        assert_eq!(err.phase(), Some(HandlerPhase::Write));

        let err = LoggerError::flush_error("file", "disk full");
        assert_eq!(err.phase(), Some(HandlerPhase::Flush));
    }

    #[test]
    fn test_error_display() {
        let err = LoggerError::queue_full(100, 1000);
        assert_eq!(err.to_string(), "Log buffer full: 100/1000 entries buffered");

        let err = LoggerError::write_error("cloud", "connection refused");
        assert_eq!(
            err.to_string(),
            "Destination 'cloud' failed to write: connection refused"
        );

        let err = LoggerError::delivery_timeout("slow", Duration::from_millis(250));
        assert_eq!(
            err.to_string(),
            "Destination 'slow' did not respond within 250ms"
        );

        let err = LoggerError::config("flush_interval", "must be positive");
        assert_eq!(
            err.to_string(),
            "Invalid configuration for flush_interval: must be positive"
        );
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
