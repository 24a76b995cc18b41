//! Logging macros for ergonomic log message formatting.
//!
//! These macros provide a convenient interface for logging with automatic
//! string formatting, similar to `println!` and `format!`. A structured
//! context can be attached with a leading `context = ...;`.
//!
//! # Examples
//!
//! ```
//! use correlated_logger::prelude::*;
//! use correlated_logger::info;
//!
//! let logger = Logger::builder().app_name("api").build().unwrap();
//!
//! // Basic logging
//! info!(logger, "Server started");
//!
//! // With format arguments
//! let port = 8080;
//! info!(logger, "Server listening on port {}", port);
//!
//! // With a structured context
//! let ctx = LogContext::new().action("login").user("u-42");
//! info!(logger, context = ctx; "User {} logged in", "u-42");
//! # logger.close();
//! ```

/// Log a message with automatic formatting.
///
/// Evaluates to the `bool` returned by [`Logger::log`](crate::Logger::log).
///
/// # Examples
///
/// ```
/// # use correlated_logger::prelude::*;
/// # let logger = Logger::builder().build().unwrap();
/// use correlated_logger::log;
/// log!(logger, LogLevel::Info, "Simple message");
/// log!(logger, LogLevel::Error, "Error code: {}", 500);
/// log!(logger, LogLevel::Warning, context = LogContext::new().action("retry"); "Attempt {}", 3);
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, context = $ctx:expr; $($arg:tt)+) => {
        $logger.log($level, format!($($arg)+), $ctx)
    };
    ($logger:expr, $level:expr, $($arg:tt)+) => {
        $logger.log($level, format!($($arg)+), $crate::LogContext::new())
    };
}

/// Log a debug-level message.
///
/// # Examples
///
/// ```
/// # use correlated_logger::prelude::*;
/// # let logger = Logger::builder().level(LogLevel::Debug).build().unwrap();
/// use correlated_logger::debug;
/// debug!(logger, "Debug information");
/// debug!(logger, "Counter value: {}", 10);
/// ```
#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Debug, $($arg)+)
    };
}

/// Log an info-level message.
#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Info, $($arg)+)
    };
}

/// Log a warning-level message.
///
/// # Examples
///
/// ```
/// # use correlated_logger::prelude::*;
/// # let logger = Logger::builder().build().unwrap();
/// use correlated_logger::warning;
/// warning!(logger, "Deprecated API usage");
/// warning!(logger, "Memory usage: {}%", 85);
/// ```
#[macro_export]
macro_rules! warning {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Warning, $($arg)+)
    };
}

/// Log an error-level message.
#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Error, $($arg)+)
    };
}

/// Log a critical-level message.
///
/// # Examples
///
/// ```
/// # use correlated_logger::prelude::*;
/// # let logger = Logger::builder().build().unwrap();
/// use correlated_logger::critical;
/// critical!(logger, "System shutdown initiated");
/// critical!(logger, "Fatal error: {}", "out of memory");
/// ```
#[macro_export]
macro_rules! critical {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Critical, $($arg)+)
    };
}
