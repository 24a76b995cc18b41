//! Main logger implementation

use super::{
    config::LoggerConfig,
    correlation::{
        ContextSnapshot, CorrelationContext, CorrelationManager, CurrentContext, RequestGuard,
        RequestOptions, SpanGuard,
    },
    destination::Destination,
    dispatcher::{Dispatcher, FlushReport},
    error::{LoggerError, Result},
    log_context::LogContext,
    log_entry::LogEntry,
    log_level::LogLevel,
    metrics::DispatchMetrics,
    overflow_policy::{OverflowCallback, OverflowPolicy, RetryPolicy},
};
use parking_lot::RwLock;
use std::time::Duration;

/// Structured logger with correlation tracking
///
/// Entries below the configured level are discarded before anything is
/// built. Accepted entries carry the calling thread's current correlation
/// and are buffered by the dispatcher until a flush trigger fires.
///
/// # Example
///
/// ```
/// use correlated_logger::prelude::*;
///
/// let logger = Logger::builder()
///     .app_name("billing")
///     .level(LogLevel::Debug)
///     .build()
///     .unwrap();
///
/// let _request = logger.request_scope(None);
/// logger.info("charging card");
/// logger.info_with_context(
///     "charge complete",
///     LogContext::new().status(Status::Success).duration_ms(42),
/// );
/// assert!(logger.flush());
/// ```
pub struct Logger {
    app_name: String,
    level: RwLock<LogLevel>,
    chain_spans: bool,
    correlation: CorrelationManager,
    dispatcher: Dispatcher,
}

impl Logger {
    /// Create a builder for Logger
    #[must_use]
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }

    /// Build a logger from a validated configuration
    pub fn from_config(
        config: LoggerConfig,
        destinations: Vec<Box<dyn Destination>>,
        on_overflow: Option<OverflowCallback>,
    ) -> Result<Self> {
        let dispatcher = Dispatcher::new(&config, destinations, on_overflow)?;
        tracing::debug!(
            app_name = %config.app_name,
            destinations = ?dispatcher.destination_names(),
            "logger started"
        );
        Ok(Self {
            app_name: config.app_name,
            level: RwLock::new(config.level),
            chain_spans: config.chain_spans,
            correlation: CorrelationManager::new(),
            dispatcher,
        })
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn level(&self) -> LogLevel {
        *self.level.read()
    }

    pub fn set_level(&self, level: LogLevel) {
        *self.level.write() = level;
    }

    #[inline]
    pub fn is_enabled(&self, level: LogLevel) -> bool {
        self.level().should_log(level)
    }

    /// Log an entry under the current thread's correlation
    ///
    /// Returns `true` when the entry was accepted or filtered out by level,
    /// `false` when the overflow policy rejected it or the logger is closed.
    pub fn log(&self, level: LogLevel, message: impl AsRef<str>, context: LogContext) -> bool {
        match self.try_log(level, message, context) {
            Ok(accepted) => accepted,
            Err(e) => {
                tracing::error!(error = %e, app_name = %self.app_name, "log entry discarded");
                false
            }
        }
    }

    /// Like [`log`](Self::log) but surfaces `LoggerStopped` after close
    pub fn try_log(
        &self,
        level: LogLevel,
        message: impl AsRef<str>,
        context: LogContext,
    ) -> Result<bool> {
        if !self.is_enabled(level) {
            return Ok(true);
        }
        let correlation = if self.chain_spans {
            self.correlation.next_span()
        } else {
            self.correlation.get_or_create_correlation()
        };
        self.submit(level, message.as_ref(), Some(correlation), context)
    }

    /// Log under an explicitly passed context instead of the thread's own
    pub fn log_in(
        &self,
        snapshot: &ContextSnapshot,
        level: LogLevel,
        message: impl AsRef<str>,
        context: LogContext,
    ) -> bool {
        if !self.is_enabled(level) {
            return true;
        }
        let correlation = match snapshot.correlation() {
            Some(current) if self.chain_spans => current.child(),
            Some(current) => current.clone(),
            None => self.correlation.get_or_create_correlation(),
        };

        match self.submit(level, message.as_ref(), Some(correlation), context) {
            Ok(accepted) => accepted,
            Err(e) => {
                tracing::error!(error = %e, app_name = %self.app_name, "log entry discarded");
                false
            }
        }
    }

    fn submit(
        &self,
        level: LogLevel,
        message: &str,
        correlation: Option<CorrelationContext>,
        context: LogContext,
    ) -> Result<bool> {
        if self.dispatcher.is_closed() {
            return Err(LoggerError::LoggerStopped);
        }
        let entry = LogEntry::new(level, message, self.app_name.as_str(), correlation, context);
        self.dispatcher.submit(entry)
    }

    #[inline]
    pub fn debug(&self, message: impl AsRef<str>) -> bool {
        self.log(LogLevel::Debug, message, LogContext::new())
    }

    #[inline]
    pub fn info(&self, message: impl AsRef<str>) -> bool {
        self.log(LogLevel::Info, message, LogContext::new())
    }

    #[inline]
    pub fn warning(&self, message: impl AsRef<str>) -> bool {
        self.log(LogLevel::Warning, message, LogContext::new())
    }

    #[inline]
    pub fn error(&self, message: impl AsRef<str>) -> bool {
        self.log(LogLevel::Error, message, LogContext::new())
    }

    #[inline]
    pub fn critical(&self, message: impl AsRef<str>) -> bool {
        self.log(LogLevel::Critical, message, LogContext::new())
    }

    pub fn debug_with_context(&self, message: impl AsRef<str>, context: LogContext) -> bool {
        self.log(LogLevel::Debug, message, context)
    }

    pub fn info_with_context(&self, message: impl AsRef<str>, context: LogContext) -> bool {
        self.log(LogLevel::Info, message, context)
    }

    pub fn warning_with_context(&self, message: impl AsRef<str>, context: LogContext) -> bool {
        self.log(LogLevel::Warning, message, context)
    }

    pub fn error_with_context(&self, message: impl AsRef<str>, context: LogContext) -> bool {
        self.log(LogLevel::Error, message, context)
    }

    pub fn critical_with_context(&self, message: impl AsRef<str>, context: LogContext) -> bool {
        self.log(LogLevel::Critical, message, context)
    }

    /// Deliver everything buffered; `true` only if every destination succeeded
    pub fn flush(&self) -> bool {
        self.dispatcher.flush()
    }

    pub fn flush_report(&self) -> FlushReport {
        self.dispatcher.flush_report()
    }

    /// Flush and close all destinations; later calls are no-ops
    pub fn close(&self) -> FlushReport {
        self.dispatcher.close()
    }

    pub fn is_closed(&self) -> bool {
        self.dispatcher.is_closed()
    }

    /// Start a request on the current thread and return its id
    pub fn start_request(&self, parent_trace_id: Option<&str>) -> String {
        self.correlation.start_request(parent_trace_id)
    }

    pub fn start_request_with(&self, options: RequestOptions) -> String {
        self.correlation.start_request_with(options)
    }

    pub fn end_request(&self) {
        self.correlation.end_request();
    }

    /// Start a request that ends when the guard drops
    pub fn request_scope(&self, parent_trace_id: Option<&str>) -> RequestGuard {
        let request_id = self.correlation.start_request(parent_trace_id);
        RequestGuard::new(self.correlation, request_id)
    }

    pub fn request_scope_with(&self, options: RequestOptions) -> RequestGuard {
        let request_id = self.correlation.start_request_with(options);
        RequestGuard::new(self.correlation, request_id)
    }

    /// Open a child span that closes when the guard drops
    pub fn span(&self) -> SpanGuard {
        SpanGuard::new(self.correlation)
    }

    pub fn start_new_trace(&self) -> String {
        self.correlation.start_new_trace()
    }

    pub fn current_context(&self) -> CurrentContext {
        self.correlation.get_current_context()
    }

    /// Capture the current context for use on another thread
    pub fn capture_context(&self) -> ContextSnapshot {
        self.correlation.capture()
    }

    pub fn correlation(&self) -> &CorrelationManager {
        &self.correlation
    }

    /// Get the dispatcher metrics
    ///
    /// # Example
    ///
    /// ```
    /// use correlated_logger::Logger;
    ///
    /// let logger = Logger::builder().build().unwrap();
    /// logger.info("hello");
    ///
    /// let metrics = logger.metrics();
    /// assert_eq!(metrics.total_submitted(), 1);
    /// assert_eq!(metrics.dropped_count(), 0);
    /// ```
    pub fn metrics(&self) -> &DispatchMetrics {
        self.dispatcher.metrics()
    }

    pub fn dropped_count(&self) -> u64 {
        self.dispatcher.metrics().dropped_count()
    }
}

/// Builder for constructing Logger with a fluent API
///
/// # Example
/// ```
/// use correlated_logger::prelude::*;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let logger = Logger::builder()
///     .app_name("ingest")
///     .level(LogLevel::Debug)
///     .batch_size(50)
///     .flush_interval(Duration::from_secs(5))
///     .overflow_policy(OverflowPolicy::DropNewest)
///     .on_overflow(Arc::new(|count| {
///         eprintln!("ALERT: {} logs dropped", count);
///     }))
///     .build()
///     .unwrap();
/// # logger.close();
/// ```
pub struct LoggerBuilder {
    config: LoggerConfig,
    destinations: Vec<Box<dyn Destination>>,
    on_overflow: Option<OverflowCallback>,
}

impl LoggerBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self {
            config: LoggerConfig::default(),
            destinations: Vec::new(),
            on_overflow: None,
        }
    }

    /// Replace every setting with `config`
    #[must_use = "builder methods return a new value"]
    pub fn config(mut self, config: LoggerConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn app_name(mut self, app_name: impl Into<String>) -> Self {
        self.config.app_name = app_name.into();
        self
    }

    /// Set minimum log level
    #[must_use = "builder methods return a new value"]
    pub fn level(mut self, level: LogLevel) -> Self {
        self.config.level = level;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.config.batch_size = batch_size;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn flush_interval(mut self, interval: Duration) -> Self {
        self.config.flush_interval = interval;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn max_buffer_size(mut self, max_buffer_size: usize) -> Self {
        self.config.max_buffer_size = max_buffer_size;
        self
    }

    /// Set the overflow policy for the buffer
    ///
    /// Default is `DropOldest`.
    #[must_use = "builder methods return a new value"]
    pub fn overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.config.overflow_policy = policy;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.config.retry_policy = policy;
        self
    }

    /// Bound on how long flush and close wait for destinations
    #[must_use = "builder methods return a new value"]
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.config.shutdown_timeout = timeout;
        self
    }

    /// Give every entry its own span chained to the previous entry's span
    #[must_use = "builder methods return a new value"]
    pub fn chain_spans(mut self, enabled: bool) -> Self {
        self.config.chain_spans = enabled;
        self
    }

    /// Add a destination
    #[must_use = "builder methods return a new value"]
    pub fn destination<D: Destination + 'static>(mut self, destination: D) -> Self {
        self.destinations.push(Box::new(destination));
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn boxed_destination(mut self, destination: Box<dyn Destination>) -> Self {
        self.destinations.push(destination);
        self
    }

    /// Set a callback for overflow notifications
    ///
    /// The parameter is the total count of dropped entries.
    #[must_use = "builder methods return a new value"]
    pub fn on_overflow(mut self, callback: OverflowCallback) -> Self {
        self.on_overflow = Some(callback);
        self
    }

    /// Build the Logger
    ///
    /// Fails with `InvalidConfiguration` when the settings are inconsistent.
    pub fn build(self) -> Result<Logger> {
        Logger::from_config(self.config, self.destinations, self.on_overflow)
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
