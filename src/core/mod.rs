//! Core logger types and traits

pub mod config;
pub mod correlation;
pub mod destination;
pub mod dispatcher;
pub mod error;
pub mod global;
pub mod instrument;
pub mod log_context;
pub mod log_entry;
pub mod log_level;
pub mod logger;
pub mod metrics;
pub mod output_format;
pub mod overflow_policy;
pub mod timestamp;

#[cfg(feature = "async-destinations")]
pub mod async_destination;

pub use config::{
    LoggerConfig, DEFAULT_APP_NAME, DEFAULT_BATCH_SIZE, DEFAULT_FLUSH_INTERVAL,
    DEFAULT_MAX_BUFFER_SIZE, DEFAULT_SHUTDOWN_TIMEOUT, MAX_DURATION,
};
pub use correlation::{
    ContextSnapshot, CorrelationContext, CorrelationManager, CurrentContext, RequestGuard,
    RequestOptions, SnapshotGuard, SpanGuard,
};
pub use destination::Destination;
pub use dispatcher::{DestinationFailure, Dispatcher, FlushReport};
pub use error::{HandlerPhase, LoggerError, Result};
pub use global::{get_logger, global_logger, set_global_logger};
pub use instrument::{
    CallArgs, CallLogger, CallOutcome, DefaultResultProcessor, EntityExtractor,
    HttpDetailsExtractor, MultiTenantExtractor, ParamEntityExtractor, ParamHttpDetailsExtractor,
    ParamMultiTenantExtractor, ResultProcessor,
};
pub use log_context::{Entity, FieldValue, HttpDetails, LogContext, MultiTenant};
pub use log_entry::{LogEntry, Status, DEFAULT_METHOD};
pub use log_level::LogLevel;
pub use logger::{Logger, LoggerBuilder};
pub use metrics::DispatchMetrics;
pub use output_format::OutputFormat;
pub use overflow_policy::{OverflowCallback, OverflowPolicy, RetryPolicy};
pub use timestamp::TimestampFormat;

#[cfg(feature = "async-destinations")]
pub use async_destination::{AsyncDestination, BlockingDestination};
