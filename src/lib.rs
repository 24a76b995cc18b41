//! # Correlated Logger
//!
//! Structured logging with distributed-trace correlation and buffered,
//! failure-isolated delivery to multiple destinations.
//!
//! ## Features
//!
//! - **Correlation**: every entry carries the trace/span of the request or
//!   span it was logged in, tracked per thread with stack discipline
//! - **Buffered fan-out**: entries are batched and flushed on size, interval,
//!   explicit flush and close; each destination runs on its own worker
//! - **Failure isolation**: a failing or panicking destination never affects
//!   the others or the caller; failures are reported per destination
//! - **Structured entries**: actions, entities, HTTP details, tenant info and
//!   free-form fields serialized as JSON
//!
//! ## Example
//!
//! ```
//! use correlated_logger::prelude::*;
//! use correlated_logger::destinations::MemoryDestination;
//!
//! let memory = MemoryDestination::new("memory");
//! let logger = Logger::builder()
//!     .app_name("checkout")
//!     .destination(memory.clone())
//!     .build()
//!     .unwrap();
//!
//! {
//!     let _request = logger.request_scope(None);
//!     logger.info("cart loaded");
//!     logger.info_with_context(
//!         "payment accepted",
//!         LogContext::new().action("pay").status(Status::Success),
//!     );
//! }
//!
//! let report = logger.close();
//! assert!(report.is_success());
//!
//! let entries = memory.entries();
//! assert_eq!(entries.len(), 2);
//! assert_eq!(entries[0].trace_id(), entries[1].trace_id());
//! ```

pub mod core;
pub mod destinations;
pub mod macros;

pub mod prelude {
    #[cfg(feature = "console")]
    pub use crate::destinations::ConsoleDestination;
    #[cfg(feature = "file")]
    pub use crate::destinations::FileDestination;
    pub use crate::core::{
        get_logger, CallArgs, CallLogger, ContextSnapshot, CorrelationContext, CorrelationManager,
        Destination, Entity, FieldValue, FlushReport, HttpDetails, LogContext, LogEntry, LogLevel,
        Logger, LoggerBuilder, LoggerConfig, LoggerError, MultiTenant, OutputFormat,
        OverflowCallback, OverflowPolicy, RequestOptions, Result, RetryPolicy, Status,
        TimestampFormat,
    };
}

pub use core::*;
