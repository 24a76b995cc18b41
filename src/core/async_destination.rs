//! Async destination trait and its bridge to the dispatcher
//!
//! Destination workers are plain threads. [`BlockingDestination`] owns a
//! current-thread tokio runtime and drives an [`AsyncDestination`] to
//! completion on the worker thread.

use super::{destination::Destination, error::LoggerError, error::Result, log_entry::LogEntry};
use async_trait::async_trait;
use tokio::runtime::{Builder, Runtime};

/// Trait for asynchronous log destinations
///
/// # Example
///
/// ```no_run
/// use correlated_logger::{AsyncDestination, LogEntry, Result};
/// use async_trait::async_trait;
///
/// struct HttpSink;
///
/// #[async_trait]
/// impl AsyncDestination for HttpSink {
///     async fn deliver(&mut self, batch: &[LogEntry]) -> Result<()> {
///         // POST the batch
///         Ok(())
///     }
///
///     async fn flush(&mut self) -> Result<()> {
///         Ok(())
///     }
///
///     fn name(&self) -> &str {
///         "http"
///     }
/// }
/// ```
#[async_trait]
pub trait AsyncDestination: Send {
    /// Deliver one batch asynchronously
    async fn deliver(&mut self, batch: &[LogEntry]) -> Result<()>;

    /// Flush buffered entries asynchronously
    async fn flush(&mut self) -> Result<()>;

    async fn close(&mut self) -> Result<()> {
        self.flush().await
    }

    fn name(&self) -> &str;
}

/// Runs an [`AsyncDestination`] on its worker thread
pub struct BlockingDestination<D> {
    inner: D,
    runtime: Runtime,
}

impl<D: AsyncDestination> BlockingDestination<D> {
    pub fn new(inner: D) -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| {
                LoggerError::io_operation("building destination runtime", inner.name(), e)
            })?;
        Ok(Self { inner, runtime })
    }

    pub fn inner(&self) -> &D {
        &self.inner
    }
}

impl<D: AsyncDestination> Destination for BlockingDestination<D> {
    fn deliver(&mut self, batch: &[LogEntry]) -> Result<()> {
        self.runtime.block_on(self.inner.deliver(batch))
    }

    fn flush(&mut self) -> Result<()> {
        self.runtime.block_on(self.inner.flush())
    }

    fn close(&mut self) -> Result<()> {
        self.runtime.block_on(self.inner.close())
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
