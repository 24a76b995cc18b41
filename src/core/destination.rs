//! Destination trait for log output sinks

use super::{error::Result, log_entry::LogEntry};

/// A sink that receives batches of entries
///
/// Each destination is owned by its own worker thread, so implementations
/// only need to be `Send`. Errors and panics are caught by the worker and
/// attributed to [`name`](Destination::name); they never reach the caller
/// of `Logger::flush`.
///
/// # Example
///
/// ```
/// use correlated_logger::{Destination, LogEntry, Result};
///
/// struct CountingDestination(usize);
///
/// impl Destination for CountingDestination {
///     fn deliver(&mut self, batch: &[LogEntry]) -> Result<()> {
///         self.0 += batch.len();
///         Ok(())
///     }
///
///     fn flush(&mut self) -> Result<()> {
///         Ok(())
///     }
///
///     fn name(&self) -> &str {
///         "counting"
///     }
/// }
/// ```
pub trait Destination: Send {
    /// Deliver one batch; the batch is delivered as a unit or the call fails
    fn deliver(&mut self, batch: &[LogEntry]) -> Result<()>;

    /// Push anything the destination buffers internally to its sink
    fn flush(&mut self) -> Result<()>;

    /// Release resources; called once when the logger closes
    fn close(&mut self) -> Result<()> {
        self.flush()
    }

    fn name(&self) -> &str;
}

impl<D: Destination + ?Sized> Destination for Box<D> {
    fn deliver(&mut self, batch: &[LogEntry]) -> Result<()> {
        (**self).deliver(batch)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
