//! In-memory destination
//!
//! Keeps every delivered entry in a shared vector. Clones share the same
//! storage, so a test can hand one clone to the logger and inspect another.

use crate::core::{Destination, LogEntry, Result};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Clone)]
pub struct MemoryDestination {
    name: String,
    entries: Arc<Mutex<Vec<LogEntry>>>,
    batches: Arc<AtomicUsize>,
    closed: Arc<AtomicBool>,
}

impl MemoryDestination {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Arc::new(Mutex::new(Vec::new())),
            batches: Arc::new(AtomicUsize::new(0)),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Copy of everything delivered so far, in delivery order
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.entries
            .lock()
            .iter()
            .map(|e| e.message().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Number of `deliver` calls received
    pub fn batches(&self) -> usize {
        self.batches.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
        self.batches.store(0, Ordering::SeqCst);
    }
}

impl Destination for MemoryDestination {
    fn deliver(&mut self, batch: &[LogEntry]) -> Result<()> {
        self.entries.lock().extend_from_slice(batch);
        self.batches.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
