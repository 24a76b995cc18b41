//! Process-wide logger holder
//!
//! Libraries that cannot thread a `Logger` through their call graph fetch the
//! shared instance here. The first [`get_logger`] call builds a console
//! logger unless one was installed with [`set_global_logger`].

use super::error::Result;
use super::logger::Logger;
use parking_lot::RwLock;
use std::sync::Arc;

static GLOBAL: RwLock<Option<Arc<Logger>>> = parking_lot::const_rwlock(None);

/// Shared logger, building a default one named `app_name` on first use
///
/// `app_name` only matters for that first call; later calls return the
/// existing instance whatever name they pass.
pub fn get_logger(app_name: &str) -> Result<Arc<Logger>> {
    if let Some(logger) = GLOBAL.read().as_ref() {
        return Ok(Arc::clone(logger));
    }

    let mut slot = GLOBAL.write();
    if let Some(logger) = slot.as_ref() {
        return Ok(Arc::clone(logger));
    }
    let logger = Arc::new(default_logger(app_name)?);
    *slot = Some(Arc::clone(&logger));
    Ok(logger)
}

/// Install `logger` as the shared instance, returning the one it replaces
///
/// The replaced logger is not closed; holders of its `Arc` keep using it
/// until they drop it.
pub fn set_global_logger(logger: Logger) -> Option<Arc<Logger>> {
    GLOBAL.write().replace(Arc::new(logger))
}

/// The shared instance, if one exists
pub fn global_logger() -> Option<Arc<Logger>> {
    GLOBAL.read().clone()
}

#[cfg(feature = "console")]
fn default_logger(app_name: &str) -> Result<Logger> {
    Logger::builder()
        .app_name(app_name)
        .destination(crate::destinations::ConsoleDestination::new())
        .build()
}

#[cfg(not(feature = "console"))]
fn default_logger(app_name: &str) -> Result<Logger> {
    Logger::builder().app_name(app_name).build()
}
