//! Destination implementations

pub mod memory;

#[cfg(feature = "console")]
pub mod console;
#[cfg(feature = "file")]
pub mod file;
#[cfg(feature = "network")]
pub mod network;

#[cfg(feature = "async-destinations")]
pub mod async_file;

pub use memory::MemoryDestination;

#[cfg(feature = "console")]
pub use console::ConsoleDestination;
#[cfg(feature = "file")]
pub use file::FileDestination;
#[cfg(feature = "network")]
pub use network::NetworkDestination;

#[cfg(feature = "async-destinations")]
pub use async_file::AsyncFileDestination;

pub use crate::core::Destination;
#[cfg(feature = "async-destinations")]
pub use crate::core::{AsyncDestination, BlockingDestination};
