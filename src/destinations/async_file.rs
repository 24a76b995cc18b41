//! Async file destination for non-blocking log file writing
//!
//! Uses tokio::fs for file I/O. Wrap it with [`BlockingDestination`] (or call
//! [`AsyncFileDestination::into_blocking`]) to attach it to a logger.

use crate::core::{
    AsyncDestination, BlockingDestination, LogEntry, LoggerError, OutputFormat, Result,
    TimestampFormat,
};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};

/// Async file destination
///
/// The file is opened synchronously so the destination can be built outside
/// a runtime; all writes go through tokio.
///
/// # Example
///
/// ```no_run
/// use correlated_logger::destinations::AsyncFileDestination;
/// use correlated_logger::prelude::*;
///
/// let file = AsyncFileDestination::open("logs/app.log").unwrap();
/// let logger = Logger::builder()
///     .destination(file.into_blocking().unwrap())
///     .build()
///     .unwrap();
/// logger.info("written through tokio");
/// logger.close();
/// ```
pub struct AsyncFileDestination {
    name: String,
    path: PathBuf,
    writer: BufWriter<File>,
    output_format: OutputFormat,
    timestamp_format: TimestampFormat,
}

impl AsyncFileDestination {
    /// Default buffer size (64 KB)
    pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_buffer_size(path, Self::DEFAULT_BUFFER_SIZE)
    }

    pub fn with_buffer_size(path: impl AsRef<Path>, buffer_size: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                LoggerError::io_operation("creating log directory", parent.display().to_string(), e)
            })?;
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                LoggerError::io_operation("opening log file", path.display().to_string(), e)
            })?;

        Ok(Self {
            name: "async_file".to_string(),
            path,
            writer: BufWriter::with_capacity(buffer_size, File::from_std(file)),
            output_format: OutputFormat::Json,
            timestamp_format: TimestampFormat::default(),
        })
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = match format {
            OutputFormat::JsonPretty => OutputFormat::Json,
            other => other,
        };
        self
    }

    #[must_use]
    pub fn with_timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Wrap in a runtime so the dispatcher can drive it
    pub fn into_blocking(self) -> Result<BlockingDestination<Self>> {
        BlockingDestination::new(self)
    }
}

#[async_trait]
impl AsyncDestination for AsyncFileDestination {
    async fn deliver(&mut self, batch: &[LogEntry]) -> Result<()> {
        let mut payload = String::with_capacity(batch.len() * 256);
        for entry in batch {
            payload.push_str(&self.output_format.format(entry, &self.timestamp_format));
            payload.push('\n');
        }
        self.writer
            .write_all(payload.as_bytes())
            .await
            .map_err(|e| LoggerError::write_error(&self.name, e.to_string()))
    }

    async fn flush(&mut self) -> Result<()> {
        self.writer
            .flush()
            .await
            .map_err(|e| LoggerError::flush_error(&self.name, e.to_string()))
    }

    async fn close(&mut self) -> Result<()> {
        self.flush().await?;
        self.writer
            .get_ref()
            .sync_all()
            .await
            .map_err(|e| LoggerError::close_error(&self.name, e.to_string()))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
