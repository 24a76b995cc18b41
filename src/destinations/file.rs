//! File destination implementation

use crate::core::{Destination, LogEntry, LoggerError, OutputFormat, Result, TimestampFormat};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Appends one line per entry to a file (JSON lines by default)
pub struct FileDestination {
    name: String,
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    output_format: OutputFormat,
    timestamp_format: TimestampFormat,
}

impl FileDestination {
    /// Open `path` for appending, creating parent directories as needed
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                LoggerError::io_operation(
                    "creating log directory",
                    parent.display().to_string(),
                    e,
                )
            })?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                LoggerError::io_operation("opening log file", path.display().to_string(), e)
            })?;

        Ok(Self {
            name: "file".to_string(),
            path,
            writer: Some(BufWriter::new(file)),
            output_format: OutputFormat::Json,
            timestamp_format: TimestampFormat::default(),
        })
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the output format; `JsonPretty` is written as single-line JSON
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use correlated_logger::destinations::FileDestination;
    /// use correlated_logger::OutputFormat;
    ///
    /// let file = FileDestination::new("/var/log/app.log")
    ///     .unwrap()
    ///     .with_output_format(OutputFormat::Logfmt);
    /// ```
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
}

impl Destination for FileDestination {
    fn deliver(&mut self, batch: &[LogEntry]) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| LoggerError::write_error(&self.name, "file already closed"))?;

        for entry in batch {
            let mut line = self.output_format.format(entry, &self.timestamp_format);
            line.push('\n');
            writer.write_all(line.as_bytes())?;
        }
        writer.flush()?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(ref mut writer) = self.writer {
            writer.flush()?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for FileDestination {
    fn drop(&mut self) {
        // Ensure all buffered data is flushed to disk
        let _ = self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{LogContext, LogLevel};
    use tempfile::TempDir;

    fn entry(message: &str) -> LogEntry {
        LogEntry::new(LogLevel::Info, message, "svc", None, LogContext::new())
    }

    #[test]
    fn test_writes_json_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/app.log");
        let mut file = FileDestination::new(&path).unwrap();

        file.deliver(&[entry("one"), entry("two\nthree")]).unwrap();
        file.close().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["message"], "two\\nthree");
    }

    #[test]
    fn test_appends_across_instances() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");

        FileDestination::new(&path)
            .unwrap()
            .deliver(&[entry("first")])
            .unwrap();
        FileDestination::new(&path)
            .unwrap()
            .with_output_format(OutputFormat::Text)
            .deliver(&[entry("second")])
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.lines().nth(1).unwrap().contains("svc - second"));
    }

    #[test]
    fn test_deliver_after_close_fails() {
        let dir = TempDir::new().unwrap();
        let mut file = FileDestination::new(dir.path().join("app.log")).unwrap();
        file.close().unwrap();
        let err = file.deliver(&[entry("late")]).unwrap_err();
        assert!(err.is_handler());
    }
}
