//! Console destination implementation

use crate::core::{Destination, LogEntry, LogLevel, OutputFormat, Result, TimestampFormat};
use colored::{Color, Colorize};
use std::io::Write;

pub struct ConsoleDestination {
    name: String,
    use_colors: bool,
    timestamp_format: TimestampFormat,
    output_format: OutputFormat,
}

impl ConsoleDestination {
    pub fn new() -> Self {
        Self {
            name: "console".to_string(),
            use_colors: true,
            timestamp_format: TimestampFormat::default(),
            output_format: OutputFormat::default(),
        }
    }

    pub fn with_colors(use_colors: bool) -> Self {
        Self {
            use_colors,
            ..Self::new()
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the output format for this destination
    ///
    /// # Example
    ///
    /// ```
    /// use correlated_logger::destinations::ConsoleDestination;
    /// use correlated_logger::OutputFormat;
    ///
    /// let console = ConsoleDestination::new()
    ///     .with_output_format(OutputFormat::Json);
    /// ```
    #[must_use]
    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    #[must_use]
    pub fn with_timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }

    /// Render one entry the way it is printed
    pub fn render(&self, entry: &LogEntry) -> String {
        match self.output_format {
            OutputFormat::Text if self.use_colors => self.format_colored(entry),
            format => format.format(entry, &self.timestamp_format),
        }
    }

    /// Text format with the level tag colored; an entry color overrides the level color
    fn format_colored(&self, entry: &LogEntry) -> String {
        let color = entry
            .color()
            .and_then(|name| name.parse::<Color>().ok())
            .unwrap_or_else(|| entry.level().color_code());
        let plain = OutputFormat::Text.format(entry, &self.timestamp_format);
        let tag = format!("[{:8}]", entry.level().to_str());
        plain.replacen(&tag, &tag.color(color).to_string(), 1)
    }
}

impl Default for ConsoleDestination {
    fn default() -> Self {
        Self::new()
    }
}

impl Destination for ConsoleDestination {
    fn deliver(&mut self, batch: &[LogEntry]) -> Result<()> {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = stdout.lock();
        let mut err = stderr.lock();

        for entry in batch {
            let line = self.render(entry);
            // Route Error and Critical levels to stderr, others to stdout
            match entry.level() {
                LogLevel::Error | LogLevel::Critical => writeln!(err, "{}", line)?,
                _ => writeln!(out, "{}", line)?,
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        std::io::stdout().flush()?;
        std::io::stderr().flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
