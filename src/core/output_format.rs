//! Output format configuration for log entries
//!
//! Provides different output formats for log entries:
//! - Text: Human-readable format (default)
//! - Json / JsonPretty: the serialized entry
//! - Logfmt: Key-value format compatible with log aggregation tools

use super::log_context::FieldValue;
use super::log_entry::LogEntry;
use super::timestamp::TimestampFormat;
use serde::{Deserialize, Serialize};

/// Output format for log entries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    ///
    /// Example: `[2025-01-08T10:30:45.123456Z] [INFO    ] billing - Request processed trace=9f0c.. span=1a2b..`
    #[default]
    Text,

    /// Single-line JSON
    Json,

    /// Indented JSON
    JsonPretty,

    /// Logfmt format (key=value pairs)
    ///
    /// Example: `timestamp=2025-01-08T10:30:45.123456Z level=INFO message="Request processed"`
    Logfmt,
}

impl OutputFormat {
    /// Format a log entry according to this output format
    pub fn format(&self, entry: &LogEntry, timestamp_format: &TimestampFormat) -> String {
        match self {
            OutputFormat::Text => self.format_text(entry, timestamp_format),
            OutputFormat::Json | OutputFormat::JsonPretty => {
                self.format_json(entry, timestamp_format)
            }
            OutputFormat::Logfmt => self.format_logfmt(entry, timestamp_format),
        }
    }

    /// Format as human-readable text
    fn format_text(&self, entry: &LogEntry, timestamp_format: &TimestampFormat) -> String {
        let mut line = format!(
            "[{}] [{:8}] {} - {}",
            timestamp_format.format(entry.timestamp()),
            entry.level().to_str(),
            entry.app_name(),
            entry.message()
        );

        for (key, value) in self.summary_fields(entry) {
            line.push(' ');
            line.push_str(&key);
            line.push('=');
            line.push_str(&value);
        }
        for (key, value) in entry.extra() {
            line.push_str(&format!(" {}={}", key, value));
        }
        line
    }

    /// Format as JSON, honoring the timestamp format
    fn format_json(&self, entry: &LogEntry, timestamp_format: &TimestampFormat) -> String {
        let mut value = match serde_json::to_value(entry) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize log entry");
                return String::new();
            }
        };
        if *timestamp_format != TimestampFormat::Iso8601Micros {
            if let Some(obj) = value.as_object_mut() {
                obj.insert(
                    "timestamp".to_string(),
                    timestamp_format.to_json_value(entry.timestamp()),
                );
            }
        }

        let rendered = if *self == OutputFormat::JsonPretty {
            serde_json::to_string_pretty(&value)
        } else {
            serde_json::to_string(&value)
        };
        rendered.unwrap_or_default()
    }

    /// Format as logfmt (key=value pairs)
    fn format_logfmt(&self, entry: &LogEntry, timestamp_format: &TimestampFormat) -> String {
        let mut parts = vec![
            format!(
                "timestamp={}",
                self.escape_logfmt_value(&timestamp_format.format(entry.timestamp()))
            ),
            format!("level={}", entry.level().to_str()),
            format!("app={}", self.escape_logfmt_value(entry.app_name())),
            format!("message={}", self.quote_logfmt_value(entry.message())),
            format!("method={}", self.escape_logfmt_value(entry.method())),
            format!("status={}", entry.status()),
        ];

        for (key, value) in self.summary_fields(entry) {
            parts.push(format!("{}={}", key, self.escape_logfmt_value(&value)));
        }

        for (key, value) in entry.extra() {
            let formatted_value = match value {
                FieldValue::String(s) => self.quote_logfmt_value(s),
                FieldValue::List(_) | FieldValue::Map(_) => {
                    self.quote_logfmt_value(&value.to_string())
                }
                other => other.to_string(),
            };
            parts.push(format!("{}={}", self.escape_logfmt_key(key), formatted_value));
        }

        parts.join(" ")
    }

    /// Correlation and context fields shared by text and logfmt output
    fn summary_fields(&self, entry: &LogEntry) -> Vec<(String, String)> {
        let mut fields = Vec::new();
        if let Some(correlation) = entry.correlation() {
            fields.push(("trace_id".to_string(), correlation.trace_id.clone()));
            fields.push(("span_id".to_string(), correlation.span_id.clone()));
            if let Some(ref parent) = correlation.parent_span_id {
                fields.push(("parent_span_id".to_string(), parent.clone()));
            }
        }
        if let Some(user) = entry.user() {
            fields.push(("user".to_string(), user.to_string()));
        }
        if let Some(action) = entry.action() {
            fields.push(("action".to_string(), action.to_string()));
        }
        if let Some(entity) = entry.entity() {
            let id = entity.id.as_deref().unwrap_or("-");
            fields.push(("entity".to_string(), format!("{}:{}", entity.entity_type, id)));
        }
        if let Some(duration) = entry.duration_ms() {
            fields.push(("duration_ms".to_string(), duration.to_string()));
        }
        if let Some(http) = entry.http_details() {
            if let Some(ref url) = http.url {
                fields.push(("url".to_string(), url.clone()));
            }
            if let Some(code) = http.status_code {
                fields.push(("status_code".to_string(), code.to_string()));
            }
        }
        fields
    }

    /// Escape a logfmt key (remove spaces and special chars)
    fn escape_logfmt_key(&self, key: &str) -> String {
        key.chars()
            .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
            .collect()
    }

    /// Escape a logfmt value (quote if contains spaces)
    fn escape_logfmt_value(&self, value: &str) -> String {
        if value.contains(' ') || value.contains('"') || value.contains('=') {
            self.quote_logfmt_value(value)
        } else {
            value.to_string()
        }
    }

    fn quote_logfmt_value(&self, value: &str) -> String {
        format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
    }
}
