//! Log entry structure

use super::correlation::CorrelationContext;
use super::log_context::{Entity, FieldValue, HttpDetails, LogContext, MultiTenant};
use super::log_level::LogLevel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Method recorded for entries that do not describe an HTTP call
pub const DEFAULT_METHOD: &str = "COMMENT";

/// Outcome recorded on an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Info,
    Success,
    Error,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Info => "info",
            Status::Success => "success",
            Status::Error => "error",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// ISO-8601 UTC with microsecond precision, e.g. `2025-01-08T10:30:45.123456Z`
mod iso_micros {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&ts.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        if let Ok(parsed) = DateTime::parse_from_rfc3339(&raw) {
            return Ok(parsed.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(&raw, FORMAT)
            .map(|naive| naive.and_utc())
            .map_err(serde::de::Error::custom)
    }
}

/// An immutable structured log record
///
/// Entries are built once by the logger and then shared read-only with every
/// destination. Optional fields are omitted from the serialized form; `extra`
/// is always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(with = "iso_micros")]
    timestamp: DateTime<Utc>,
    level: LogLevel,
    message: String,
    method: String,
    app_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    level_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    entity: Option<Entity>,
    #[serde(default)]
    status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    correlation: Option<CorrelationContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    multi_tenant: Option<MultiTenant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    http_details: Option<HttpDetails>,
    #[serde(default)]
    extra: BTreeMap<String, FieldValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    color: Option<String>,
}

impl LogEntry {
    /// Sanitize log message to prevent log injection attacks
    ///
    /// Replaces newlines, carriage returns, and tabs with escape sequences
    /// to prevent attackers from injecting fake log entries.
    fn sanitize_message(message: &str) -> String {
        message
            .replace('\n', "\\n")
            .replace('\r', "\\r")
            .replace('\t', "\\t")
    }

    /// Build an entry stamped with the current time
    ///
    /// `context.logger` overrides `app_name` when set.
    pub fn new(
        level: LogLevel,
        message: impl AsRef<str>,
        app_name: impl Into<String>,
        correlation: Option<CorrelationContext>,
        context: LogContext,
    ) -> Self {
        let LogContext {
            action,
            entity,
            user,
            duration_ms,
            http_details,
            multi_tenant,
            extra,
            color,
            logger,
            status,
            method,
            level_name,
        } = context;

        let http_details = http_details.map(|details| details.sanitized());
        let method = method
            .or_else(|| http_details.as_ref().and_then(|d| d.method.clone()))
            .unwrap_or_else(|| DEFAULT_METHOD.to_string());
        let user = user.or_else(|| multi_tenant.as_ref().and_then(|t| t.user_id.clone()));

        Self {
            timestamp: Utc::now(),
            level,
            message: Self::sanitize_message(message.as_ref()),
            method,
            app_name: logger.unwrap_or_else(|| app_name.into()),
            user,
            action,
            level_name,
            entity,
            status: status.unwrap_or_default(),
            duration_ms,
            correlation,
            multi_tenant: multi_tenant.filter(|t| !t.is_empty()),
            http_details,
            extra,
            color,
        }
    }

    /// Replace the timestamp (used for replay and deterministic tests)
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn timestamp(&self) -> &DateTime<Utc> {
        &self.timestamp
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn action(&self) -> Option<&str> {
        self.action.as_deref()
    }

    pub fn level_name(&self) -> Option<&str> {
        self.level_name.as_deref()
    }

    pub fn entity(&self) -> Option<&Entity> {
        self.entity.as_ref()
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn duration_ms(&self) -> Option<u64> {
        self.duration_ms
    }

    pub fn correlation(&self) -> Option<&CorrelationContext> {
        self.correlation.as_ref()
    }

    pub fn trace_id(&self) -> Option<&str> {
        self.correlation.as_ref().map(|c| c.trace_id.as_str())
    }

    pub fn span_id(&self) -> Option<&str> {
        self.correlation.as_ref().map(|c| c.span_id.as_str())
    }

    pub fn multi_tenant(&self) -> Option<&MultiTenant> {
        self.multi_tenant.as_ref()
    }

    pub fn http_details(&self) -> Option<&HttpDetails> {
        self.http_details.as_ref()
    }

    pub fn extra(&self) -> &BTreeMap<String, FieldValue> {
        &self.extra
    }

    pub fn color(&self) -> Option<&str> {
        self.color.as_deref()
    }

    /// Serialize as a single JSON line
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
