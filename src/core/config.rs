//! Logger configuration
//!
//! `LoggerConfig` is plain serde data so it can be loaded from any format the
//! caller prefers. Durations are written as seconds (`flush_interval`) or
//! milliseconds (everything else).

use super::error::{LoggerError, Result};
use super::log_level::LogLevel;
use super::overflow_policy::{OverflowPolicy, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_APP_NAME: &str = "app";
pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_BUFFER_SIZE: usize = 1000;
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Upper bound for every configured duration
pub const MAX_DURATION: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub app_name: String,
    pub level: LogLevel,
    /// Buffered entries that trigger an automatic flush
    pub batch_size: usize,
    /// Maximum time an entry waits in the buffer
    #[serde(with = "duration_secs")]
    pub flush_interval: Duration,
    /// Buffer capacity before the overflow policy applies
    pub max_buffer_size: usize,
    pub overflow_policy: OverflowPolicy,
    pub retry_policy: RetryPolicy,
    /// Bound on how long `flush` and `close` wait for each destination
    #[serde(rename = "shutdown_timeout_ms", with = "duration_ms")]
    pub shutdown_timeout: Duration,
    /// Give every entry its own span chained to the previous one
    pub chain_spans: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            app_name: DEFAULT_APP_NAME.to_string(),
            level: LogLevel::Info,
            batch_size: DEFAULT_BATCH_SIZE,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
            overflow_policy: OverflowPolicy::default(),
            retry_policy: RetryPolicy::none(),
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            chain_spans: false,
        }
    }
}

impl LoggerConfig {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            ..Self::default()
        }
    }

    /// Parse a JSON document, then validate it
    pub fn from_json(json: &str) -> Result<Self> {
        let config: LoggerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.app_name.trim().is_empty() {
            return Err(LoggerError::config("app_name", "must not be empty"));
        }
        if self.batch_size == 0 {
            return Err(LoggerError::config("batch_size", "must be greater than zero"));
        }
        if self.max_buffer_size == 0 {
            return Err(LoggerError::config(
                "max_buffer_size",
                "must be greater than zero",
            ));
        }
        if self.batch_size > self.max_buffer_size {
            return Err(LoggerError::config(
                "batch_size",
                format!(
                    "{} exceeds max_buffer_size {}",
                    self.batch_size, self.max_buffer_size
                ),
            ));
        }
        if self.flush_interval.is_zero() {
            return Err(LoggerError::config("flush_interval", "must be positive"));
        }
        if self.shutdown_timeout.is_zero() {
            return Err(LoggerError::config("shutdown_timeout", "must be positive"));
        }
        check_duration("flush_interval", self.flush_interval)?;
        check_duration("shutdown_timeout", self.shutdown_timeout)?;
        if let OverflowPolicy::BlockWithTimeout(timeout) = self.overflow_policy {
            check_duration("overflow_policy", timeout)?;
        }
        check_duration("retry_policy", self.retry_policy.max_backoff)?;
        if self.retry_policy.max_attempts == 0 {
            return Err(LoggerError::config(
                "retry_policy",
                "max_attempts must be at least 1",
            ));
        }
        if self.retry_policy.initial_backoff > self.retry_policy.max_backoff {
            return Err(LoggerError::config(
                "retry_policy",
                "initial_backoff exceeds max_backoff",
            ));
        }
        Ok(())
    }
}

fn check_duration(component: &str, value: Duration) -> Result<()> {
    if value > MAX_DURATION {
        return Err(LoggerError::config(
            component,
            format!("{:?} exceeds the maximum of {:?}", value, MAX_DURATION),
        ));
    }
    Ok(())
}

pub(crate) mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

pub(crate) mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
