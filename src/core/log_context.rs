//! Structured context attached to log entries
//!
//! This module provides:
//! - `FieldValue`: Value type for `extra` metadata and call parameters
//! - `Entity`, `HttpDetails`, `MultiTenant`: Business context payloads
//! - `LogContext`: The per-call context bag accepted by `Logger::log`

use super::log_entry::Status;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Headers removed from `HttpDetails` before they are attached to an entry
const SENSITIVE_HEADERS: [&str; 3] = ["authorization", "cookie", "x-domo-authentication"];

/// Bodies longer than this many characters are truncated
pub const MAX_BODY_CHARS: usize = 500;

/// Value type for structured logging fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<FieldValue>),
    Map(BTreeMap<String, FieldValue>),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::String(s) => write!(f, "{}", s),
            FieldValue::Int(i) => write!(f, "{}", i),
            FieldValue::Float(fl) => write!(f, "{}", fl),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Null => write!(f, "null"),
            FieldValue::List(_) | FieldValue::Map(_) => {
                write!(f, "{}", self.to_json_value())
            }
        }
    }
}

impl FieldValue {
    /// Convert to serde_json::Value for JSON serialization
    #[must_use]
    pub fn to_json_value(&self) -> serde_json::Value {
        match self {
            FieldValue::String(s) => serde_json::Value::String(s.clone()),
            FieldValue::Int(i) => serde_json::Value::Number((*i).into()),
            FieldValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            FieldValue::Bool(b) => serde_json::Value::Bool(*b),
            FieldValue::Null => serde_json::Value::Null,
            FieldValue::List(items) => {
                serde_json::Value::Array(items.iter().map(FieldValue::to_json_value).collect())
            }
            FieldValue::Map(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json_value()))
                    .collect(),
            ),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::String(s)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::String(s.to_string())
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Int(i)
    }
}

impl From<i32> for FieldValue {
    fn from(i: i32) -> Self {
        FieldValue::Int(i as i64)
    }
}

impl From<u32> for FieldValue {
    fn from(i: u32) -> Self {
        FieldValue::Int(i as i64)
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        FieldValue::Float(f)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl<V: Into<FieldValue>> From<Vec<V>> for FieldValue {
    fn from(items: Vec<V>) -> Self {
        FieldValue::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<BTreeMap<String, FieldValue>> for FieldValue {
    fn from(map: BTreeMap<String, FieldValue>) -> Self {
        FieldValue::Map(map)
    }
}

/// The entity an operation acted on (dataset, card, user, page, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(rename = "type")]
    pub entity_type: String,
    pub id: Option<String>,
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub additional_info: BTreeMap<String, FieldValue>,
}

impl Entity {
    pub fn new(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            id: None,
            name: None,
            additional_info: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_info<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        self.additional_info.insert(key.into(), value.into());
        self
    }
}

/// HTTP request/response details of an API call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HttpDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<BTreeMap<String, FieldValue>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body: Option<FieldValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_body: Option<FieldValue>,
}

impl HttpDetails {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: Some(method.into()),
            url: Some(url.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_status(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.params
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_response_size(mut self, bytes: u64) -> Self {
        self.response_size = Some(bytes);
        self
    }

    #[must_use]
    pub fn with_request_body(mut self, body: impl Into<FieldValue>) -> Self {
        self.request_body = Some(body.into());
        self
    }

    #[must_use]
    pub fn with_response_body(mut self, body: impl Into<FieldValue>) -> Self {
        self.response_body = Some(body.into());
        self
    }

    /// Copy with credentials stripped from headers and long bodies truncated
    #[must_use]
    pub fn sanitized(&self) -> Self {
        let headers = self.headers.as_ref().and_then(|headers| {
            let safe: BTreeMap<String, String> = headers
                .iter()
                .filter(|(name, _)| !SENSITIVE_HEADERS.contains(&name.to_lowercase().as_str()))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            (!safe.is_empty()).then_some(safe)
        });

        Self {
            headers,
            request_body: self.request_body.as_ref().map(truncate_body),
            response_body: self.response_body.as_ref().map(truncate_body),
            ..self.clone()
        }
    }
}

fn truncate_body(body: &FieldValue) -> FieldValue {
    match body {
        FieldValue::String(s) if s.chars().count() > MAX_BODY_CHARS => {
            let mut truncated: String = s.chars().take(MAX_BODY_CHARS).collect();
            truncated.push_str("...");
            FieldValue::String(truncated)
        }
        other => other.clone(),
    }
}

/// Tenant/organization context of the acting user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MultiTenant {
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub tenant_id: Option<String>,
    pub organization_id: Option<String>,
}

impl MultiTenant {
    pub fn is_empty(&self) -> bool {
        self.user_id.is_none()
            && self.session_id.is_none()
            && self.tenant_id.is_none()
            && self.organization_id.is_none()
    }
}

/// Context bag for a single `log` call
///
/// Every field is optional; unset fields fall back to the entry defaults
/// (`status = info`, `method = COMMENT`, logger app name).
///
/// # Example
///
/// ```
/// use correlated_logger::{Entity, LogContext, Status};
///
/// let ctx = LogContext::new()
///     .action("upload_data")
///     .entity(Entity::new("dataset").with_id("ds-42"))
///     .duration_ms(1250)
///     .status(Status::Success)
///     .with_field("rows", 10_000);
/// assert_eq!(ctx.extra().len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct LogContext {
    pub(crate) action: Option<String>,
    pub(crate) entity: Option<Entity>,
    pub(crate) user: Option<String>,
    pub(crate) duration_ms: Option<u64>,
    pub(crate) http_details: Option<HttpDetails>,
    pub(crate) multi_tenant: Option<MultiTenant>,
    pub(crate) extra: BTreeMap<String, FieldValue>,
    pub(crate) color: Option<String>,
    pub(crate) logger: Option<String>,
    pub(crate) status: Option<Status>,
    pub(crate) method: Option<String>,
    pub(crate) level_name: Option<String>,
}

impl LogContext {
    /// Create a new empty log context
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    #[must_use]
    pub fn entity(mut self, entity: Entity) -> Self {
        self.entity = Some(entity);
        self
    }

    #[must_use]
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    #[must_use]
    pub fn duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    #[must_use]
    pub fn http_details(mut self, details: HttpDetails) -> Self {
        self.http_details = Some(details);
        self
    }

    #[must_use]
    pub fn multi_tenant(mut self, tenant: MultiTenant) -> Self {
        self.multi_tenant = Some(tenant);
        self
    }

    /// Console color override (e.g. `"cyan"`)
    #[must_use]
    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// Override the app name recorded on the entry
    #[must_use]
    pub fn logger(mut self, name: impl Into<String>) -> Self {
        self.logger = Some(name.into());
        self
    }

    #[must_use]
    pub fn status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    #[must_use]
    pub fn level_name(mut self, name: impl Into<String>) -> Self {
        self.level_name = Some(name.into());
        self
    }

    /// Add a field to `extra`
    #[must_use]
    pub fn with_field<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Add a field to `extra` (mutable version)
    pub fn add_field<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        self.extra.insert(key.into(), value.into());
    }

    pub fn extra(&self) -> &BTreeMap<String, FieldValue> {
        &self.extra
    }
}
