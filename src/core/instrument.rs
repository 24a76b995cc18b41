//! Call instrumentation
//!
//! [`CallLogger`] wraps a closure in its own span, logs when the call starts
//! and when it finishes, and records the elapsed time. What ends up in the
//! entries is decided by pluggable extractors that inspect the call's
//! arguments, given explicitly as [`CallArgs`].

use super::log_context::{Entity, FieldValue, HttpDetails, LogContext, MultiTenant};
use super::log_entry::Status;
use super::log_level::LogLevel;
use super::logger::Logger;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;

/// Replacement for sensitive argument values
pub const MASK: &str = "***";

/// Argument names that are always masked
pub const DEFAULT_SENSITIVE_PARAMS: &[&str] = &[
    "password",
    "token",
    "access_token",
    "secret",
    "api_key",
    "authorization",
];

/// Default color of call entries
pub const DEFAULT_CALL_COLOR: &str = "green";

/// Named arguments of an instrumented call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs {
    values: BTreeMap<String, FieldValue>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn arg(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }

    /// Argument rendered as a string, if present and not null
    pub fn get_string(&self, name: &str) -> Option<String> {
        match self.values.get(name)? {
            FieldValue::Null => None,
            FieldValue::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.values.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Copy of the arguments with every name in `sensitive` replaced by `***`
    pub fn masked(&self, sensitive: &[String]) -> BTreeMap<String, FieldValue> {
        self.values
            .iter()
            .map(|(name, value)| {
                let lowered = name.to_lowercase();
                let hidden = DEFAULT_SENSITIVE_PARAMS.contains(&lowered.as_str())
                    || sensitive.iter().any(|s| s.eq_ignore_ascii_case(name));
                let value = if hidden {
                    FieldValue::String(MASK.to_string())
                } else {
                    value.clone()
                };
                (name.clone(), value)
            })
            .collect()
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for CallArgs {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// How an instrumented call ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome<'a> {
    Success,
    Failure(&'a str),
}

pub trait EntityExtractor: Send + Sync {
    fn extract(&self, args: &CallArgs) -> Option<Entity>;
}

pub trait HttpDetailsExtractor: Send + Sync {
    fn extract(&self, args: &CallArgs) -> Option<HttpDetails>;
}

pub trait MultiTenantExtractor: Send + Sync {
    fn extract(&self, args: &CallArgs) -> Option<MultiTenant>;
}

/// Shapes the completion entry from the call outcome
pub trait ResultProcessor: Send + Sync {
    fn process(&self, outcome: CallOutcome<'_>, context: LogContext) -> LogContext;
}

/// Finds the entity from well-known id arguments, then from the `url` argument
#[derive(Debug, Clone, Copy, Default)]
pub struct ParamEntityExtractor;

impl ParamEntityExtractor {
    const ID_PARAMS: [&'static str; 6] = [
        "dataset_id",
        "user_id",
        "group_id",
        "card_id",
        "page_id",
        "dataflow_id",
    ];

    const URL_SEGMENTS: [(&'static str, &'static str); 4] = [
        ("/datasets/", "dataset"),
        ("/cards/", "card"),
        ("/users/", "user"),
        ("/pages/", "page"),
    ];

    fn from_url(url: &str) -> Option<Entity> {
        // First matching segment wins, even if no id follows it
        let (marker, entity_type) = Self::URL_SEGMENTS
            .iter()
            .find(|(marker, _)| url.contains(marker))?;
        let start = url.find(marker)? + marker.len();
        let id: String = url[start..]
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '-')
            .collect();
        (!id.is_empty()).then(|| Entity::new(*entity_type).with_id(id))
    }
}

impl EntityExtractor for ParamEntityExtractor {
    fn extract(&self, args: &CallArgs) -> Option<Entity> {
        for param in Self::ID_PARAMS {
            if let Some(id) = args.get_string(param) {
                let entity_type = param.trim_end_matches("_id");
                return Some(Entity::new(entity_type).with_id(id));
            }
        }
        args.get_string("url").and_then(|url| Self::from_url(&url))
    }
}

/// Builds HTTP details from `method`, `url` and `status_code` arguments
#[derive(Debug, Clone, Copy, Default)]
pub struct ParamHttpDetailsExtractor;

impl HttpDetailsExtractor for ParamHttpDetailsExtractor {
    fn extract(&self, args: &CallArgs) -> Option<HttpDetails> {
        let method = args.get_string("method");
        let url = args.get_string("url");
        if method.is_none() && url.is_none() {
            return None;
        }
        let status_code = args
            .get("status_code")
            .and_then(FieldValue::as_i64)
            .and_then(|code| u16::try_from(code).ok());

        Some(HttpDetails {
            method,
            url,
            status_code,
            ..HttpDetails::default()
        })
    }
}

/// Collects `user_id`, `session_id`, `tenant_id` and `organization_id`
#[derive(Debug, Clone, Copy, Default)]
pub struct ParamMultiTenantExtractor;

impl MultiTenantExtractor for ParamMultiTenantExtractor {
    fn extract(&self, args: &CallArgs) -> Option<MultiTenant> {
        let tenant = MultiTenant {
            user_id: args.get_string("user_id"),
            session_id: args.get_string("session_id"),
            tenant_id: args.get_string("tenant_id"),
            organization_id: args.get_string("organization_id"),
        };
        (!tenant.is_empty()).then_some(tenant)
    }
}

/// Marks the entry success or error; failures carry an `error` field
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultResultProcessor;

impl ResultProcessor for DefaultResultProcessor {
    fn process(&self, outcome: CallOutcome<'_>, context: LogContext) -> LogContext {
        match outcome {
            CallOutcome::Success => context.status(Status::Success),
            CallOutcome::Failure(error) => context.status(Status::Error).with_field("error", error),
        }
    }
}

/// Logs the start and completion of a call inside its own span
///
/// # Example
///
/// ```
/// use correlated_logger::prelude::*;
///
/// let logger = Logger::builder().app_name("api").build().unwrap();
/// let args = CallArgs::new()
///     .arg("dataset_id", "ds-42")
///     .arg("password", "hunter2");
///
/// let rows: std::result::Result<u32, String> = CallLogger::new(&logger, "upload_data")
///     .include_params(true)
///     .call(&args, || Ok(10_000));
/// assert_eq!(rows, Ok(10_000));
/// # logger.close();
/// ```
pub struct CallLogger<'a> {
    logger: &'a Logger,
    action: String,
    level: LogLevel,
    include_params: bool,
    sensitive_params: Vec<String>,
    color: Option<String>,
    entity_extractor: Box<dyn EntityExtractor>,
    http_extractor: Box<dyn HttpDetailsExtractor>,
    tenant_extractor: Box<dyn MultiTenantExtractor>,
    result_processor: Box<dyn ResultProcessor>,
}

impl<'a> CallLogger<'a> {
    pub fn new(logger: &'a Logger, action: impl Into<String>) -> Self {
        Self {
            logger,
            action: action.into(),
            level: LogLevel::Info,
            include_params: false,
            sensitive_params: Vec::new(),
            color: Some(DEFAULT_CALL_COLOR.to_string()),
            entity_extractor: Box::new(ParamEntityExtractor),
            http_extractor: Box::new(ParamHttpDetailsExtractor),
            tenant_extractor: Box::new(ParamMultiTenantExtractor),
            result_processor: Box::new(DefaultResultProcessor),
        }
    }

    /// Level of the start and success entries; failures are always `ERROR`
    #[must_use]
    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Attach the (masked) arguments to the start entry as `params`
    #[must_use]
    pub fn include_params(mut self, include: bool) -> Self {
        self.include_params = include;
        self
    }

    /// Additional argument names to mask
    #[must_use]
    pub fn sensitive_params<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sensitive_params.extend(names.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    #[must_use]
    pub fn without_color(mut self) -> Self {
        self.color = None;
        self
    }

    #[must_use]
    pub fn entity_extractor(mut self, extractor: impl EntityExtractor + 'static) -> Self {
        self.entity_extractor = Box::new(extractor);
        self
    }

    #[must_use]
    pub fn http_details_extractor(mut self, extractor: impl HttpDetailsExtractor + 'static) -> Self {
        self.http_extractor = Box::new(extractor);
        self
    }

    #[must_use]
    pub fn multi_tenant_extractor(mut self, extractor: impl MultiTenantExtractor + 'static) -> Self {
        self.tenant_extractor = Box::new(extractor);
        self
    }

    #[must_use]
    pub fn result_processor(mut self, processor: impl ResultProcessor + 'static) -> Self {
        self.result_processor = Box::new(processor);
        self
    }

    /// Run a fallible call
    ///
    /// The error is logged with its `Display` text and handed back unchanged.
    pub fn call<T, E, F>(&self, args: &CallArgs, f: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: fmt::Display,
    {
        let _span = self.logger.span();
        let base = self.base_context(args);

        let mut start = base.clone();
        if self.include_params && !args.is_empty() {
            start.add_field("params", FieldValue::Map(args.masked(&self.sensitive_params)));
        }
        self.logger
            .log(self.level, format!("{} started", self.action), start);

        let started_at = Instant::now();
        let result = f();
        let elapsed = started_at.elapsed().as_millis() as u64;

        let finished = base.duration_ms(elapsed);
        match &result {
            Ok(_) => {
                let context = self
                    .result_processor
                    .process(CallOutcome::Success, finished);
                self.logger
                    .log(self.level, format!("{} completed", self.action), context);
            }
            Err(e) => {
                let error = e.to_string();
                let context = self
                    .result_processor
                    .process(CallOutcome::Failure(&error), finished);
                self.logger.log(
                    LogLevel::Error,
                    format!("{} failed: {}", self.action, error),
                    context,
                );
            }
        }
        result
    }

    /// Run a call that cannot fail
    pub fn run<T, F>(&self, args: &CallArgs, f: F) -> T
    where
        F: FnOnce() -> T,
    {
        match self.call(args, || Ok::<T, std::convert::Infallible>(f())) {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    fn base_context(&self, args: &CallArgs) -> LogContext {
        let mut context = LogContext::new().action(self.action.clone());
        if let Some(color) = &self.color {
            context = context.color(color.clone());
        }
        if let Some(entity) = self.entity_extractor.extract(args) {
            context = context.entity(entity);
        }
        if let Some(details) = self.http_extractor.extract(args) {
            context = context.http_details(details);
        }
        if let Some(tenant) = self.tenant_extractor.extract(args) {
            context = context.multi_tenant(tenant);
        }
        context
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::destinations::MemoryDestination;
    use std::time::Duration;

    fn memory_logger() -> (Logger, MemoryDestination) {
        let memory = MemoryDestination::new("memory");
        let logger = Logger::builder()
            .app_name("svc")
            .level(LogLevel::Debug)
            .flush_interval(Duration::from_secs(60))
            .destination(memory.clone())
            .build()
            .unwrap();
        (logger, memory)
    }

    #[test]
    fn test_entity_from_id_params() {
        let args = CallArgs::new().arg("card_id", "c-9").arg("user_id", "u-1");
        // user_id is checked before card_id
        let entity = ParamEntityExtractor.extract(&args).unwrap();
        assert_eq!(entity.entity_type, "user");
        assert_eq!(entity.id.as_deref(), Some("u-1"));
    }

    #[test]
    fn test_entity_from_url() {
        let args = CallArgs::new().arg("url", "https://api.example.com/v1/datasets/ab-12/upload");
        let entity = ParamEntityExtractor.extract(&args).unwrap();
        assert_eq!(entity.entity_type, "dataset");
        assert_eq!(entity.id.as_deref(), Some("ab-12"));

        let args = CallArgs::new().arg("url", "https://api.example.com/v1/health");
        assert!(ParamEntityExtractor.extract(&args).is_none());
    }

    #[test]
    fn test_http_and_tenant_extractors() {
        let args: CallArgs = [
            ("method", FieldValue::from("POST")),
            ("url", FieldValue::from("/v1/cards/7")),
            ("status_code", FieldValue::from(201)),
            ("tenant_id", FieldValue::from("acme")),
        ]
        .into_iter()
        .collect();

        let details = ParamHttpDetailsExtractor.extract(&args).unwrap();
        assert_eq!(details.method.as_deref(), Some("POST"));
        assert_eq!(details.status_code, Some(201));

        let tenant = ParamMultiTenantExtractor.extract(&args).unwrap();
        assert_eq!(tenant.tenant_id.as_deref(), Some("acme"));
        assert!(tenant.user_id.is_none());

        assert!(ParamMultiTenantExtractor.extract(&CallArgs::new()).is_none());
        assert!(ParamHttpDetailsExtractor.extract(&CallArgs::new()).is_none());
    }

    #[test]
    fn test_masking() {
        let args = CallArgs::new()
            .arg("order_id", "o-1")
            .arg("card_number", "4111111111111111")
            .arg("Password", "hunter2");
        let masked = args.masked(&["card_number".to_string()]);

        assert_eq!(masked["order_id"], FieldValue::from("o-1"));
        assert_eq!(masked["card_number"], FieldValue::from(MASK));
        assert_eq!(masked["Password"], FieldValue::from(MASK));
    }

    #[test]
    fn test_successful_call_logs_start_and_completion() {
        let (logger, memory) = memory_logger();
        let args = CallArgs::new()
            .arg("dataset_id", "ds-1")
            .arg("cvv", "123");

        let value: Result<i32, String> = CallLogger::new(&logger, "process_payment")
            .include_params(true)
            .sensitive_params(["cvv"])
            .call(&args, || Ok(7));
        assert_eq!(value, Ok(7));
        logger.flush();

        let entries = memory.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].message(), "process_payment started");
        assert_eq!(entries[0].action(), Some("process_payment"));
        assert_eq!(entries[0].color(), Some(DEFAULT_CALL_COLOR));
        match &entries[0].extra()["params"] {
            FieldValue::Map(params) => assert_eq!(params["cvv"], FieldValue::from(MASK)),
            other => panic!("unexpected params: {:?}", other),
        }

        assert_eq!(entries[1].message(), "process_payment completed");
        assert_eq!(entries[1].status(), Status::Success);
        assert!(entries[1].duration_ms().is_some());
        assert!(!entries[1].extra().contains_key("params"));
        assert_eq!(entries[1].entity().unwrap().entity_type, "dataset");

        // Both entries share the call's span
        assert_eq!(entries[0].span_id(), entries[1].span_id());
    }

    #[test]
    fn test_failed_call_logs_error() {
        let (logger, memory) = memory_logger();
        let result: Result<(), String> = CallLogger::new(&logger, "sync")
            .level(LogLevel::Debug)
            .without_color()
            .call(&CallArgs::new(), || Err("upstream timeout".to_string()));
        assert!(result.is_err());
        logger.flush();

        let entries = memory.entries();
        assert_eq!(entries[0].level(), LogLevel::Debug);
        assert_eq!(entries[1].level(), LogLevel::Error);
        assert_eq!(entries[1].status(), Status::Error);
        assert_eq!(entries[1].message(), "sync failed: upstream timeout");
        assert_eq!(entries[1].extra()["error"], FieldValue::from("upstream timeout"));
        assert!(entries[1].color().is_none());
    }

    #[test]
    fn test_call_span_is_child_of_request() {
        let (logger, memory) = memory_logger();
        let _request = logger.request_scope(None);
        let outer = logger.current_context();

        CallLogger::new(&logger, "lookup").run(&CallArgs::new(), || ());
        logger.info("after");
        logger.flush();

        let entries = memory.entries();
        let call = entries[0].correlation().unwrap();
        assert_eq!(Some(call.trace_id.as_str()), outer.trace_id.as_deref());
        assert_eq!(call.parent_span_id.as_deref(), outer.span_id.as_deref());
        assert_eq!(entries[2].span_id(), outer.span_id.as_deref());
    }

    struct FixedEntity;

    impl EntityExtractor for FixedEntity {
        fn extract(&self, _args: &CallArgs) -> Option<Entity> {
            Some(Entity::new("report").with_name("weekly"))
        }
    }

    #[test]
    fn test_custom_extractor() {
        let (logger, memory) = memory_logger();
        CallLogger::new(&logger, "render")
            .entity_extractor(FixedEntity)
            .run(&CallArgs::new(), || 1);
        logger.flush();

        let entity = memory.entries()[0].entity().cloned().unwrap();
        assert_eq!(entity.entity_type, "report");
        assert_eq!(entity.name.as_deref(), Some("weekly"));
    }
}
