//! Correlation tracking for distributed tracing
//!
//! Every execution unit owns a private stack of frames: the thread, or with
//! the `async-context` feature an async task entered through
//! [`CorrelationManager::scope`]. A frame is
//! pushed by `start_request` or `start_span` and popped by `end_request` or
//! `end_span`, so nested and sequential requests restore the enclosing
//! context instead of clearing it.
//!
//! Code that hops threads can carry its context explicitly with
//! [`CorrelationManager::capture`] and [`ContextSnapshot::enter`].

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
#[cfg(feature = "async-context")]
use std::future::Future;
use std::marker::PhantomData;
use uuid::Uuid;

thread_local! {
    static STACK: RefCell<Vec<Frame>> = const { RefCell::new(Vec::new()) };
}

#[cfg(feature = "async-context")]
tokio::task_local! {
    static TASK_STACK: RefCell<Vec<Frame>>;
}

/// Run `f` on the current task's stack, or the thread's outside a task scope
fn with_stack<R>(f: impl FnOnce(&RefCell<Vec<Frame>>) -> R) -> R {
    #[cfg(feature = "async-context")]
    {
        if TASK_STACK.try_with(|_| ()).is_ok() {
            return TASK_STACK.with(f);
        }
    }
    STACK.with(f)
}

/// Trace/span identifiers recorded on a log entry
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationContext {
    pub trace_id: String,
    pub span_id: String,
    pub parent_span_id: Option<String>,
}

impl CorrelationContext {
    /// Create a root correlation (no parent span)
    pub fn new(trace_id: String, span_id: String) -> Self {
        Self {
            trace_id,
            span_id,
            parent_span_id: None,
        }
    }

    /// Set parent span ID
    #[must_use]
    pub fn with_parent(mut self, parent_span_id: String) -> Self {
        self.parent_span_id = Some(parent_span_id);
        self
    }

    /// Derive a child span in the same trace
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            trace_id: self.trace_id.clone(),
            span_id: CorrelationManager::generate_span_id(),
            parent_span_id: Some(self.span_id.clone()),
        }
    }
}

/// Read-only view of the current execution unit's context
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CurrentContext {
    pub trace_id: Option<String>,
    pub request_id: Option<String>,
    pub session_id: Option<String>,
    pub span_id: Option<String>,
    pub correlation: Option<CorrelationContext>,
}

/// Options for [`CorrelationManager::start_request_with`]
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Continue a trace started by an upstream service
    pub parent_trace_id: Option<String>,
    /// Attach to the same parent as sibling page fetches instead of chaining
    pub pagination: bool,
    /// Session to associate with the request; inherited or generated if unset
    pub session_id: Option<String>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn parent_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.parent_trace_id = Some(trace_id.into());
        self
    }

    #[must_use]
    pub fn pagination(mut self, pagination: bool) -> Self {
        self.pagination = pagination;
        self
    }

    #[must_use]
    pub fn session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
    /// Created lazily when logging outside any request
    Root,
    Request,
    Pagination,
    Span,
}

#[derive(Debug, Clone)]
struct Frame {
    kind: FrameKind,
    correlation: CorrelationContext,
    request_id: Option<String>,
    session_id: String,
    /// Span that pagination requests opened under this frame attach to
    anchor_span_id: String,
}

impl Frame {
    fn root(trace_id: String) -> Self {
        let span_id = CorrelationManager::generate_span_id();
        Self {
            kind: FrameKind::Root,
            correlation: CorrelationContext::new(trace_id, span_id.clone()),
            request_id: None,
            session_id: CorrelationManager::generate_session_id(),
            anchor_span_id: span_id,
        }
    }

    fn is_request(&self) -> bool {
        matches!(self.kind, FrameKind::Request | FrameKind::Pagination)
    }
}

/// Generates identifiers and manages the per-thread context stack
///
/// The manager itself is stateless; all state lives in thread-local (or
/// task-local) storage, so every handle observes the same stack for the
/// calling execution unit.
///
/// # Example
///
/// ```
/// use correlated_logger::CorrelationManager;
///
/// let manager = CorrelationManager::new();
/// let request_id = manager.start_request(None);
/// let outer = manager.get_or_create_correlation();
///
/// let inner = manager.start_span();
/// assert_eq!(inner.trace_id, outer.trace_id);
/// assert_eq!(inner.parent_span_id.as_deref(), Some(outer.span_id.as_str()));
/// manager.end_span();
///
/// assert_eq!(manager.get_current_context().request_id, Some(request_id));
/// manager.end_request();
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct CorrelationManager;

impl CorrelationManager {
    pub const fn new() -> Self {
        CorrelationManager
    }

    /// 128-bit trace id rendered as a hyphenated UUID
    pub fn generate_trace_id() -> String {
        Uuid::new_v4().hyphenated().to_string()
    }

    /// 64-bit span id as 16 hex characters
    pub fn generate_span_id() -> String {
        Self::random_hex(16)
    }

    /// 48-bit request id as 12 hex characters
    pub fn generate_request_id() -> String {
        Self::random_hex(12)
    }

    /// 48-bit session id as 12 hex characters
    pub fn generate_session_id() -> String {
        Self::random_hex(12)
    }

    fn random_hex(len: usize) -> String {
        let mut hex = Uuid::new_v4().simple().to_string();
        hex.truncate(len);
        hex
    }

    /// Start a request with default options
    ///
    /// Returns the newly generated request id.
    pub fn start_request(&self, parent_trace_id: Option<&str>) -> String {
        let mut options = RequestOptions::new();
        options.parent_trace_id = parent_trace_id.map(str::to_string);
        self.start_request_with(options)
    }

    /// Push a new request frame onto the current thread's stack
    ///
    /// Without `parent_trace_id` a request nested in another request or span
    /// continues its trace as a child span; at top level it starts a new trace.
    /// With `parent_trace_id` the request becomes a new root span of that trace.
    pub fn start_request_with(&self, options: RequestOptions) -> String {
        with_stack(|stack| {
            let mut stack = stack.borrow_mut();
            let enclosing = stack.iter().rev().find(|f| f.kind != FrameKind::Root);

            let (trace_id, parent_span_id) = match (&options.parent_trace_id, enclosing) {
                (Some(parent_trace), _) => (parent_trace.clone(), None),
                (None, Some(frame)) => {
                    let parent = if options.pagination {
                        frame.anchor_span_id.clone()
                    } else {
                        frame.correlation.span_id.clone()
                    };
                    (frame.correlation.trace_id.clone(), Some(parent))
                }
                (None, None) => (Self::generate_trace_id(), None),
            };

            let session_id = options
                .session_id
                .or_else(|| enclosing.map(|f| f.session_id.clone()))
                .unwrap_or_else(Self::generate_session_id);

            let span_id = Self::generate_span_id();
            let anchor_span_id = match (&parent_span_id, options.pagination) {
                (Some(parent), true) => parent.clone(),
                _ => span_id.clone(),
            };
            let request_id = Self::generate_request_id();

            stack.push(Frame {
                kind: if options.pagination {
                    FrameKind::Pagination
                } else {
                    FrameKind::Request
                },
                correlation: CorrelationContext {
                    trace_id,
                    span_id,
                    parent_span_id,
                },
                request_id: Some(request_id.clone()),
                session_id,
                anchor_span_id,
            });

            request_id
        })
    }

    /// Pop the innermost request (and any spans left open inside it)
    ///
    /// Calling this without a matching `start_request` is a no-op.
    pub fn end_request(&self) {
        with_stack(|stack| {
            let mut stack = stack.borrow_mut();
            if let Some(idx) = stack.iter().rposition(Frame::is_request) {
                stack.truncate(idx);
            }
        });
    }

    /// Open a child span of the current context and make it current
    pub fn start_span(&self) -> CorrelationContext {
        with_stack(|stack| {
            let mut stack = stack.borrow_mut();
            let parent = Self::top_or_root(&mut stack).clone();
            let correlation = parent.correlation.child();
            stack.push(Frame {
                kind: FrameKind::Span,
                correlation: correlation.clone(),
                request_id: parent.request_id,
                session_id: parent.session_id,
                anchor_span_id: correlation.span_id.clone(),
            });
            correlation
        })
    }

    /// Close the innermost span; no-op if the top frame is not a span
    pub fn end_span(&self) {
        with_stack(|stack| {
            let mut stack = stack.borrow_mut();
            if stack.last().map(|f| f.kind) == Some(FrameKind::Span) {
                stack.pop();
            }
        });
    }

    /// Current correlation, lazily creating a root context if none exists
    pub fn get_or_create_correlation(&self) -> CorrelationContext {
        with_stack(|stack| {
            let mut stack = stack.borrow_mut();
            Self::top_or_root(&mut stack).correlation.clone()
        })
    }

    /// Replace the current span with a fresh one chained to it
    ///
    /// Used for span-per-entry tracing where consecutive entries form a chain.
    pub fn next_span(&self) -> CorrelationContext {
        with_stack(|stack| {
            let mut stack = stack.borrow_mut();
            let frame = Self::top_or_root(&mut stack);
            frame.correlation = frame.correlation.child();
            if frame.kind != FrameKind::Pagination {
                frame.anchor_span_id = frame.correlation.span_id.clone();
            }
            frame.correlation.clone()
        })
    }

    /// Snapshot of the current context without side effects
    pub fn get_current_context(&self) -> CurrentContext {
        with_stack(|stack| {
            let stack = stack.borrow();
            match stack.last() {
                Some(frame) => CurrentContext {
                    trace_id: Some(frame.correlation.trace_id.clone()),
                    request_id: frame.request_id.clone(),
                    session_id: Some(frame.session_id.clone()),
                    span_id: Some(frame.correlation.span_id.clone()),
                    correlation: Some(frame.correlation.clone()),
                },
                None => CurrentContext::default(),
            }
        })
    }

    /// Discard the current stack and begin a fresh trace
    ///
    /// Returns the new trace id.
    pub fn start_new_trace(&self) -> String {
        let trace_id = Self::generate_trace_id();
        with_stack(|stack| {
            let mut stack = stack.borrow_mut();
            stack.clear();
            stack.push(Frame::root(trace_id.clone()));
        });
        trace_id
    }

    /// Number of frames on the current thread's stack
    pub fn depth(&self) -> usize {
        with_stack(|stack| stack.borrow().len())
    }

    /// Capture the current stack so it can be re-entered elsewhere
    pub fn capture(&self) -> ContextSnapshot {
        with_stack(|stack| ContextSnapshot {
            frames: stack.borrow().clone(),
        })
    }

    /// Run `future` with its own empty correlation stack
    ///
    /// Tasks sharing a runtime thread otherwise share that thread's stack, so
    /// a request started in one task would nest under another task's request.
    ///
    /// ```
    /// # tokio_test::block_on(async {
    /// use correlated_logger::CorrelationManager;
    ///
    /// let trace_id = CorrelationManager::scope(async {
    ///     let manager = CorrelationManager::new();
    ///     manager.start_request(None);
    ///     tokio::task::yield_now().await;
    ///     manager.get_or_create_correlation().trace_id
    /// })
    /// .await;
    /// assert_eq!(trace_id.len(), 36);
    /// # });
    /// ```
    #[cfg(feature = "async-context")]
    pub fn scope<F: Future>(future: F) -> impl Future<Output = F::Output> {
        ContextSnapshot::default().scope(future)
    }

    fn top_or_root(stack: &mut Vec<Frame>) -> &mut Frame {
        if stack.is_empty() {
            stack.push(Frame::root(Self::generate_trace_id()));
        }
        let last = stack.len() - 1;
        &mut stack[last]
    }
}

/// A detached copy of a thread's correlation stack
///
/// Snapshots are `Send`: move one into a worker thread and call
/// [`enter`](Self::enter) to continue the same trace there.
#[derive(Debug, Clone, Default)]
pub struct ContextSnapshot {
    frames: Vec<Frame>,
}

impl ContextSnapshot {
    /// Correlation of the innermost frame, if any
    pub fn correlation(&self) -> Option<&CorrelationContext> {
        self.frames.last().map(|f| &f.correlation)
    }

    pub fn request_id(&self) -> Option<&str> {
        self.frames.last().and_then(|f| f.request_id.as_deref())
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Run `future` in its own task scope starting from this snapshot
    #[cfg(feature = "async-context")]
    pub fn scope<F: Future>(self, future: F) -> impl Future<Output = F::Output> {
        TASK_STACK.scope(RefCell::new(self.frames), future)
    }

    /// Install this snapshot as the current stack
    ///
    /// The previous stack is restored when the guard drops.
    pub fn enter(&self) -> SnapshotGuard {
        let previous = with_stack(|stack| stack.replace(self.frames.clone()));
        SnapshotGuard {
            previous: Some(previous),
            _not_send: PhantomData,
        }
    }
}

/// Restores the stack that was current before [`ContextSnapshot::enter`]
pub struct SnapshotGuard {
    previous: Option<Vec<Frame>>,
    _not_send: PhantomData<*const ()>,
}

impl Drop for SnapshotGuard {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            with_stack(|stack| {
                stack.replace(previous);
            });
        }
    }
}

/// Ends the request it was created for when dropped
pub struct RequestGuard {
    request_id: String,
    manager: CorrelationManager,
    _not_send: PhantomData<*const ()>,
}

impl RequestGuard {
    pub(crate) fn new(manager: CorrelationManager, request_id: String) -> Self {
        Self {
            request_id,
            manager,
            _not_send: PhantomData,
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        self.manager.end_request();
    }
}

/// Ends the span it was created for when dropped
pub struct SpanGuard {
    correlation: CorrelationContext,
    manager: CorrelationManager,
    _not_send: PhantomData<*const ()>,
}

impl SpanGuard {
    pub(crate) fn new(manager: CorrelationManager) -> Self {
        Self {
            correlation: manager.start_span(),
            manager,
            _not_send: PhantomData,
        }
    }

    pub fn correlation(&self) -> &CorrelationContext {
        &self.correlation
    }
}

impl Drop for SpanGuard {
    fn drop(&mut self) {
        self.manager.end_span();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn is_hex(s: &str) -> bool {
        s.chars().all(|c| c.is_ascii_hexdigit())
    }

    #[test]
    fn test_id_formats() {
        let trace = CorrelationManager::generate_trace_id();
        assert_eq!(trace.len(), 36);
        assert!(Uuid::parse_str(&trace).is_ok());

        let span = CorrelationManager::generate_span_id();
        assert_eq!(span.len(), 16);
        assert!(is_hex(&span));

        let request = CorrelationManager::generate_request_id();
        assert_eq!(request.len(), 12);
        assert!(is_hex(&request));

        let session = CorrelationManager::generate_session_id();
        assert_eq!(session.len(), 12);
        assert!(is_hex(&session));
    }

    #[test]
    fn test_ids_do_not_repeat() {
        let spans: HashSet<String> = (0..10_000)
            .map(|_| CorrelationManager::generate_span_id())
            .collect();
        assert_eq!(spans.len(), 10_000);
    }

    #[test]
    fn test_lazy_root_is_stable() {
        let manager = CorrelationManager::new();
        assert!(manager.get_current_context().correlation.is_none());

        let first = manager.get_or_create_correlation();
        let second = manager.get_or_create_correlation();
        assert_eq!(first, second);
        assert!(first.parent_span_id.is_none());
        assert_eq!(manager.depth(), 1);
    }

    #[test]
    fn test_sequential_requests_get_distinct_traces() {
        let manager = CorrelationManager::new();
        manager.start_request(None);
        let first = manager.get_or_create_correlation();
        manager.end_request();

        manager.start_request(None);
        let second = manager.get_or_create_correlation();
        manager.end_request();

        assert_ne!(first.trace_id, second.trace_id);
        assert_eq!(manager.depth(), 0);
    }

    #[test]
    fn test_request_over_lazy_root_starts_new_trace() {
        let manager = CorrelationManager::new();
        let root = manager.get_or_create_correlation();

        manager.start_request(None);
        let inside = manager.get_or_create_correlation();
        manager.end_request();

        assert_ne!(root.trace_id, inside.trace_id);
        assert_eq!(manager.get_or_create_correlation(), root);
    }

    #[test]
    fn test_nested_request_restores_outer() {
        let manager = CorrelationManager::new();
        let outer_id = manager.start_request(None);
        let outer = manager.get_or_create_correlation();

        let inner_id = manager.start_request(None);
        let inner = manager.get_or_create_correlation();
        assert_ne!(outer_id, inner_id);
        assert_eq!(inner.trace_id, outer.trace_id);
        assert_eq!(inner.parent_span_id.as_deref(), Some(outer.span_id.as_str()));

        manager.end_request();
        assert_eq!(manager.get_or_create_correlation(), outer);
        assert_eq!(manager.get_current_context().request_id, Some(outer_id));
        manager.end_request();
        assert_eq!(manager.depth(), 0);
    }

    #[test]
    fn test_parent_trace_id_continues_upstream_trace() {
        let manager = CorrelationManager::new();
        manager.start_request(Some("upstream-trace"));
        let correlation = manager.get_or_create_correlation();
        assert_eq!(correlation.trace_id, "upstream-trace");
        assert!(correlation.parent_span_id.is_none());
        manager.end_request();
    }

    #[test]
    fn test_end_request_on_empty_stack_is_noop() {
        let manager = CorrelationManager::new();
        manager.end_request();
        manager.end_request();
        assert_eq!(manager.depth(), 0);

        let request_id = manager.start_request(None);
        let context = manager.get_current_context();
        assert_eq!(context.request_id, Some(request_id));
        assert!(context.correlation.unwrap().parent_span_id.is_none());
        manager.end_request();
    }

    #[test]
    fn test_end_request_pops_open_spans() {
        let manager = CorrelationManager::new();
        manager.start_request(None);
        manager.start_span();
        manager.start_span();
        assert_eq!(manager.depth(), 3);
        manager.end_request();
        assert_eq!(manager.depth(), 0);
    }

    #[test]
    fn test_spans_chain_to_enclosing_span() {
        let manager = CorrelationManager::new();
        manager.start_request(None);
        let request = manager.get_or_create_correlation();

        let a = manager.start_span();
        let b = manager.start_span();
        assert_eq!(a.trace_id, request.trace_id);
        assert_eq!(b.trace_id, request.trace_id);
        assert_eq!(a.parent_span_id.as_deref(), Some(request.span_id.as_str()));
        assert_eq!(b.parent_span_id.as_deref(), Some(a.span_id.as_str()));
        assert_ne!(a.span_id, b.span_id);

        manager.end_span();
        assert_eq!(manager.get_or_create_correlation(), a);
        manager.end_span();
        assert_eq!(manager.get_or_create_correlation(), request);

        // end_span never pops a request frame
        manager.end_span();
        assert_eq!(manager.get_or_create_correlation(), request);
        manager.end_request();
    }

    #[test]
    fn test_next_span_chains_in_place() {
        let manager = CorrelationManager::new();
        manager.start_request(None);
        let first = manager.get_or_create_correlation();
        let second = manager.next_span();
        let third = manager.next_span();

        assert_eq!(second.parent_span_id.as_deref(), Some(first.span_id.as_str()));
        assert_eq!(third.parent_span_id.as_deref(), Some(second.span_id.as_str()));
        assert_eq!(third.trace_id, first.trace_id);
        assert_eq!(manager.depth(), 1);
        manager.end_request();
    }

    #[test]
    fn test_pagination_requests_share_parent() {
        let manager = CorrelationManager::new();
        manager.start_request(None);
        let parent = manager.get_or_create_correlation();

        manager.start_request_with(RequestOptions::new().pagination(true));
        let page1 = manager.get_or_create_correlation();
        manager.start_request_with(RequestOptions::new().pagination(true));
        let page2 = manager.get_or_create_correlation();

        assert_eq!(page1.parent_span_id.as_deref(), Some(parent.span_id.as_str()));
        assert_eq!(page2.parent_span_id.as_deref(), Some(parent.span_id.as_str()));

        manager.end_request();
        manager.end_request();
        manager.end_request();
        assert_eq!(manager.depth(), 0);
    }

    #[test]
    fn test_session_inherited_or_explicit() {
        let manager = CorrelationManager::new();
        manager.start_request_with(RequestOptions::new().session_id("sess-1"));
        manager.start_request(None);
        assert_eq!(
            manager.get_current_context().session_id.as_deref(),
            Some("sess-1")
        );
        manager.end_request();
        manager.end_request();
    }

    #[test]
    fn test_start_new_trace_replaces_stack() {
        let manager = CorrelationManager::new();
        manager.start_request(None);
        manager.start_span();
        let trace_id = manager.start_new_trace();
        assert_eq!(manager.depth(), 1);
        assert_eq!(manager.get_or_create_correlation().trace_id, trace_id);
        manager.start_new_trace();
        manager.end_request();
        assert_eq!(manager.depth(), 1);
    }

    #[test]
    fn test_guards_pop_on_drop() {
        let manager = CorrelationManager::new();
        {
            let request = RequestGuard::new(manager, manager.start_request(None));
            assert!(!request.request_id().is_empty());
            {
                let span = SpanGuard::new(manager);
                assert_eq!(manager.get_or_create_correlation(), *span.correlation());
            }
            assert_eq!(manager.depth(), 1);
        }
        assert_eq!(manager.depth(), 0);
    }

    #[test]
    fn test_threads_have_isolated_stacks() {
        let manager = CorrelationManager::new();
        manager.start_request(None);
        let here = manager.get_or_create_correlation();

        let there = std::thread::spawn(move || {
            let manager = CorrelationManager::new();
            assert_eq!(manager.depth(), 0);
            manager.start_request(None);
            manager.get_or_create_correlation()
        })
        .join()
        .unwrap();

        assert_ne!(here.trace_id, there.trace_id);
        assert_eq!(manager.get_or_create_correlation(), here);
        manager.end_request();
    }

    #[test]
    fn test_snapshot_enter_and_restore() {
        let manager = CorrelationManager::new();
        manager.start_request(None);
        let snapshot = manager.capture();
        let expected = snapshot.correlation().cloned().unwrap();
        manager.end_request();

        let seen = std::thread::spawn(move || {
            let manager = CorrelationManager::new();
            let _guard = snapshot.enter();
            manager.start_span()
        })
        .join()
        .unwrap();
        assert_eq!(seen.trace_id, expected.trace_id);
        assert_eq!(seen.parent_span_id, Some(expected.span_id.clone()));

        manager.start_request(None);
        let before = manager.get_or_create_correlation();
        {
            let _guard = ContextSnapshot::default().enter();
            assert_eq!(manager.depth(), 0);
        }
        assert_eq!(manager.get_or_create_correlation(), before);
        manager.end_request();
    }

    #[cfg(feature = "async-context")]
    async fn request_across_yield() -> (String, String) {
        let manager = CorrelationManager::new();
        manager.start_request(None);
        let before = manager.get_or_create_correlation().trace_id;
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        let after = manager.get_or_create_correlation().trace_id;
        manager.end_request();
        assert_eq!(manager.depth(), 0);
        (before, after)
    }

    #[cfg(feature = "async-context")]
    #[tokio::test(flavor = "current_thread")]
    async fn test_interleaved_tasks_keep_separate_traces() {
        let first = tokio::spawn(CorrelationManager::scope(request_across_yield()));
        let second = tokio::spawn(CorrelationManager::scope(request_across_yield()));
        let (first_before, first_after) = first.await.unwrap();
        let (second_before, second_after) = second.await.unwrap();

        assert_eq!(first_before, first_after);
        assert_eq!(second_before, second_after);
        assert_ne!(first_before, second_before);
        // The runtime thread's own stack is untouched
        assert_eq!(CorrelationManager::new().depth(), 0);
    }

    #[cfg(feature = "async-context")]
    #[tokio::test(flavor = "current_thread")]
    async fn test_snapshot_scope_continues_trace() {
        let manager = CorrelationManager::new();
        manager.start_request(None);
        let snapshot = manager.capture();
        let parent = manager.get_or_create_correlation();
        manager.end_request();

        let child = tokio::spawn(snapshot.scope(async {
            tokio::task::yield_now().await;
            CorrelationManager::new().start_span()
        }))
        .await
        .unwrap();

        assert_eq!(child.trace_id, parent.trace_id);
        assert_eq!(child.parent_span_id, Some(parent.span_id));
        assert_eq!(manager.depth(), 0);
    }
}
