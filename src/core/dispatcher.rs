//! Buffered multi-destination dispatch
//!
//! Producers append to a bounded FIFO buffer. The buffer is drained into an
//! `Arc<[LogEntry]>` snapshot when it reaches `batch_size`, when
//! `flush_interval` elapses, on an explicit flush and on close. Every
//! destination has its own worker thread and inbox, so a slow or failing
//! destination never delays the others or the producers.
//!
//! A worker inbox holds at most `max_buffer_size` entries. A destination that
//! falls further behind loses its oldest batches; the loss is counted as
//! dropped and reported as a failure of that destination.

use super::{
    config::{LoggerConfig, MAX_DURATION},
    destination::Destination,
    error::{HandlerPhase, LoggerError, Result},
    log_entry::LogEntry,
    metrics::DispatchMetrics,
    overflow_policy::{OverflowCallback, OverflowPolicy, RetryPolicy},
};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use parking_lot::{Condvar, Mutex};
use std::any::Any;
use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Control commands a destination worker may have queued
const WORKER_COMMAND_CAPACITY: usize = 64;

const JOIN_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Failure attributed to a single destination
#[derive(Debug)]
pub struct DestinationFailure {
    pub destination: String,
    /// Most recent error since the previous report
    pub error: LoggerError,
    /// Batches that failed since the previous report
    pub failed_batches: usize,
}

/// Outcome of a flush or close
#[derive(Debug, Default)]
pub struct FlushReport {
    /// Entries drained from the buffer and handed to the destinations
    pub delivered: usize,
    pub failures: Vec<DestinationFailure>,
    /// Entries dropped by overflow since the previous report
    pub dropped: u64,
}

impl FlushReport {
    /// True when every destination succeeded
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failed_destinations(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.destination.as_str()).collect()
    }
}

enum Command {
    /// New batches are waiting in the inbox
    Wake,
    Flush(Sender<WorkerReport>),
    Close(Sender<WorkerReport>),
}

enum TimerSignal {
    Flush,
    Shutdown,
}

#[derive(Default)]
struct WorkerReport {
    last_error: Option<LoggerError>,
    failed_batches: usize,
}

/// Counts overflow drops for metrics, reports and the overflow callback
struct DropTracker {
    metrics: Arc<DispatchMetrics>,
    since_report: AtomicU64,
    on_overflow: Option<OverflowCallback>,
}

impl DropTracker {
    fn record(&self, count: u64) {
        if count == 0 {
            return;
        }
        let total = self.metrics.record_dropped_many(count);
        self.since_report.fetch_add(count, Ordering::Relaxed);
        if let Some(ref callback) = self.on_overflow {
            callback(total);
        }
    }

    fn take(&self) -> u64 {
        self.since_report.swap(0, Ordering::Relaxed)
    }
}

/// Batches handed to a worker and not yet picked up, oldest first
struct Inbox {
    state: Mutex<InboxState>,
    max_entries: usize,
}

#[derive(Default)]
struct InboxState {
    batches: VecDeque<Arc<[LogEntry]>>,
    entries: usize,
    /// Batches evicted since the worker last drained the inbox
    lost_batches: usize,
    lost_entries: usize,
}

impl Inbox {
    fn new(max_entries: usize) -> Self {
        Self {
            state: Mutex::new(InboxState::default()),
            max_entries,
        }
    }

    /// Queue a batch, returning how many entries were evicted to make room
    fn push(&self, batch: Arc<[LogEntry]>) -> usize {
        let mut state = self.state.lock();
        state.entries += batch.len();
        state.batches.push_back(batch);

        let mut evicted = 0;
        while state.entries > self.max_entries && state.batches.len() > 1 {
            if let Some(oldest) = state.batches.pop_front() {
                state.entries -= oldest.len();
                state.lost_batches += 1;
                state.lost_entries += oldest.len();
                evicted += oldest.len();
            }
        }
        evicted
    }

    fn take(&self) -> InboxState {
        std::mem::take(&mut *self.state.lock())
    }
}

struct WorkerHandle {
    name: String,
    sender: Sender<Command>,
    inbox: Arc<Inbox>,
}

struct Shared {
    buffer: Mutex<VecDeque<LogEntry>>,
    space_available: Condvar,
    /// Serializes drains so batches reach every worker in buffer order
    dispatch_lock: Mutex<()>,
    closed: AtomicBool,
    batch_size: usize,
    max_buffer_size: usize,
    overflow_policy: OverflowPolicy,
    workers: Vec<WorkerHandle>,
    kick: Sender<TimerSignal>,
    drops: Arc<DropTracker>,
    metrics: Arc<DispatchMetrics>,
}

impl Shared {
    /// Drain the whole buffer and hand the snapshot to every worker
    fn dispatch_buffer(&self) -> usize {
        let _order = self.dispatch_lock.lock();
        let drained: Vec<LogEntry> = {
            let mut buffer = self.buffer.lock();
            let drained = buffer.drain(..).collect();
            self.space_available.notify_all();
            drained
        };
        if drained.is_empty() {
            return 0;
        }

        self.metrics.record_flush();
        let snapshot: Arc<[LogEntry]> = drained.into();
        for worker in &self.workers {
            let evicted = worker.inbox.push(Arc::clone(&snapshot));
            if evicted > 0 {
                tracing::warn!(
                    destination = %worker.name,
                    entries = evicted,
                    "destination fell behind, dropped oldest batches"
                );
                self.drops.record(evicted as u64);
            }
            match worker.sender.try_send(Command::Wake) {
                // A queued command drains the inbox as well
                Ok(()) | Err(TrySendError::Full(_)) => {}
                Err(TrySendError::Disconnected(_)) => {
                    tracing::error!(destination = %worker.name, "destination worker is gone");
                }
            }
        }
        snapshot.len()
    }

    fn request_flush(&self) {
        // A pending signal already covers this request
        let _ = self.kick.try_send(TimerSignal::Flush);
    }
}

/// The dispatch engine behind a `Logger`
pub struct Dispatcher {
    shared: Arc<Shared>,
    timer: Mutex<Option<JoinHandle<()>>>,
    worker_threads: Mutex<Vec<(String, JoinHandle<()>)>>,
    shutdown_timeout: Duration,
}

impl Dispatcher {
    /// Validate `config` and start the timer and one worker per destination
    pub fn new(
        config: &LoggerConfig,
        destinations: Vec<Box<dyn Destination>>,
        on_overflow: Option<OverflowCallback>,
    ) -> Result<Self> {
        config.validate()?;

        let metrics = Arc::new(DispatchMetrics::new());
        let drops = Arc::new(DropTracker {
            metrics: Arc::clone(&metrics),
            since_report: AtomicU64::new(0),
            on_overflow,
        });

        let mut workers = Vec::with_capacity(destinations.len());
        let mut worker_threads = Vec::with_capacity(destinations.len());
        for destination in destinations {
            let name = destination.name().to_string();
            let (sender, receiver) = bounded(WORKER_COMMAND_CAPACITY);
            let inbox = Arc::new(Inbox::new(config.max_buffer_size));
            let worker = Worker {
                name: name.clone(),
                destination,
                inbox: Arc::clone(&inbox),
                retry_policy: config.retry_policy.clone(),
                max_pending_entries: config.max_buffer_size,
                pending: VecDeque::new(),
                pending_entries: 0,
                report: WorkerReport::default(),
                metrics: Arc::clone(&metrics),
                drops: Arc::clone(&drops),
            };
            let handle = thread::Builder::new()
                .name(format!("log-dest-{}", name))
                .spawn(move || worker.run(receiver))
                .map_err(|e| {
                    LoggerError::io_operation(
                        "spawning destination worker",
                        format!("cannot start worker for '{}'", name),
                        e,
                    )
                })?;
            workers.push(WorkerHandle {
                name: name.clone(),
                sender,
                inbox,
            });
            worker_threads.push((name, handle));
        }

        let (kick, kick_rx) = bounded(1);
        let shared = Arc::new(Shared {
            buffer: Mutex::new(VecDeque::with_capacity(config.batch_size)),
            space_available: Condvar::new(),
            dispatch_lock: Mutex::new(()),
            closed: AtomicBool::new(false),
            batch_size: config.batch_size,
            max_buffer_size: config.max_buffer_size,
            overflow_policy: config.overflow_policy.clone(),
            workers,
            kick,
            drops,
            metrics,
        });

        let timer_shared = Arc::clone(&shared);
        let interval = config.flush_interval;
        let timer = thread::Builder::new()
            .name("log-flush-timer".to_string())
            .spawn(move || Self::run_timer(timer_shared, kick_rx, interval))
            .map_err(|e| {
                LoggerError::io_operation("spawning flush timer", "cannot start timer", e)
            })?;

        Ok(Self {
            shared,
            timer: Mutex::new(Some(timer)),
            worker_threads: Mutex::new(worker_threads),
            shutdown_timeout: config.shutdown_timeout,
        })
    }

    fn run_timer(shared: Arc<Shared>, signals: Receiver<TimerSignal>, interval: Duration) {
        loop {
            match signals.recv_timeout(interval) {
                Ok(TimerSignal::Flush) | Err(RecvTimeoutError::Timeout) => {
                    if shared.closed.load(Ordering::Acquire) {
                        break;
                    }
                    shared.dispatch_buffer();
                }
                Ok(TimerSignal::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        tracing::debug!("flush timer stopped");
    }

    /// Append an entry to the buffer
    ///
    /// Returns `Ok(false)` when the overflow policy rejected the entry and
    /// `Err(LoggerStopped)` once the dispatcher is closed.
    pub fn submit(&self, entry: LogEntry) -> Result<bool> {
        let shared = &self.shared;
        let mut evicted = false;

        // Checked under the lock so a concurrent close always drains this entry
        let mut buffer = shared.buffer.lock();
        if shared.closed.load(Ordering::Acquire) {
            return Err(LoggerError::LoggerStopped);
        }
        if buffer.len() >= shared.max_buffer_size {
            match shared.overflow_policy {
                OverflowPolicy::DropOldest => {
                    buffer.pop_front();
                    evicted = true;
                }
                OverflowPolicy::DropNewest => {
                    drop(buffer);
                    shared.drops.record(1);
                    tracing::warn!(
                        max_buffer_size = shared.max_buffer_size,
                        "log buffer full, rejected new entry"
                    );
                    return Ok(false);
                }
                OverflowPolicy::Block => {
                    shared.metrics.record_block();
                    while buffer.len() >= shared.max_buffer_size {
                        if shared.closed.load(Ordering::Acquire) {
                            return Err(LoggerError::LoggerStopped);
                        }
                        shared.request_flush();
                        shared.space_available.wait(&mut buffer);
                    }
                }
                OverflowPolicy::BlockWithTimeout(timeout) => {
                    shared.metrics.record_block();
                    // Unrepresentable deadlines wait like `Block`
                    let deadline = Instant::now().checked_add(timeout);
                    while buffer.len() >= shared.max_buffer_size {
                        if shared.closed.load(Ordering::Acquire) {
                            return Err(LoggerError::LoggerStopped);
                        }
                        shared.request_flush();
                        let timed_out = match deadline {
                            Some(deadline) => shared
                                .space_available
                                .wait_until(&mut buffer, deadline)
                                .timed_out(),
                            None => {
                                shared.space_available.wait(&mut buffer);
                                false
                            }
                        };
                        if timed_out && buffer.len() >= shared.max_buffer_size {
                            drop(buffer);
                            shared.drops.record(1);
                            tracing::warn!(?timeout, "log buffer still full after timeout");
                            return Ok(false);
                        }
                    }
                }
            }
        }

        buffer.push_back(entry);
        shared.metrics.record_submitted();
        let reached_batch = buffer.len() >= shared.batch_size;
        drop(buffer);

        if evicted {
            shared.drops.record(1);
            tracing::warn!(
                max_buffer_size = shared.max_buffer_size,
                "log buffer full, dropped oldest entry"
            );
        }
        if reached_batch {
            shared.request_flush();
        }
        Ok(true)
    }

    /// Deliver everything buffered and wait for each destination to confirm
    pub fn flush(&self) -> bool {
        self.flush_report().is_success()
    }

    pub fn flush_report(&self) -> FlushReport {
        if self.is_closed() {
            return FlushReport::default();
        }
        let delivered = self.shared.dispatch_buffer();
        let mut report = self.collect(Command::Flush, deadline_after(self.shutdown_timeout));
        report.delivered = delivered;
        report
    }

    /// Final flush, then close every destination
    ///
    /// Idempotent: only the first call does any work. Waits at most
    /// `shutdown_timeout`; destinations that do not answer in time are
    /// reported as failures and left behind.
    pub fn close(&self) -> FlushReport {
        if self.shared.closed.swap(true, Ordering::AcqRel) {
            return FlushReport::default();
        }
        let deadline = deadline_after(self.shutdown_timeout);

        {
            let _buffer = self.shared.buffer.lock();
            self.shared.space_available.notify_all();
        }

        self.stop_timer(deadline);

        let delivered = self.shared.dispatch_buffer();
        let mut report = self.collect(Command::Close, deadline);
        report.delivered = delivered;

        let threads = std::mem::take(&mut *self.worker_threads.lock());
        for (name, handle) in threads {
            if !Self::join_until(handle, deadline)
                && !report.failures.iter().any(|f| f.destination == name)
            {
                report.failures.push(DestinationFailure {
                    error: LoggerError::delivery_timeout(&name, self.shutdown_timeout),
                    destination: name,
                    failed_batches: 0,
                });
            }
        }

        if !report.is_success() {
            tracing::warn!(
                failed = ?report.failed_destinations(),
                "logger closed with destination failures"
            );
        }
        let dropped = self.shared.metrics.dropped_count();
        if dropped > 0 {
            tracing::warn!(
                dropped,
                drop_rate = self.shared.metrics.drop_rate(),
                "logger closed with dropped entries"
            );
        }
        report
    }

    /// Send a control command to every worker and gather the replies
    fn collect(
        &self,
        command: fn(Sender<WorkerReport>) -> Command,
        deadline: Instant,
    ) -> FlushReport {
        let mut report = FlushReport::default();
        let mut pending = Vec::with_capacity(self.shared.workers.len());

        for worker in &self.shared.workers {
            let (ack, replies) = bounded(1);
            let remaining = deadline.saturating_duration_since(Instant::now());
            match worker.sender.send_timeout(command(ack), remaining) {
                Ok(()) => pending.push((worker.name.as_str(), replies)),
                Err(_) => report.failures.push(DestinationFailure {
                    destination: worker.name.clone(),
                    error: LoggerError::delivery_timeout(&worker.name, self.shutdown_timeout),
                    failed_batches: 0,
                }),
            }
        }

        for (name, replies) in pending {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match replies.recv_timeout(remaining) {
                Ok(WorkerReport {
                    last_error: Some(error),
                    failed_batches,
                }) => report.failures.push(DestinationFailure {
                    destination: name.to_string(),
                    error,
                    failed_batches,
                }),
                Ok(_) => {}
                Err(_) => {
                    tracing::warn!(destination = name, "destination did not respond in time");
                    report.failures.push(DestinationFailure {
                        destination: name.to_string(),
                        error: LoggerError::delivery_timeout(name, self.shutdown_timeout),
                        failed_batches: 0,
                    });
                }
            }
        }

        report.dropped = self.shared.drops.take();
        report
    }

    fn stop_timer(&self, deadline: Instant) {
        if let Some(timer) = self.timer.lock().take() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let _ = self.shared.kick.send_timeout(TimerSignal::Shutdown, remaining);
            if !Self::join_until(timer, deadline) {
                tracing::warn!("flush timer did not stop in time");
            }
        }
    }

    fn join_until(handle: JoinHandle<()>, deadline: Instant) -> bool {
        loop {
            if handle.is_finished() {
                if handle.join().is_err() {
                    tracing::error!("dispatcher thread panicked");
                }
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(JOIN_POLL_INTERVAL);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// Entries currently waiting in the buffer
    pub fn buffered(&self) -> usize {
        self.shared.buffer.lock().len()
    }

    pub fn metrics(&self) -> &DispatchMetrics {
        &self.shared.metrics
    }

    pub fn destination_names(&self) -> Vec<&str> {
        self.shared.workers.iter().map(|w| w.name.as_str()).collect()
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.close();
    }
}

/// `now + timeout`, capped instead of overflowing
fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout)
        .or_else(|| now.checked_add(MAX_DURATION))
        .unwrap_or(now)
}

struct Worker {
    name: String,
    destination: Box<dyn Destination>,
    inbox: Arc<Inbox>,
    retry_policy: RetryPolicy,
    max_pending_entries: usize,
    /// Failed batches waiting to be re-delivered, oldest first
    pending: VecDeque<Arc<[LogEntry]>>,
    pending_entries: usize,
    report: WorkerReport,
    metrics: Arc<DispatchMetrics>,
    drops: Arc<DropTracker>,
}

impl Worker {
    fn run(mut self, commands: Receiver<Command>) {
        while let Ok(command) = commands.recv() {
            self.drain_inbox();
            match command {
                Command::Wake => {}
                Command::Flush(ack) => {
                    self.retry_pending();
                    if let Err(e) = self.guarded(HandlerPhase::Flush, |d| d.flush()) {
                        self.record_failure(e);
                    }
                    let _ = ack.send(std::mem::take(&mut self.report));
                }
                Command::Close(ack) => {
                    self.retry_pending();
                    if let Err(e) = self.guarded(HandlerPhase::Close, |d| d.close()) {
                        self.record_failure(e);
                    }
                    if self.pending_entries > 0 {
                        tracing::warn!(
                            destination = %self.name,
                            entries = self.pending_entries,
                            "undelivered entries discarded at close"
                        );
                        self.drops.record(self.pending_entries as u64);
                    }
                    let _ = ack.send(std::mem::take(&mut self.report));
                    break;
                }
            }
        }
        tracing::debug!(destination = %self.name, "destination worker stopped");
    }

    fn drain_inbox(&mut self) {
        let taken = self.inbox.take();
        if taken.lost_batches > 0 {
            let error = LoggerError::write_error(
                &self.name,
                format!(
                    "fell behind, {} entries in {} batches dropped",
                    taken.lost_entries, taken.lost_batches
                ),
            );
            tracing::error!(destination = %self.name, error = %error, "destination failed");
            self.metrics.record_failed_delivery();
            self.report.failed_batches += taken.lost_batches;
            self.report.last_error = Some(error);
        }
        for batch in taken.batches {
            self.deliver(batch);
        }
    }

    fn deliver(&mut self, batch: Arc<[LogEntry]>) {
        self.retry_pending();
        if !self.pending.is_empty() {
            self.park(batch);
            return;
        }
        if let Err(e) = self.deliver_with_retry(&batch) {
            self.record_failure(e);
            self.park(batch);
        }
    }

    fn retry_pending(&mut self) {
        while let Some(batch) = self.pending.front().cloned() {
            match self.deliver_with_retry(&batch) {
                Ok(()) => {
                    self.pending.pop_front();
                    self.pending_entries -= batch.len();
                }
                Err(e) => {
                    self.record_failure(e);
                    break;
                }
            }
        }
    }

    fn deliver_with_retry(&mut self, batch: &[LogEntry]) -> Result<()> {
        let mut attempt = 1;
        loop {
            match self.guarded(HandlerPhase::Write, |d| d.deliver(batch)) {
                Ok(()) => {
                    self.metrics.record_delivered(batch.len());
                    return Ok(());
                }
                Err(e) if attempt < self.retry_policy.max_attempts => {
                    tracing::debug!(
                        destination = %self.name,
                        attempt,
                        error = %e,
                        "delivery failed, retrying"
                    );
                    thread::sleep(self.retry_policy.backoff(attempt));
                    self.metrics.record_retry();
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Run a destination call, converting panics into handler errors
    fn guarded<F>(&mut self, phase: HandlerPhase, call: F) -> Result<()>
    where
        F: FnOnce(&mut dyn Destination) -> Result<()>,
    {
        let destination = self.destination.as_mut();
        match catch_unwind(AssertUnwindSafe(|| call(destination))) {
            Ok(result) => result,
            Err(panic) => Err(LoggerError::handler(
                &self.name,
                phase,
                format!("panicked: {}", panic_message(panic.as_ref())),
            )),
        }
    }

    fn park(&mut self, batch: Arc<[LogEntry]>) {
        self.pending_entries += batch.len();
        self.pending.push_back(batch);
        while self.pending_entries > self.max_pending_entries {
            match self.pending.pop_front() {
                Some(oldest) => {
                    self.pending_entries -= oldest.len();
                    self.drops.record(oldest.len() as u64);
                }
                None => break,
            }
        }
    }

    fn record_failure(&mut self, error: LoggerError) {
        tracing::error!(destination = %self.name, error = %error, "destination failed");
        self.metrics.record_failed_delivery();
        self.report.failed_batches += 1;
        self.report.last_error = Some(error);
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}
