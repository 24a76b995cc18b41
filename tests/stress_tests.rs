//! Stress tests for concurrent logging and overflow handling
//!
//! These tests verify:
//! - No entry is lost or duplicated under concurrent producers
//! - Correlation stays per thread under concurrency
//! - Overflow policies account for every entry
//! - Slow and failing destinations do not stall healthy ones

use correlated_logger::destinations::MemoryDestination;
use correlated_logger::prelude::*;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

struct SlowDestination {
    delay: Duration,
}

impl Destination for SlowDestination {
    fn deliver(&mut self, _batch: &[LogEntry]) -> Result<()> {
        thread::sleep(self.delay);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "slow"
    }
}

struct PanickingDestination;

impl Destination for PanickingDestination {
    fn deliver(&mut self, _batch: &[LogEntry]) -> Result<()> {
        panic!("collector crashed");
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "panicky"
    }
}

/// Test that every entry from many threads is delivered exactly once
#[test]
fn test_concurrent_producers_lose_nothing() {
    let memory = MemoryDestination::new("memory");
    let logger = Arc::new(
        Logger::builder()
            .batch_size(50)
            .max_buffer_size(10_000)
            .flush_interval(Duration::from_millis(20))
            .overflow_policy(OverflowPolicy::Block)
            .destination(memory.clone())
            .build()
            .unwrap(),
    );

    let threads = 8;
    let per_thread = 500;
    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let logger = Arc::clone(&logger);
            thread::spawn(move || {
                for i in 0..per_thread {
                    assert!(logger.info(format!("t{}-{}", t, i)));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let report = logger.close();
    assert!(report.is_success());
    assert_eq!(logger.dropped_count(), 0);

    let messages = memory.messages();
    assert_eq!(messages.len(), threads * per_thread);
    let unique: HashSet<&String> = messages.iter().collect();
    assert_eq!(unique.len(), threads * per_thread, "duplicate delivery");

    // Each thread's entries keep their submission order
    for t in 0..threads {
        let prefix = format!("t{}-", t);
        let order: Vec<usize> = messages
            .iter()
            .filter_map(|m| m.strip_prefix(&prefix))
            .map(|n| n.parse().unwrap())
            .collect();
        assert!(order.windows(2).all(|w| w[0] < w[1]));
    }
}

/// Test that concurrent requests never share a trace
#[test]
fn test_correlation_is_per_thread() {
    let memory = MemoryDestination::new("memory");
    let logger = Arc::new(
        Logger::builder()
            .max_buffer_size(10_000)
            .flush_interval(Duration::from_secs(3600))
            .destination(memory.clone())
            .build()
            .unwrap(),
    );

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let logger = Arc::clone(&logger);
            thread::spawn(move || {
                for r in 0..20 {
                    let _request = logger.request_scope(None);
                    for i in 0..5 {
                        logger.info_with_context(
                            format!("request {}", r),
                            LogContext::new()
                                .with_field("thread", t as i64)
                                .with_field("seq", i as i64),
                        );
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    logger.flush();

    let entries = memory.entries();
    assert_eq!(entries.len(), 8 * 20 * 5);

    let traces: HashSet<&str> = entries.iter().filter_map(|e| e.trace_id()).collect();
    assert_eq!(traces.len(), 8 * 20, "each request should own one trace");

    for trace in traces {
        let owners: HashSet<String> = entries
            .iter()
            .filter(|e| e.trace_id() == Some(trace))
            .map(|e| e.extra()["thread"].to_string())
            .collect();
        assert_eq!(owners.len(), 1, "trace {} crossed threads", trace);
    }
}

/// Test that drop-oldest keeps accounting exact under load
#[test]
fn test_drop_oldest_accounts_for_every_entry() {
    let callback_total = Arc::new(AtomicU64::new(0));
    let seen = Arc::clone(&callback_total);
    let memory = MemoryDestination::new("memory");
    let logger = Arc::new(
        Logger::builder()
            .batch_size(10)
            .max_buffer_size(20)
            .flush_interval(Duration::from_secs(3600))
            .overflow_policy(OverflowPolicy::DropOldest)
            .on_overflow(Arc::new(move |total| {
                seen.fetch_max(total, Ordering::SeqCst);
            }))
            .destination(memory.clone())
            .build()
            .unwrap(),
    );

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let logger = Arc::clone(&logger);
            thread::spawn(move || {
                for i in 0..1_000 {
                    logger.info(format!("{}:{}", t, i));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    logger.close();

    let dropped = logger.dropped_count();
    assert_eq!(memory.len() as u64 + dropped, 4_000);
    assert_eq!(callback_total.load(Ordering::SeqCst), dropped);
    assert_eq!(logger.metrics().total_submitted(), 4_000);
}

/// Test that blocked producers always make progress
#[test]
fn test_block_policy_never_deadlocks() {
    let memory = MemoryDestination::new("memory");
    let logger = Arc::new(
        Logger::builder()
            .batch_size(2)
            .max_buffer_size(2)
            .flush_interval(Duration::from_secs(3600))
            .overflow_policy(OverflowPolicy::BlockWithTimeout(Duration::from_millis(50)))
            .destination(memory.clone())
            .build()
            .unwrap(),
    );

    let start = Instant::now();
    let handles: Vec<_> = (0..4)
        .map(|t| {
            let logger = Arc::clone(&logger);
            thread::spawn(move || {
                for i in 0..500 {
                    logger.info(format!("{}:{}", t, i));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    logger.close();

    assert!(start.elapsed() < Duration::from_secs(30));
    assert_eq!(memory.len() as u64 + logger.dropped_count(), 2_000);
}

/// Test that a panicking destination does not stall a healthy one
#[test]
fn test_panicking_destination_under_load() {
    let memory = MemoryDestination::new("memory");
    let logger = Logger::builder()
        .batch_size(25)
        .max_buffer_size(10_000)
        .flush_interval(Duration::from_millis(10))
        .destination(PanickingDestination)
        .destination(memory.clone())
        .build()
        .unwrap();

    for i in 0..1_000 {
        logger.info(format!("entry {}", i));
    }
    let report = logger.close();

    assert_eq!(memory.len(), 1_000);
    assert_eq!(report.failed_destinations(), vec!["panicky"]);
    assert!(logger.metrics().failed_deliveries() > 0);
}

/// Test that close returns within the shutdown timeout when a destination hangs
#[test]
fn test_close_bounded_with_hung_destination() {
    let memory = MemoryDestination::new("memory");
    let logger = Logger::builder()
        .flush_interval(Duration::from_secs(3600))
        .shutdown_timeout(Duration::from_millis(200))
        .destination(SlowDestination {
            delay: Duration::from_secs(3),
        })
        .destination(memory.clone())
        .build()
        .unwrap();

    logger.info("one");
    let start = Instant::now();
    let report = logger.close();

    assert!(start.elapsed() < Duration::from_secs(2));
    assert_eq!(report.failed_destinations(), vec!["slow"]);
    assert_eq!(memory.messages(), vec!["one"]);
}
