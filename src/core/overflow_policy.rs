//! Overflow and retry policies for the dispatch buffer
//!
//! When the in-memory buffer reaches `max_buffer_size`, the overflow policy
//! decides what happens to the entry being submitted. The retry policy decides
//! how hard a destination worker tries before parking a failed batch.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Policy for handling buffer overflow
///
/// # Example
///
/// ```
/// use correlated_logger::OverflowPolicy;
/// use std::time::Duration;
///
/// // Default behavior: evict the oldest buffered entry
/// let policy = OverflowPolicy::default();
/// assert_eq!(policy, OverflowPolicy::DropOldest);
///
/// // Block with timeout
/// let policy = OverflowPolicy::BlockWithTimeout(Duration::from_millis(100));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "PolicyRepr", into = "PolicyRepr")]
pub enum OverflowPolicy {
    /// Evict the oldest buffered entry to make room for the new one
    #[default]
    DropOldest,

    /// Reject the new entry; `submit` returns `false`
    DropNewest,

    /// Block the producer until a flush frees space
    ///
    /// Warning: This can cause backpressure in the application.
    Block,

    /// Block with timeout, then reject the new entry
    BlockWithTimeout(Duration),
}

impl OverflowPolicy {
    /// Whether producers may wait for space under this policy
    pub fn blocks(&self) -> bool {
        matches!(
            self,
            OverflowPolicy::Block | OverflowPolicy::BlockWithTimeout(_)
        )
    }
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverflowPolicy::DropOldest => write!(f, "DropOldest"),
            OverflowPolicy::DropNewest => write!(f, "DropNewest"),
            OverflowPolicy::Block => write!(f, "Block"),
            OverflowPolicy::BlockWithTimeout(d) => write!(f, "BlockWithTimeout({:?})", d),
        }
    }
}

/// Config-file representation: `"drop_oldest"` or `{"block_with_timeout_ms": 100}`
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum PolicyRepr {
    DropOldest,
    DropNewest,
    Block,
    BlockWithTimeoutMs(u64),
}

impl From<PolicyRepr> for OverflowPolicy {
    fn from(repr: PolicyRepr) -> Self {
        match repr {
            PolicyRepr::DropOldest => OverflowPolicy::DropOldest,
            PolicyRepr::DropNewest => OverflowPolicy::DropNewest,
            PolicyRepr::Block => OverflowPolicy::Block,
            PolicyRepr::BlockWithTimeoutMs(ms) => {
                OverflowPolicy::BlockWithTimeout(Duration::from_millis(ms))
            }
        }
    }
}

impl From<OverflowPolicy> for PolicyRepr {
    fn from(policy: OverflowPolicy) -> Self {
        match policy {
            OverflowPolicy::DropOldest => PolicyRepr::DropOldest,
            OverflowPolicy::DropNewest => PolicyRepr::DropNewest,
            OverflowPolicy::Block => PolicyRepr::Block,
            OverflowPolicy::BlockWithTimeout(d) => {
                PolicyRepr::BlockWithTimeoutMs(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            }
        }
    }
}

/// Callback type for overflow notifications
///
/// Called when entries are dropped due to buffer overflow.
/// The parameter is the total count of dropped entries so far.
pub type OverflowCallback = Arc<dyn Fn(u64) + Send + Sync>;

/// Retry behavior of a destination worker for a failing batch
///
/// `max_attempts` counts the first delivery. Between attempts the worker
/// sleeps with exponential backoff capped at `max_backoff`. A batch that
/// still fails is parked in the destination's retry queue and re-delivered
/// ahead of the next batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    #[serde(with = "super::config::duration_ms")]
    pub initial_backoff: Duration,
    #[serde(with = "super::config::duration_ms")]
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Single attempt, no in-worker retries
    pub const fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    pub fn exponential(max_attempts: u32, initial_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff,
            max_backoff: initial_backoff.saturating_mul(32),
        }
    }

    #[must_use]
    pub fn with_max_backoff(mut self, max_backoff: Duration) -> Self {
        self.max_backoff = max_backoff;
        self
    }

    /// Delay before retry number `retry` (1-based)
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry.saturating_sub(1)).unwrap_or(u32::MAX);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overflow_policy_default() {
        let policy = OverflowPolicy::default();
        assert_eq!(policy, OverflowPolicy::DropOldest);
        assert!(!policy.blocks());
        assert!(OverflowPolicy::Block.blocks());
    }

    #[test]
    fn test_overflow_policy_display() {
        assert_eq!(OverflowPolicy::DropNewest.to_string(), "DropNewest");
        assert_eq!(OverflowPolicy::DropOldest.to_string(), "DropOldest");
        assert_eq!(OverflowPolicy::Block.to_string(), "Block");
        assert_eq!(
            OverflowPolicy::BlockWithTimeout(Duration::from_millis(100)).to_string(),
            "BlockWithTimeout(100ms)"
        );
    }

    #[test]
    fn test_overflow_policy_serde() {
        let json = serde_json::to_string(&OverflowPolicy::DropNewest).unwrap();
        assert_eq!(json, "\"drop_newest\"");

        let policy: OverflowPolicy =
            serde_json::from_str(r#"{"block_with_timeout_ms":250}"#).unwrap();
        assert_eq!(
            policy,
            OverflowPolicy::BlockWithTimeout(Duration::from_millis(250))
        );
    }

    #[test]
    fn test_retry_backoff_doubles_and_caps() {
        let policy = RetryPolicy::exponential(5, Duration::from_millis(10))
            .with_max_backoff(Duration::from_millis(35));
        assert_eq!(policy.backoff(1), Duration::from_millis(10));
        assert_eq!(policy.backoff(2), Duration::from_millis(20));
        assert_eq!(policy.backoff(3), Duration::from_millis(35));
        assert_eq!(policy.backoff(40), Duration::from_millis(35));
    }

    #[test]
    fn test_retry_none_is_default() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.backoff(1), Duration::ZERO);
    }
}
