//! Overflow policies for the async delivery queue
//!
//! When the bounded queue is full, the policy decides what happens to the
//! record being enqueued.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Policy for handling a full async queue
///
/// # Example
///
/// ```
/// use rust_log_pipeline::core::OverflowPolicy;
/// use std::time::Duration;
///
/// // Default behavior: alert and drop
/// let policy = OverflowPolicy::default();
/// assert_eq!(policy, OverflowPolicy::AlertAndDrop);
///
/// // Block with timeout
/// let policy = OverflowPolicy::BlockWithTimeout(Duration::from_millis(100));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OverflowPolicy {
    /// Drop the record being enqueued, counting it
    DropNewest,

    /// Evict the oldest queued record to make room for the new one
    DropOldest,

    /// Block the producer until space is available
    ///
    /// Warning: this turns a slow sink into application backpressure.
    Block,

    /// Block up to the given duration, then drop
    BlockWithTimeout(Duration),

    /// Drop, alert on stderr and invoke the overflow callback
    ///
    /// Alerts fire on the first drop and every 1000th drop after that.
    #[default]
    AlertAndDrop,
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverflowPolicy::DropNewest => write!(f, "DropNewest"),
            OverflowPolicy::DropOldest => write!(f, "DropOldest"),
            OverflowPolicy::Block => write!(f, "Block"),
            OverflowPolicy::BlockWithTimeout(d) => write!(f, "BlockWithTimeout({:?})", d),
            OverflowPolicy::AlertAndDrop => write!(f, "AlertAndDrop"),
        }
    }
}

/// Callback type for overflow notifications
///
/// The parameter is the total count of dropped records so far.
pub type OverflowCallback = Arc<dyn Fn(u64) + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overflow_policy_default() {
        let policy = OverflowPolicy::default();
        assert_eq!(policy, OverflowPolicy::AlertAndDrop);
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
        assert_eq!(OverflowPolicy::AlertAndDrop.to_string(), "AlertAndDrop");
    }

    #[test]
    fn test_overflow_policy_serde() {
        let json = serde_json::to_string(&OverflowPolicy::DropOldest).unwrap();
        assert_eq!(json, "\"DropOldest\"");
        let parsed: OverflowPolicy = serde_json::from_str("\"Block\"").unwrap();
        assert_eq!(parsed, OverflowPolicy::Block);
    }
}
