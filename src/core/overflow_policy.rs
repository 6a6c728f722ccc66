//! Overflow handling for the async dispatch queue
//!
//! Emission never waits for sink I/O, so records are buffered in a bounded
//! queue. When that queue is full, the policy decides what happens to the
//! incoming record.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Policy for handling a full dispatch queue
///
/// Records at [`LogPriority::Critical`] ignore the policy: the caller waits
/// for queue space instead of dropping them.
///
/// # Example
///
/// ```
/// use core_registry_logger::OverflowPolicy;
/// use std::time::Duration;
///
/// let policy = OverflowPolicy::default();
/// assert_eq!(policy, OverflowPolicy::AlertAndDrop);
///
/// let policy = OverflowPolicy::BlockWithTimeout(Duration::from_millis(100));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Drop the incoming record and only count it
    DropNewest,

    /// Wait until the worker frees a slot
    ///
    /// Applies backpressure to the caller; only use when no record may be lost.
    Block,

    /// Wait up to the given duration, then drop with an alert
    BlockWithTimeout(Duration),

    /// Drop the record, report on stderr and notify the overflow callback
    #[default]
    AlertAndDrop,
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverflowPolicy::DropNewest => write!(f, "DropNewest"),
            OverflowPolicy::Block => write!(f, "Block"),
            OverflowPolicy::BlockWithTimeout(d) => write!(f, "BlockWithTimeout({:?})", d),
            OverflowPolicy::AlertAndDrop => write!(f, "AlertAndDrop"),
        }
    }
}

/// Priority of a record when the queue overflows
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum LogPriority {
    /// info, task, debug, trace
    #[default]
    Normal = 0,
    /// warn
    High = 1,
    /// fatal, error, task_error - never dropped
    Critical = 2,
}

impl fmt::Display for LogPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogPriority::Normal => write!(f, "Normal"),
            LogPriority::High => write!(f, "High"),
            LogPriority::Critical => write!(f, "Critical"),
        }
    }
}

/// Callback invoked when records are dropped
///
/// The parameter is the total count of dropped records so far.
pub type OverflowCallback = Arc<dyn Fn(u64) + Send + Sync>;
