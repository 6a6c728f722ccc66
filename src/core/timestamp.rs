//! Timestamp rendering for log output
//!
//! Records carry a UTC instant. How it is printed depends on the sink: file
//! sinks always print UTC so rotated files line up with their dated names,
//! the console prints local wall-clock time.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

/// `2025-01-08 10:30:45`, the layout used across Core Registry logs
pub const REGISTRY_PATTERN: &str = "%Y-%m-%d %H:%M:%S";

/// Clock a timestamp is rendered in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeZoneMode {
    #[default]
    Utc,
    Local,
}

/// Render `datetime` in the registry layout
///
/// # Examples
///
/// ```
/// use core_registry_logger::{format_timestamp, TimeZoneMode};
/// use chrono::{TimeZone, Utc};
///
/// let ts = Utc.with_ymd_and_hms(2025, 1, 8, 10, 30, 45).unwrap();
/// assert_eq!(format_timestamp(&ts, TimeZoneMode::Utc), "2025-01-08 10:30:45");
/// ```
#[must_use]
pub fn format_timestamp(datetime: &DateTime<Utc>, zone: TimeZoneMode) -> String {
    match zone {
        TimeZoneMode::Utc => datetime.format(REGISTRY_PATTERN).to_string(),
        TimeZoneMode::Local => datetime
            .with_timezone(&Local)
            .format(REGISTRY_PATTERN)
            .to_string(),
    }
}
