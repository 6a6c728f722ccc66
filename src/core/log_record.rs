//! Log record produced at each call site

use super::log_level::SeverityLevel;
use super::metadata::Metadata;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One emitted log record
///
/// Built synchronously by the emitting call and never mutated once handed
/// to the router. The metadata bag never holds the reserved keys
/// (`message`, `level`, `timestamp`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub level: SeverityLevel,
    pub message: String,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
}

impl LogRecord {
    pub fn new(level: SeverityLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            message: message.into(),
            metadata: Metadata::new(),
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata.without_reserved();
        self
    }

    /// Override the wall-clock stamp, mostly useful for replay and tests
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_record_defaults() {
        let before = Utc::now();
        let record = LogRecord::new(SeverityLevel::Task, "sync started");

        assert_eq!(record.level, SeverityLevel::Task);
        assert_eq!(record.message, "sync started");
        assert!(record.metadata.is_empty());
        assert!(record.timestamp >= before);
    }

    #[test]
    fn test_reserved_keys_are_stripped() {
        let metadata = Metadata::new()
            .with_field("level", "fatal")
            .with_field("storeId", "abc");
        let record = LogRecord::new(SeverityLevel::Info, "ok").with_metadata(metadata);

        assert_eq!(record.level, SeverityLevel::Info);
        assert!(record.metadata.get("level").is_none());
        assert!(record.metadata.get("storeId").is_some());
    }

    #[test]
    fn test_with_timestamp() {
        let ts = Utc.with_ymd_and_hms(2025, 1, 8, 10, 30, 45).unwrap();
        let record = LogRecord::new(SeverityLevel::Debug, "x").with_timestamp(ts);
        assert_eq!(record.timestamp, ts);
    }
}
