//! Rendering of log records
//!
//! Formatting is pure and independent of dispatch. A record can be rendered
//! in three shapes:
//! - human: `<timestamp> [<version>] [<level>]: <message> <metadata-json>`
//! - structured: flat JSON, metadata merged at the top level (file sinks)
//! - inspection: JSON with metadata nested under `metadata`
//!
//! Reserved keys (`timestamp`, `level`, `message`) always come from the
//! record, never from metadata.

use super::error::Result;
use super::log_record::LogRecord;
use super::timestamp::{format_timestamp, TimeZoneMode};
use colored::Colorize;
use serde_json::{Map, Value};

#[derive(Debug, Clone)]
pub struct RecordFormatter {
    package_version: String,
}

impl RecordFormatter {
    pub fn new(package_version: impl Into<String>) -> Self {
        Self {
            package_version: package_version.into(),
        }
    }

    pub fn package_version(&self) -> &str {
        &self.package_version
    }

    /// Human-readable line
    ///
    /// # Examples
    ///
    /// ```
    /// use core_registry_logger::{LogRecord, Metadata, RecordFormatter, SeverityLevel, TimeZoneMode};
    /// use chrono::{TimeZone, Utc};
    ///
    /// let record = LogRecord::new(SeverityLevel::Info, "store synced")
    ///     .with_timestamp(Utc.with_ymd_and_hms(2025, 1, 8, 10, 30, 45).unwrap())
    ///     .with_metadata(Metadata::new().with_field("storeId", "abc"));
    ///
    /// let line = RecordFormatter::new("1.4.2").human(&record, TimeZoneMode::Utc, false);
    /// assert_eq!(line, r#"2025-01-08 10:30:45 [1.4.2] [info]: store synced {"storeId":"abc"}"#);
    /// ```
    pub fn human(&self, record: &LogRecord, zone: TimeZoneMode, use_colors: bool) -> String {
        let timestamp = format_timestamp(&record.timestamp, zone);

        let level = if use_colors {
            record
                .level
                .to_str()
                .color(record.level.color_code())
                .to_string()
        } else {
            record.level.to_str().to_string()
        };

        let metadata = if record.metadata.is_empty() {
            String::new()
        } else {
            record.metadata.to_json_string()
        };

        format!(
            "{} [{}] [{}]: {} {}",
            timestamp,
            self.package_version,
            level,
            escape_control(&record.message),
            metadata
        )
    }

    /// Flat JSON object written by the file sinks
    pub fn structured(&self, record: &LogRecord, zone: TimeZoneMode) -> Value {
        let mut json_obj = record.metadata.to_json_map();
        Self::insert_reserved(&mut json_obj, record, zone);
        Value::Object(json_obj)
    }

    /// Single-line JSON in UTC, as persisted to disk
    pub fn structured_line(&self, record: &LogRecord) -> Result<String> {
        Ok(serde_json::to_string(
            &self.structured(record, TimeZoneMode::Utc),
        )?)
    }

    /// JSON view with the metadata bag nested under `metadata`
    pub fn inspect(&self, record: &LogRecord, zone: TimeZoneMode) -> Value {
        let mut json_obj = Map::new();
        Self::insert_reserved(&mut json_obj, record, zone);
        json_obj.insert(
            "metadata".to_string(),
            Value::Object(record.metadata.to_json_map()),
        );
        Value::Object(json_obj)
    }

    fn insert_reserved(json_obj: &mut Map<String, Value>, record: &LogRecord, zone: TimeZoneMode) {
        json_obj.insert(
            "timestamp".to_string(),
            Value::String(format_timestamp(&record.timestamp, zone)),
        );
        json_obj.insert(
            "level".to_string(),
            Value::String(record.level.to_str().to_string()),
        );
        json_obj.insert("message".to_string(), Value::String(record.message.clone()));
    }
}

/// Escape line breaks and tabs so one record stays on one console line
fn escape_control(message: &str) -> String {
    message
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}
