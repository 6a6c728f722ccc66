//! Construction parameters for a registry logger

use super::error::{LoggerError, Result};
use super::log_level::SeverityLevel;
use serde::{Deserialize, Serialize};

/// Default capacity of the async dispatch queue
pub const DEFAULT_QUEUE_CAPACITY: usize = 8192;

/// The three values every Core Registry service passes when creating its
/// logger
///
/// Keys use the camelCase spelling found in service configuration files.
///
/// # Example
///
/// ```
/// use core_registry_logger::LoggerOptions;
///
/// let options = LoggerOptions::from_json(
///     r#"{"projectName":"datalayer-storage-uploader","logLevel":"info","packageVersion":"1.2.0"}"#,
/// )
/// .unwrap();
/// assert_eq!(options.project_name, "datalayer-storage-uploader");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggerOptions {
    pub project_name: String,
    /// Kept as text so an unknown level fails at construction with a clear
    /// message instead of at deserialization
    pub log_level: String,
    pub package_version: String,
}

impl LoggerOptions {
    pub fn new(
        project_name: impl Into<String>,
        log_level: impl Into<String>,
        package_version: impl Into<String>,
    ) -> Self {
        Self {
            project_name: project_name.into(),
            log_level: log_level.into(),
            package_version: package_version.into(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Check every field, returning the parsed threshold
    pub fn validate(&self) -> Result<SeverityLevel> {
        validate_project_name(&self.project_name)?;
        parse_log_level(&self.log_level)
    }
}

/// Parse a threshold name, mapping failures to a configuration error
pub fn parse_log_level(value: &str) -> Result<SeverityLevel> {
    value.parse::<SeverityLevel>().map_err(|_| {
        LoggerError::config(
            "log_level",
            format!(
                "unknown level '{}', expected one of: {}",
                value,
                SeverityLevel::ALL
                    .iter()
                    .map(|l| l.to_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        )
    })
}

/// A project name becomes a single directory component under the log root
pub fn validate_project_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(LoggerError::config("project_name", "must not be empty"));
    }
    if name == "." || name == ".." {
        return Err(LoggerError::config(
            "project_name",
            format!("'{}' is not a valid directory name", name),
        ));
    }
    if name.contains(['/', '\\', '\0']) {
        return Err(LoggerError::config(
            "project_name",
            format!("'{}' must not contain path separators", name),
        ));
    }
    Ok(())
}

/// How emitted records reach the sinks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Write inline on the calling thread
    Sync,
    /// Queue for a background worker thread
    Async { capacity: usize },
}

impl Default for DispatchMode {
    fn default() -> Self {
        DispatchMode::Async {
            capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}
