//! Core logger types and traits

pub mod appender;
pub mod config;
pub mod error;
pub mod formatter;
pub mod log_level;
pub mod log_record;
pub mod logger;
pub mod metadata;
pub mod metrics;
pub mod overflow_policy;
pub mod root;
pub mod timestamp;

pub use appender::{Appender, LevelFilter, Route};
pub use config::{DispatchMode, LoggerOptions, DEFAULT_QUEUE_CAPACITY};
pub use error::{LoggerError, Result};
pub use formatter::RecordFormatter;
pub use log_level::SeverityLevel;
pub use log_record::LogRecord;
pub use logger::{
    RegistryLogger, RegistryLoggerBuilder, COMBINED_LOG_FILE, DEFAULT_SHUTDOWN_TIMEOUT,
    ERROR_LOG_FILE, ROTATING_FILE_PATTERN,
};
pub use metadata::{FieldValue, Metadata, RESERVED_KEYS};
pub use metrics::LoggerMetrics;
pub use overflow_policy::{LogPriority, OverflowCallback, OverflowPolicy};
pub use root::{log_dir_for, ChiaRootResolver, FixedRoot, RootResolver, CHIA_ROOT_ENV};
pub use timestamp::{format_timestamp, TimeZoneMode, REGISTRY_PATTERN};
