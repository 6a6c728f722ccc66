//! # Core Registry Logger
//!
//! Shared logging for Core Registry services. Every service creates one
//! [`RegistryLogger`] from its project name, log level and package version,
//! and gets the same set of outputs:
//!
//! - a colorized console line per record
//! - `error.log` with every `error` and `fatal` record
//! - `combined.log` with everything at or above the configured level
//! - `application-<date>.log`, rotated daily and by size, gzipped when closed
//!
//! Files live under `<root>/core-registry/logs/<project>`, where the root is
//! `CHIA_ROOT` or `~/.chia/mainnet`.
//!
//! ## Severity
//!
//! `fatal > error > task_error > warn > info > task > debug > trace`. A
//! threshold admits itself and everything more severe.
//!
//! ```no_run
//! use core_registry_logger::{metadata, LoggerOptions, RegistryLogger};
//!
//! let logger = RegistryLogger::new(LoggerOptions::new("cadt", "info", "1.7.3")).unwrap();
//! logger.info("Started");
//! logger.warn_with_metadata("Peer slow", metadata! { "peer" => "10.0.0.4", "ms" => 870 });
//! ```

pub mod appenders;
pub mod core;
pub mod macros;

pub mod prelude {
    pub use crate::appenders::{CaptureBuffer, ConsoleAppender};
    pub use crate::core::{
        Appender, FieldValue, LevelFilter, LogRecord, LoggerError, LoggerMetrics,
        LoggerOptions, Metadata, OverflowPolicy, RegistryLogger, RegistryLoggerBuilder, Result,
        SeverityLevel, DEFAULT_SHUTDOWN_TIMEOUT,
    };
}

pub use appenders::{
    CaptureBuffer, ConsoleAppender, DailyRotatingFileAppender, JsonFileAppender, RotationPolicy,
};
pub use core::{
    format_timestamp, log_dir_for, Appender, ChiaRootResolver, DispatchMode, FieldValue, FixedRoot, LevelFilter,
    LogPriority, LogRecord, LoggerError, LoggerMetrics, LoggerOptions, Metadata,
    OverflowCallback, OverflowPolicy, RecordFormatter, RegistryLogger, RegistryLoggerBuilder,
    Result, RootResolver, Route, SeverityLevel, TimeZoneMode,
    DEFAULT_SHUTDOWN_TIMEOUT,
};
