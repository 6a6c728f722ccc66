//! Logging macros for ergonomic log message formatting.
//!
//! These macros format their arguments like `format!` and hand the result to
//! a [`RegistryLogger`](crate::RegistryLogger).
//!
//! # Examples
//!
//! ```
//! use core_registry_logger::{info, task_error, RegistryLogger, CaptureBuffer};
//!
//! # let root = tempfile::tempdir().unwrap();
//! let logger = RegistryLogger::builder()
//!     .project_name("cadt")
//!     .log_level("info")
//!     .package_version("1.7.3")
//! #   .root_dir(root.path())
//! #   .capture_console(CaptureBuffer::new())
//!     .build()
//!     .unwrap();
//!
//! info!(logger, "Server started");
//!
//! let port = 31310;
//! info!(logger, "Server listening on port {}", port);
//!
//! let store = "0xabc";
//! task_error!(logger, "Sync of store {} failed after {} attempts", store, 3);
//! ```

/// Log a formatted message at an explicit level.
///
/// # Examples
///
/// ```
/// # use core_registry_logger::{RegistryLogger, CaptureBuffer, SeverityLevel};
/// # let root = tempfile::tempdir().unwrap();
/// # let logger = RegistryLogger::builder().project_name("docs").log_level("trace")
/// #     .package_version("1").root_dir(root.path())
/// #     .capture_console(CaptureBuffer::new()).build().unwrap();
/// use core_registry_logger::log;
/// log!(logger, SeverityLevel::Info, "Simple message");
/// log!(logger, SeverityLevel::TaskError, "Job exited with code {}", 2);
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, $($arg:tt)+) => {
        $logger.log($level, format!($($arg)+))
    };
}

#[macro_export]
macro_rules! trace {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::SeverityLevel::Trace, $($arg)+)
    };
}

#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::SeverityLevel::Debug, $($arg)+)
    };
}

/// Log a task-level message, used for progress of scheduled jobs.
#[macro_export]
macro_rules! task {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::SeverityLevel::Task, $($arg)+)
    };
}

#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::SeverityLevel::Info, $($arg)+)
    };
}

#[macro_export]
macro_rules! warn {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::SeverityLevel::Warn, $($arg)+)
    };
}

/// Log a task-error message: a scheduled job failed but the process goes on.
#[macro_export]
macro_rules! task_error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::SeverityLevel::TaskError, $($arg)+)
    };
}

#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::SeverityLevel::Error, $($arg)+)
    };
}

#[macro_export]
macro_rules! fatal {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::SeverityLevel::Fatal, $($arg)+)
    };
}

/// Build a [`Metadata`](crate::Metadata) from `key => value` pairs.
///
/// # Examples
///
/// ```
/// use core_registry_logger::{metadata, FieldValue};
///
/// let md = metadata! {
///     "storeId" => "0xabc",
///     "generation" => 12,
///     "mirrored" => true,
/// };
/// assert_eq!(md.len(), 3);
/// assert_eq!(md.get("generation"), Some(&FieldValue::Int(12)));
/// ```
#[macro_export]
macro_rules! metadata {
    () => {
        $crate::Metadata::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut metadata = $crate::Metadata::new();
        $( metadata.add_field($key, $value); )+
        metadata
    }};
}
