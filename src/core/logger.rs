//! Registry logger: builds the sink table for a project and routes records

use super::{
    appender::{LevelFilter, Route},
    config::{parse_log_level, validate_project_name, DispatchMode, LoggerOptions},
    error::{LoggerError, Result},
    formatter::RecordFormatter,
    log_level::SeverityLevel,
    log_record::LogRecord,
    metadata::Metadata,
    metrics::LoggerMetrics,
    overflow_policy::{LogPriority, OverflowCallback, OverflowPolicy},
    root::{log_dir_for, ChiaRootResolver, FixedRoot, RootResolver},
    timestamp::TimeZoneMode,
};
use crate::appenders::{
    CaptureBuffer, ConsoleAppender, DailyRotatingFileAppender, JsonFileAppender, RotationPolicy,
};
use crossbeam_channel::{bounded, Receiver, SendError, SendTimeoutError, Sender, TrySendError};
use parking_lot::RwLock;
use std::any::Any;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Default shutdown timeout for logger cleanup (5 seconds)
///
/// Used when the logger is dropped without an explicit `shutdown()`.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Filename pattern of the daily rotating sink
pub const ROTATING_FILE_PATTERN: &str = "application-%DATE%.log";

pub const ERROR_LOG_FILE: &str = "error.log";
pub const COMBINED_LOG_FILE: &str = "combined.log";

const BATCH_SIZE: usize = 64;

enum Command {
    Record(LogRecord),
    /// Flush every sink, then report the number of sinks that failed
    Flush(Sender<usize>),
}

type SharedRoutes = Arc<RwLock<Vec<Route>>>;

/// Logger for one Core Registry project
///
/// Owns a fixed sink table built at construction:
///
/// | Sink | Accepts |
/// |---|---|
/// | console | every record |
/// | `error.log` | `error` and more severe |
/// | `combined.log` | configured level and more severe |
/// | `application-<date>.log` | configured level and more severe |
///
/// # Example
///
/// ```no_run
/// use core_registry_logger::{Metadata, RegistryLogger};
///
/// let logger = RegistryLogger::builder()
///     .project_name("datalayer-storage-uploader")
///     .log_level("info")
///     .package_version(env!("CARGO_PKG_VERSION"))
///     .build()
///     .unwrap();
///
/// logger.info("Uploader started");
/// logger.task_error_with_metadata(
///     "Mirror check failed",
///     Metadata::new().with_field("storeId", "0xabc"),
/// );
/// ```
pub struct RegistryLogger {
    project_name: String,
    log_level: SeverityLevel,
    package_version: String,
    log_dir: PathBuf,
    routes: SharedRoutes,
    mode: DispatchMode,
    sender: Option<Sender<Command>>,
    worker: Option<thread::JoinHandle<()>>,
    metrics: Arc<LoggerMetrics>,
    overflow_policy: OverflowPolicy,
    on_overflow: Option<OverflowCallback>,
}

impl RegistryLogger {
    /// Create a logger with the default root resolver and settings
    ///
    /// # Errors
    ///
    /// Fails on an invalid project name or level, when no root directory can
    /// be resolved, or when the log directory or its files cannot be created.
    pub fn new(options: LoggerOptions) -> Result<Self> {
        Self::builder().options(options).build()
    }

    #[must_use]
    pub fn builder() -> RegistryLoggerBuilder {
        RegistryLoggerBuilder::new()
    }

    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    /// Threshold of the combined and rotating sinks
    pub fn log_level(&self) -> SeverityLevel {
        self.log_level
    }

    pub fn package_version(&self) -> &str {
        &self.package_version
    }

    /// `<root>/core-registry/logs/<project_name>`
    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    pub fn metrics(&self) -> &LoggerMetrics {
        &self.metrics
    }

    pub fn route_names(&self) -> Vec<String> {
        self.routes
            .read()
            .iter()
            .map(|r| r.name().to_string())
            .collect()
    }

    /// Names of the sinks a record at `level` would reach
    pub fn routes_for(&self, level: SeverityLevel) -> Vec<String> {
        self.routes
            .read()
            .iter()
            .filter(|r| r.filter.accepts(level))
            .map(|r| r.name().to_string())
            .collect()
    }

    pub fn log(&self, level: SeverityLevel, message: impl Into<String>) {
        self.emit(level, message.into(), None);
    }

    pub fn log_with_metadata(
        &self,
        level: SeverityLevel,
        message: impl Into<String>,
        metadata: Metadata,
    ) {
        self.emit(level, message.into(), Some(metadata));
    }

    #[inline]
    pub fn fatal(&self, message: impl Into<String>) {
        self.log(SeverityLevel::Fatal, message);
    }

    #[inline]
    pub fn error(&self, message: impl Into<String>) {
        self.log(SeverityLevel::Error, message);
    }

    #[inline]
    pub fn task_error(&self, message: impl Into<String>) {
        self.log(SeverityLevel::TaskError, message);
    }

    #[inline]
    pub fn warn(&self, message: impl Into<String>) {
        self.log(SeverityLevel::Warn, message);
    }

    #[inline]
    pub fn info(&self, message: impl Into<String>) {
        self.log(SeverityLevel::Info, message);
    }

    #[inline]
    pub fn task(&self, message: impl Into<String>) {
        self.log(SeverityLevel::Task, message);
    }

    #[inline]
    pub fn debug(&self, message: impl Into<String>) {
        self.log(SeverityLevel::Debug, message);
    }

    #[inline]
    pub fn trace(&self, message: impl Into<String>) {
        self.log(SeverityLevel::Trace, message);
    }

    pub fn fatal_with_metadata(&self, message: impl Into<String>, metadata: Metadata) {
        self.log_with_metadata(SeverityLevel::Fatal, message, metadata);
    }

    pub fn error_with_metadata(&self, message: impl Into<String>, metadata: Metadata) {
        self.log_with_metadata(SeverityLevel::Error, message, metadata);
    }

    pub fn task_error_with_metadata(&self, message: impl Into<String>, metadata: Metadata) {
        self.log_with_metadata(SeverityLevel::TaskError, message, metadata);
    }

    pub fn warn_with_metadata(&self, message: impl Into<String>, metadata: Metadata) {
        self.log_with_metadata(SeverityLevel::Warn, message, metadata);
    }

    pub fn info_with_metadata(&self, message: impl Into<String>, metadata: Metadata) {
        self.log_with_metadata(SeverityLevel::Info, message, metadata);
    }

    pub fn task_with_metadata(&self, message: impl Into<String>, metadata: Metadata) {
        self.log_with_metadata(SeverityLevel::Task, message, metadata);
    }

    pub fn debug_with_metadata(&self, message: impl Into<String>, metadata: Metadata) {
        self.log_with_metadata(SeverityLevel::Debug, message, metadata);
    }

    pub fn trace_with_metadata(&self, message: impl Into<String>, metadata: Metadata) {
        self.log_with_metadata(SeverityLevel::Trace, message, metadata);
    }

    /// Single entry point behind every per-level method
    fn emit(&self, level: SeverityLevel, message: String, metadata: Option<Metadata>) {
        let mut record = LogRecord::new(level, message);
        if let Some(metadata) = metadata {
            record = record.with_metadata(metadata);
        }
        self.dispatch(record);
    }

    fn dispatch(&self, record: LogRecord) {
        let Some(ref sender) = self.sender else {
            match self.mode {
                DispatchMode::Sync => self.write_through(&record),
                // Worker already stopped
                DispatchMode::Async { .. } => {
                    self.metrics.record_dropped();
                }
            }
            return;
        };

        match sender.try_send(Command::Record(record)) {
            Ok(()) => {}
            Err(TrySendError::Full(Command::Record(record))) => {
                self.handle_overflow(sender, record)
            }
            Err(TrySendError::Full(Command::Flush(_))) => {}
            Err(TrySendError::Disconnected(Command::Record(record))) => {
                self.handle_disconnected(record)
            }
            Err(TrySendError::Disconnected(Command::Flush(_))) => {}
        }
    }

    /// Apply the overflow policy
    ///
    /// Critical records are never dropped: the caller waits for queue space,
    /// which keeps them behind the records it queued earlier.
    fn handle_overflow(&self, sender: &Sender<Command>, record: LogRecord) {
        self.metrics.record_queue_full();

        if record.level.priority() == LogPriority::Critical {
            self.metrics.record_critical_preserved();
            self.metrics.record_block();
            if let Err(SendError(Command::Record(record))) =
                sender.send(Command::Record(record))
            {
                self.handle_disconnected(record);
            }
            return;
        }

        match &self.overflow_policy {
            OverflowPolicy::DropNewest => {
                self.metrics.record_dropped();
            }
            OverflowPolicy::Block => {
                self.metrics.record_block();
                if sender.send(Command::Record(record)).is_err() {
                    self.metrics.record_dropped();
                }
            }
            OverflowPolicy::BlockWithTimeout(timeout) => {
                self.metrics.record_block();
                match sender.send_timeout(Command::Record(record), *timeout) {
                    Ok(()) => {}
                    Err(SendTimeoutError::Timeout(_)) => self.alert_and_drop(),
                    Err(SendTimeoutError::Disconnected(_)) => {
                        self.metrics.record_dropped();
                    }
                }
            }
            OverflowPolicy::AlertAndDrop => self.alert_and_drop(),
        }
    }

    /// The worker is gone; critical records are still written on this thread
    fn handle_disconnected(&self, record: LogRecord) {
        if record.level.priority() == LogPriority::Critical {
            self.write_through(&record);
        } else {
            self.metrics.record_dropped();
        }
    }

    /// Write and flush on the calling thread
    fn write_through(&self, record: &LogRecord) {
        let mut routes = self.routes.write();
        Self::process_record(&mut routes, record, &self.metrics);
        Self::flush_routes(&mut routes, &self.metrics);
    }

    fn alert_and_drop(&self) {
        let dropped_count = self.metrics.record_dropped() + 1;

        // Alert on the first drop and every thousandth after that
        if dropped_count == 1 || dropped_count % 1000 == 0 {
            eprintln!(
                "[LOGGER WARNING] Queue full, {} records dropped for '{}'. \
                 Consider a larger queue or a blocking overflow policy.",
                dropped_count, self.project_name
            );
            if let Some(ref callback) = self.on_overflow {
                callback(dropped_count);
            }
        }
    }

    /// Send one record to every accepting route, isolating panics per route
    ///
    /// A record counts as dropped only when every accepting route failed.
    fn process_record(routes: &mut [Route], record: &LogRecord, metrics: &LoggerMetrics) {
        let mut accepted = 0;
        let mut failed = 0;

        for route in routes.iter_mut().filter(|r| r.filter.accepts(record.level)) {
            accepted += 1;
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                route.appender.append(record)
            }));

            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    eprintln!("[LOGGER ERROR] Sink '{}' failed: {}", route.name(), e);
                    metrics.record_sink_failure();
                    failed += 1;
                }
                Err(panic_info) => {
                    eprintln!(
                        "[LOGGER CRITICAL] Sink '{}' panicked: {}. \
                         Other sinks continue to function.",
                        route.name(),
                        panic_message(panic_info.as_ref())
                    );
                    metrics.record_sink_failure();
                    failed += 1;
                }
            }
        }

        if accepted > 0 && failed == accepted {
            metrics.record_dropped();
        } else {
            metrics.record_logged();
        }
    }

    /// Flush every route, returning how many failed
    fn flush_routes(routes: &mut [Route], metrics: &LoggerMetrics) -> usize {
        let mut failures = 0;
        for route in routes.iter_mut() {
            let result =
                std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| route.appender.flush()));

            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    eprintln!("[LOGGER ERROR] Sink '{}' flush failed: {}", route.name(), e);
                    metrics.record_sink_failure();
                    failures += 1;
                }
                Err(panic_info) => {
                    eprintln!(
                        "[LOGGER CRITICAL] Sink '{}' panicked during flush: {}",
                        route.name(),
                        panic_message(panic_info.as_ref())
                    );
                    metrics.record_sink_failure();
                    failures += 1;
                }
            }
        }
        failures
    }

    fn run_worker(receiver: Receiver<Command>, routes: SharedRoutes, metrics: Arc<LoggerMetrics>) {
        let mut batch = Vec::with_capacity(BATCH_SIZE);

        while let Ok(command) = receiver.recv() {
            batch.push(command);
            while batch.len() < BATCH_SIZE {
                match receiver.try_recv() {
                    Ok(command) => batch.push(command),
                    Err(_) => break,
                }
            }

            let mut table = routes.write();
            for command in batch.drain(..) {
                match command {
                    Command::Record(record) => Self::process_record(&mut table, &record, &metrics),
                    Command::Flush(ack) => {
                        let failures = Self::flush_routes(&mut table, &metrics);
                        let _ = ack.send(failures);
                    }
                }
            }
            // Files stay current after every batch
            Self::flush_routes(&mut table, &metrics);
        }
    }

    /// Block until every record emitted so far has reached its sinks
    ///
    /// # Errors
    ///
    /// Returns an error if a sink failed to flush, or if the worker did not
    /// answer within [`DEFAULT_SHUTDOWN_TIMEOUT`].
    pub fn flush(&self) -> Result<()> {
        let failures = match self.sender {
            Some(ref sender) => {
                let (ack_tx, ack_rx) = bounded(1);
                if sender.send(Command::Flush(ack_tx)).is_err() {
                    return Err(LoggerError::LoggerStopped);
                }
                ack_rx
                    .recv_timeout(DEFAULT_SHUTDOWN_TIMEOUT)
                    .map_err(|_| LoggerError::other("Timed out waiting for the log queue to drain"))?
            }
            None => {
                let mut routes = self.routes.write();
                Self::flush_routes(&mut routes, &self.metrics)
            }
        };

        if failures > 0 {
            return Err(LoggerError::writer(format!(
                "{} sink(s) failed to flush",
                failures
            )));
        }
        Ok(())
    }

    /// Drain the queue, stop the worker and flush every sink
    ///
    /// Returns `true` if everything completed within `timeout`.
    pub fn shutdown(&mut self, timeout: Duration) -> bool {
        let drained = self.stop_worker(timeout);

        let mut routes = self.routes.write();
        let flushed = Self::flush_routes(&mut routes, &self.metrics) == 0;
        drained && flushed
    }

    fn stop_worker(&mut self, timeout: Duration) -> bool {
        // Closing the channel lets the worker drain and exit
        drop(self.sender.take());

        let Some(handle) = self.worker.take() else {
            return true;
        };

        let start = Instant::now();
        loop {
            if handle.is_finished() {
                if let Err(e) = handle.join() {
                    eprintln!(
                        "[LOGGER ERROR] Dispatch worker panicked during shutdown: {}",
                        panic_message(e.as_ref())
                    );
                    return false;
                }
                return true;
            }

            if start.elapsed() >= timeout {
                eprintln!(
                    "[LOGGER WARNING] Dispatch worker did not finish within {:?}. \
                     Some records may be lost.",
                    timeout
                );
                return false;
            }

            thread::sleep(Duration::from_millis(10));
        }
    }
}

impl Drop for RegistryLogger {
    fn drop(&mut self) {
        self.shutdown(DEFAULT_SHUTDOWN_TIMEOUT);

        let dropped = self.metrics.dropped_count();
        if dropped > 0 {
            eprintln!(
                "[LOGGER WARNING] Logger for '{}' shutting down with {} dropped records \
                 (drop rate: {:.2}%)",
                self.project_name,
                dropped,
                self.metrics.drop_rate()
            );
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

/// Builder for [`RegistryLogger`]
///
/// Project name, level and version are required; everything else has the
/// defaults used in production.
///
/// # Example
///
/// ```
/// use core_registry_logger::{RegistryLogger, CaptureBuffer};
///
/// let root = tempfile::tempdir().unwrap();
/// let console = CaptureBuffer::new();
///
/// let logger = RegistryLogger::builder()
///     .project_name("cadt")
///     .log_level("warn")
///     .package_version("1.7.3")
///     .root_dir(root.path())
///     .colors(false)
///     .capture_console(console.clone())
///     .build()
///     .unwrap();
///
/// logger.info("console only");
/// logger.flush().unwrap();
/// assert!(console.contents().contains("console only"));
/// ```
pub struct RegistryLoggerBuilder {
    project_name: Option<String>,
    log_level: Option<String>,
    package_version: Option<String>,
    resolver: Box<dyn RootResolver>,
    use_colors: bool,
    console_zone: TimeZoneMode,
    console_capture: Option<CaptureBuffer>,
    dispatch: DispatchMode,
    overflow_policy: OverflowPolicy,
    on_overflow: Option<OverflowCallback>,
    rotation: RotationPolicy,
}

impl RegistryLoggerBuilder {
    pub fn new() -> Self {
        Self {
            project_name: None,
            log_level: None,
            package_version: None,
            resolver: Box::new(ChiaRootResolver::new()),
            use_colors: true,
            console_zone: TimeZoneMode::Local,
            console_capture: None,
            dispatch: DispatchMode::default(),
            overflow_policy: OverflowPolicy::default(),
            on_overflow: None,
            rotation: RotationPolicy::default(),
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn options(self, options: LoggerOptions) -> Self {
        self.project_name(options.project_name)
            .log_level(options.log_level)
            .package_version(options.package_version)
    }

    #[must_use = "builder methods return a new value"]
    pub fn project_name(mut self, name: impl Into<String>) -> Self {
        self.project_name = Some(name.into());
        self
    }

    /// Threshold name for the combined and rotating sinks
    #[must_use = "builder methods return a new value"]
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = Some(level.into());
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn min_level(self, level: SeverityLevel) -> Self {
        self.log_level(level.to_str())
    }

    #[must_use = "builder methods return a new value"]
    pub fn package_version(mut self, version: impl Into<String>) -> Self {
        self.package_version = Some(version.into());
        self
    }

    /// Use `root` instead of resolving the Chia root
    #[must_use = "builder methods return a new value"]
    pub fn root_dir(self, root: impl Into<PathBuf>) -> Self {
        self.root_resolver(FixedRoot::new(root))
    }

    #[must_use = "builder methods return a new value"]
    pub fn root_resolver<R: RootResolver + 'static>(mut self, resolver: R) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn colors(mut self, enabled: bool) -> Self {
        self.use_colors = enabled;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn console_time_zone(mut self, zone: TimeZoneMode) -> Self {
        self.console_zone = zone;
        self
    }

    /// Send console output to `buffer` instead of stdout/stderr
    #[must_use = "builder methods return a new value"]
    pub fn capture_console(mut self, buffer: CaptureBuffer) -> Self {
        self.console_capture = Some(buffer);
        self
    }

    /// Write records on the calling thread
    #[must_use = "builder methods return a new value"]
    pub fn synchronous(mut self) -> Self {
        self.dispatch = DispatchMode::Sync;
        self
    }

    /// Queue records for a worker thread (the default)
    #[must_use = "builder methods return a new value"]
    pub fn async_mode(mut self, capacity: usize) -> Self {
        self.dispatch = DispatchMode::Async { capacity };
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.overflow_policy = policy;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn on_overflow(mut self, callback: OverflowCallback) -> Self {
        self.on_overflow = Some(callback);
        self
    }

    /// Size cap of rotating segments; `None` rotates by date only
    #[must_use = "builder methods return a new value"]
    pub fn max_segment_size(mut self, max_size: Option<u64>) -> Self {
        self.rotation = self.rotation.with_max_size(max_size);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn compress_segments(mut self, enabled: bool) -> Self {
        self.rotation = self.rotation.with_compression(enabled);
        self
    }

    /// Validate, create the log directory, open every sink and start the
    /// dispatch worker
    pub fn build(self) -> Result<RegistryLogger> {
        let project_name = self
            .project_name
            .ok_or_else(|| LoggerError::config("project_name", "is required"))?;
        validate_project_name(&project_name)?;

        let log_level = self
            .log_level
            .ok_or_else(|| LoggerError::config("log_level", "is required"))
            .and_then(|level| parse_log_level(&level))?;

        let package_version = self
            .package_version
            .ok_or_else(|| LoggerError::config("package_version", "is required"))?;

        if let DispatchMode::Async { capacity: 0 } = self.dispatch {
            return Err(LoggerError::config(
                "dispatch",
                "async queue capacity must be greater than zero",
            ));
        }

        let root = self.resolver.resolve()?;
        let log_dir = log_dir_for(&root, &project_name);
        fs::create_dir_all(&log_dir).map_err(|e| LoggerError::log_directory(&log_dir, e))?;

        let formatter = RecordFormatter::new(package_version.clone());

        let mut console = ConsoleAppender::new(formatter.clone())
            .with_colors(self.use_colors)
            .with_time_zone(self.console_zone);
        if let Some(buffer) = self.console_capture {
            console = console.with_capture(buffer);
        }

        let routes = vec![
            Route::new(LevelFilter::All, console),
            Route::new(
                LevelFilter::AtMost(SeverityLevel::Error),
                JsonFileAppender::new("error-file", log_dir.join(ERROR_LOG_FILE), formatter.clone())?,
            ),
            Route::new(
                LevelFilter::AtMost(log_level),
                JsonFileAppender::new(
                    "combined-file",
                    log_dir.join(COMBINED_LOG_FILE),
                    formatter.clone(),
                )?,
            ),
            Route::new(
                LevelFilter::AtMost(log_level),
                DailyRotatingFileAppender::new(
                    log_dir.clone(),
                    ROTATING_FILE_PATTERN,
                    self.rotation,
                    formatter,
                )?,
            ),
        ];
        let routes: SharedRoutes = Arc::new(RwLock::new(routes));
        let metrics = Arc::new(LoggerMetrics::new());

        let (sender, worker) = match self.dispatch {
            DispatchMode::Sync => (None, None),
            DispatchMode::Async { capacity } => {
                let (sender, receiver) = bounded(capacity);
                let worker_routes = Arc::clone(&routes);
                let worker_metrics = Arc::clone(&metrics);
                let handle = thread::Builder::new()
                    .name(format!("registry-log-{}", project_name))
                    .spawn(move || {
                        RegistryLogger::run_worker(receiver, worker_routes, worker_metrics)
                    })
                    .map_err(|e| {
                        LoggerError::io_operation("starting log worker", "spawn failed", e)
                    })?;
                (Some(sender), Some(handle))
            }
        };

        Ok(RegistryLogger {
            project_name,
            log_level,
            package_version,
            log_dir,
            routes,
            mode: self.dispatch,
            sender,
            worker,
            metrics,
            overflow_policy: self.overflow_policy,
            on_overflow: self.on_overflow,
        })
    }
}

impl Default for RegistryLoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
