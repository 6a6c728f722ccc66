//! Console appender implementation

use crate::core::{
    Appender, LogRecord, RecordFormatter, Result, SeverityLevel, TimeZoneMode,
};
use parking_lot::Mutex;
use std::sync::Arc;

/// In-memory copy of console output
///
/// Cloning shares the underlying buffer, so a clone kept by the caller sees
/// everything the appender writes.
#[derive(Debug, Clone, Default)]
pub struct CaptureBuffer {
    lines: Arc<Mutex<Vec<String>>>,
}

impl CaptureBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    pub fn contents(&self) -> String {
        self.lines.lock().join("\n")
    }

    pub fn len(&self) -> usize {
        self.lines.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lines.lock().clear();
    }

    fn push(&self, line: String) {
        self.lines.lock().push(line);
    }
}

enum ConsoleTarget {
    Std,
    Capture(CaptureBuffer),
}

pub struct ConsoleAppender {
    formatter: RecordFormatter,
    use_colors: bool,
    zone: TimeZoneMode,
    target: ConsoleTarget,
}

impl ConsoleAppender {
    pub fn new(formatter: RecordFormatter) -> Self {
        Self {
            formatter,
            use_colors: true,
            zone: TimeZoneMode::Local,
            target: ConsoleTarget::Std,
        }
    }

    #[must_use]
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    /// Render timestamps in the given clock (local time by default)
    #[must_use]
    pub fn with_time_zone(mut self, zone: TimeZoneMode) -> Self {
        self.zone = zone;
        self
    }

    /// Write into `buffer` instead of stdout/stderr
    ///
    /// # Example
    ///
    /// ```
    /// use core_registry_logger::appenders::{CaptureBuffer, ConsoleAppender};
    /// use core_registry_logger::{Appender, LogRecord, RecordFormatter, SeverityLevel};
    ///
    /// let buffer = CaptureBuffer::new();
    /// let mut console = ConsoleAppender::new(RecordFormatter::new("1.0.0"))
    ///     .with_colors(false)
    ///     .with_capture(buffer.clone());
    ///
    /// console.append(&LogRecord::new(SeverityLevel::Task, "indexing")).unwrap();
    /// assert!(buffer.contents().contains("[1.0.0] [task]: indexing"));
    /// ```
    #[must_use]
    pub fn with_capture(mut self, buffer: CaptureBuffer) -> Self {
        self.target = ConsoleTarget::Capture(buffer);
        self
    }

    pub fn formatter(&self) -> &RecordFormatter {
        &self.formatter
    }
}

impl Appender for ConsoleAppender {
    fn append(&mut self, record: &LogRecord) -> Result<()> {
        let output = self.formatter.human(record, self.zone, self.use_colors);

        match &self.target {
            ConsoleTarget::Capture(buffer) => buffer.push(output),
            // Failures go to stderr, everything else to stdout
            ConsoleTarget::Std => match record.level {
                SeverityLevel::Fatal | SeverityLevel::Error | SeverityLevel::TaskError => {
                    eprintln!("{}", output)
                }
                _ => println!("{}", output),
            },
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        use std::io::Write;
        if let ConsoleTarget::Std = self.target {
            std::io::stdout().flush()?;
            std::io::stderr().flush()?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "console"
    }
}
