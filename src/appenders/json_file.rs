//! Append-only JSON-lines file appender
//!
//! Backs the `error.log` and `combined.log` sinks. Each record is written as
//! one line of flat JSON with a UTC timestamp.

use crate::core::{Appender, LogRecord, LoggerError, RecordFormatter, Result};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub struct JsonFileAppender {
    name: String,
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    formatter: RecordFormatter,
}

impl JsonFileAppender {
    /// Open (or create) `path` for appending
    ///
    /// # Errors
    ///
    /// Returns `FileAppenderError` if the file cannot be opened
    pub fn new(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        formatter: RecordFormatter,
    ) -> Result<Self> {
        let path = path.into();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                LoggerError::file_appender(path.display().to_string(), format!("Failed to open: {}", e))
            })?;

        Ok(Self {
            name: name.into(),
            path,
            writer: Some(BufWriter::new(file)),
            formatter,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Appender for JsonFileAppender {
    fn append(&mut self, record: &LogRecord) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| LoggerError::writer("File writer not initialized"))?;

        let mut line = self.formatter.structured_line(record)?;
        line.push('\n');

        writer.write_all(line.as_bytes()).map_err(|e| {
            LoggerError::file_appender(
                self.path.display().to_string(),
                format!("Failed to write log record: {}", e),
            )
        })?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(ref mut writer) = self.writer {
            writer.flush().map_err(|e| {
                LoggerError::file_appender(
                    self.path.display().to_string(),
                    format!("Failed to flush: {}", e),
                )
            })?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for JsonFileAppender {
    fn drop(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            let _ = writer.flush();
        }
    }
}
