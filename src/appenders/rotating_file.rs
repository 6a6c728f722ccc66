//! Daily rotating file appender
//!
//! Writes JSON lines into dated segments named after a filename pattern such
//! as `application-%DATE%.log`. A segment closes when the UTC calendar day of
//! the incoming record changes or when the size cap would be exceeded. Closed
//! segments are gzip-compressed in place.
//!
//! Segment names within one day:
//!
//! ```text
//! application-2025-01-08.log
//! application-2025-01-08.log.1
//! application-2025-01-08.log.2
//! ```

use crate::core::appender::Appender;
use crate::core::error::{LoggerError, Result};
use crate::core::formatter::RecordFormatter;
use crate::core::log_record::LogRecord;
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Utc};
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Placeholder replaced by the segment date in a filename pattern
pub const DATE_PLACEHOLDER: &str = "%DATE%";

/// Size cap of one segment (20 MB)
pub const DEFAULT_MAX_SEGMENT_SIZE: u64 = 20 * 1024 * 1024;

/// When and how segments are closed
///
/// # Examples
///
/// ```
/// use core_registry_logger::appenders::RotationPolicy;
///
/// let policy = RotationPolicy::new()
///     .with_max_size(Some(5 * 1024 * 1024))
///     .with_compression(false);
/// assert_eq!(policy.max_size, Some(5 * 1024 * 1024));
/// assert_eq!(policy.date_pattern, "%Y-%m-%d");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationPolicy {
    /// strftime pattern for the date part of segment names, evaluated in UTC
    pub date_pattern: String,
    /// Largest size a segment may reach; `None` disables size rotation
    pub max_size: Option<u64>,
    /// Gzip segments once they are closed
    pub compress: bool,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            date_pattern: "%Y-%m-%d".to_string(),
            max_size: Some(DEFAULT_MAX_SEGMENT_SIZE),
            compress: true,
        }
    }
}

impl RotationPolicy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_date_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.date_pattern = pattern.into();
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_size(mut self, max_size: Option<u64>) -> Self {
        self.max_size = max_size;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.compress = enabled;
        self
    }
}

/// Currently open segment
struct Segment {
    date_key: String,
    index: u32,
    path: PathBuf,
    writer: BufWriter<File>,
    size: u64,
    /// Newest record timestamp written to this segment
    newest: Option<DateTime<Utc>>,
}

/// Rotating file appender keyed on the UTC date of each record
///
/// # Examples
///
/// ```no_run
/// use core_registry_logger::appenders::{DailyRotatingFileAppender, RotationPolicy};
/// use core_registry_logger::RecordFormatter;
///
/// let appender = DailyRotatingFileAppender::new(
///     "/var/log/registry",
///     "application-%DATE%.log",
///     RotationPolicy::default(),
///     RecordFormatter::new("1.0.0"),
/// )
/// .unwrap();
/// ```
pub struct DailyRotatingFileAppender {
    dir: PathBuf,
    prefix: String,
    suffix: String,
    policy: RotationPolicy,
    formatter: RecordFormatter,
    current: Option<Segment>,
}

impl DailyRotatingFileAppender {
    /// Create the appender and open today's segment
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` for a pattern without exactly one
    /// `%DATE%` or an unusable date pattern, and a file error if the segment
    /// cannot be opened.
    pub fn new(
        dir: impl Into<PathBuf>,
        filename_pattern: &str,
        policy: RotationPolicy,
        formatter: RecordFormatter,
    ) -> Result<Self> {
        let (prefix, suffix) = split_pattern(filename_pattern)?;
        validate_date_pattern(&policy.date_pattern)?;
        if policy.max_size == Some(0) {
            return Err(LoggerError::config(
                "RotationPolicy",
                "max_size must be greater than zero",
            ));
        }

        let mut appender = Self {
            dir: dir.into(),
            prefix,
            suffix,
            policy,
            formatter,
            current: None,
        };

        let today = appender.date_key(&Utc::now());
        appender.current = Some(appender.open_segment(&today)?);
        Ok(appender)
    }

    /// Path of the segment with the given date key and index
    pub fn segment_path(&self, date_key: &str, index: u32) -> PathBuf {
        let base = format!("{}{}{}", self.prefix, date_key, self.suffix);
        let name = if index == 0 {
            base
        } else {
            format!("{}.{}", base, index)
        };
        self.dir.join(name)
    }

    #[must_use]
    pub fn current_path(&self) -> Option<&Path> {
        self.current.as_ref().map(|s| s.path.as_path())
    }

    #[must_use]
    pub fn current_size(&self) -> u64 {
        self.current.as_ref().map_or(0, |s| s.size)
    }

    #[must_use]
    pub fn policy(&self) -> &RotationPolicy {
        &self.policy
    }

    fn date_key(&self, timestamp: &DateTime<Utc>) -> String {
        timestamp.format(&self.policy.date_pattern).to_string()
    }

    /// Open the newest segment for `date_key`, resuming it if it is still plain
    fn open_segment(&self, date_key: &str) -> Result<Segment> {
        let mut index = 0;
        let mut resumable = None;
        loop {
            let path = self.segment_path(date_key, index);
            let gz = gz_path(&path);
            if path.exists() {
                resumable = Some(index);
            } else if gz.exists() {
                resumable = None;
            } else {
                break;
            }
            index += 1;
        }
        // `index` is now the first unused slot
        let index = resumable.unwrap_or(index);
        self.open_at(date_key, index)
    }

    fn open_at(&self, date_key: &str, index: u32) -> Result<Segment> {
        let path = self.segment_path(date_key, index);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                LoggerError::file_appender(path.display().to_string(), format!("Failed to open: {}", e))
            })?;

        let size = file
            .metadata()
            .map_err(|e| {
                LoggerError::file_appender(
                    path.display().to_string(),
                    format!("Cannot access file metadata: {}", e),
                )
            })?
            .len();

        Ok(Segment {
            date_key: date_key.to_string(),
            index,
            path,
            writer: BufWriter::new(file),
            size,
            newest: None,
        })
    }

    fn needs_rotation(&self, segment: &Segment, date_key: &str, incoming: u64) -> bool {
        if segment.date_key != date_key {
            return true;
        }
        match self.policy.max_size {
            // An empty segment always takes at least one record
            Some(max) => segment.size > 0 && segment.size + incoming > max,
            None => false,
        }
    }

    /// Close the current segment and open the one `date_key` calls for
    fn rotate(&mut self, date_key: &str) -> Result<()> {
        let Some(mut segment) = self.current.take() else {
            self.current = Some(self.open_segment(date_key)?);
            return Ok(());
        };

        if let Err(e) = segment.writer.flush() {
            let err = LoggerError::file_rotation(
                segment.path.display().to_string(),
                format!("Failed to flush before rotation: {}", e),
            );
            self.current = Some(segment);
            return Err(err);
        }

        let next = if segment.date_key == date_key {
            self.open_at(date_key, segment.index + 1)
        } else {
            self.open_segment(date_key)
        };
        let next = match next {
            Ok(next) => next,
            Err(e) => {
                // The old segment stays current
                self.current = Some(segment);
                return Err(e);
            }
        };

        let Segment {
            path: closed_path,
            size: closed_size,
            writer,
            ..
        } = segment;
        // Release the old handle before touching the file
        drop(writer);
        self.current = Some(next);

        if closed_size == 0 {
            let _ = fs::remove_file(&closed_path);
        } else if self.policy.compress {
            if let Err(e) = compress_file(&closed_path) {
                eprintln!(
                    "[LOGGER WARNING] Failed to compress closed segment {}: {}",
                    closed_path.display(),
                    e
                );
            }
        }
        Ok(())
    }
}

impl Appender for DailyRotatingFileAppender {
    fn name(&self) -> &str {
        "rotating-file"
    }

    fn append(&mut self, record: &LogRecord) -> Result<()> {
        let mut line = self.formatter.structured_line(record)?;
        line.push('\n');
        let incoming = line.len() as u64;
        let mut date_key = self.date_key(&record.timestamp);

        if let Some(segment) = &self.current {
            let late = segment
                .newest
                .is_some_and(|newest| record.timestamp < newest);
            // A late record from an earlier day stays in the current segment
            if late && segment.date_key != date_key {
                date_key = segment.date_key.clone();
            }
        }

        let rotate = match &self.current {
            Some(segment) => self.needs_rotation(segment, &date_key, incoming),
            None => true,
        };
        if rotate {
            if let Err(e) = self.rotate(&date_key) {
                eprintln!(
                    "[LOGGER WARNING] Log rotation failed: {}. Continuing with current segment.",
                    e
                );
            }
        }

        let segment = self
            .current
            .as_mut()
            .ok_or_else(|| LoggerError::writer("No open segment for rotating file"))?;

        segment.writer.write_all(line.as_bytes()).map_err(|e| {
            LoggerError::file_appender(
                segment.path.display().to_string(),
                format!("Failed to write log record: {}", e),
            )
        })?;
        segment.size += incoming;
        segment.newest = Some(
            segment
                .newest
                .map_or(record.timestamp, |newest| newest.max(record.timestamp)),
        );
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(ref mut segment) = self.current {
            segment.writer.flush().map_err(|e| {
                LoggerError::file_appender(
                    segment.path.display().to_string(),
                    format!("Failed to flush: {}", e),
                )
            })?;
        }
        Ok(())
    }
}

impl Drop for DailyRotatingFileAppender {
    fn drop(&mut self) {
        if let Some(mut segment) = self.current.take() {
            let _ = segment.writer.flush();
        }
    }
}

fn split_pattern(pattern: &str) -> Result<(String, String)> {
    if pattern.matches(DATE_PLACEHOLDER).count() != 1 {
        return Err(LoggerError::config(
            "DailyRotatingFileAppender",
            format!(
                "filename pattern '{}' must contain {} exactly once",
                pattern, DATE_PLACEHOLDER
            ),
        ));
    }
    if pattern.contains('/') || pattern.contains('\\') {
        return Err(LoggerError::config(
            "DailyRotatingFileAppender",
            format!("filename pattern '{}' must be a bare file name", pattern),
        ));
    }
    let (prefix, suffix) = pattern
        .split_once(DATE_PLACEHOLDER)
        .unwrap_or((pattern, ""));
    Ok((prefix.to_string(), suffix.to_string()))
}

/// Reject strftime patterns chrono cannot render, or whose output could not
/// be part of a file name
fn validate_date_pattern(pattern: &str) -> Result<()> {
    use std::fmt::Write as _;

    if StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error)) {
        return Err(LoggerError::config(
            "RotationPolicy",
            format!("invalid date pattern '{}'", pattern),
        ));
    }

    let mut rendered = String::new();
    if write!(rendered, "{}", Utc::now().format(pattern)).is_err() {
        return Err(LoggerError::config(
            "RotationPolicy",
            format!("date pattern '{}' cannot be rendered", pattern),
        ));
    }
    if rendered.is_empty() || rendered.contains(['/', '\\']) {
        return Err(LoggerError::config(
            "RotationPolicy",
            format!("date pattern '{}' must render to a non-empty file name part", pattern),
        ));
    }
    Ok(())
}

/// `<path>.gz`
pub fn gz_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".gz");
    PathBuf::from(name)
}

/// Gzip `path` into `<path>.gz`, removing the original only on success
///
/// Streams through a temporary file so a failed compression never leaves a
/// truncated archive under the final name.
fn compress_file(path: &Path) -> Result<()> {
    use std::io::{BufReader, Read};

    let gz = gz_path(path);
    let mut temp_name = OsString::from(gz.as_os_str());
    temp_name.push(".tmp");
    let temp_gz = PathBuf::from(temp_name);

    let input = File::open(path).map_err(|e| {
        LoggerError::io_operation(
            "compress log segment",
            format!("Failed to open file for compression: {}", path.display()),
            e,
        )
    })?;
    let mut reader = BufReader::with_capacity(64 * 1024, input);

    let output = File::create(&temp_gz).map_err(|e| {
        LoggerError::io_operation(
            "compress log segment",
            format!("Failed to create temporary file: {}", temp_gz.display()),
            e,
        )
    })?;
    let mut encoder = flate2::write::GzEncoder::new(
        BufWriter::with_capacity(64 * 1024, output),
        flate2::Compression::default(),
    );

    let mut buffer = vec![0u8; 64 * 1024];
    loop {
        let bytes_read = reader.read(&mut buffer).map_err(|e| {
            let _ = fs::remove_file(&temp_gz);
            LoggerError::io_operation(
                "compress log segment",
                format!("Failed to read from file: {}", path.display()),
                e,
            )
        })?;
        if bytes_read == 0 {
            break;
        }
        encoder.write_all(&buffer[..bytes_read]).map_err(|e| {
            let _ = fs::remove_file(&temp_gz);
            LoggerError::io_operation("compress log segment", "Failed to compress data chunk", e)
        })?;
    }

    encoder
        .finish()
        .and_then(|mut w| w.flush())
        .map_err(|e| {
            let _ = fs::remove_file(&temp_gz);
            LoggerError::io_operation("compress log segment", "Failed to finish compression", e)
        })?;

    fs::rename(&temp_gz, &gz).map_err(|e| {
        let _ = fs::remove_file(&temp_gz);
        LoggerError::io_operation(
            "compress log segment",
            format!("Failed to rename compressed file to: {}", gz.display()),
            e,
        )
    })?;

    if let Err(e) = fs::remove_file(path) {
        eprintln!(
            "[LOGGER WARNING] Compressed {} but could not remove the original: {}",
            path.display(),
            e
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SeverityLevel;
    use chrono::{DateTime, TimeZone, Utc};
    use flate2::read::GzDecoder;
    use std::io::Read;
    use tempfile::tempdir;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, day, hour, 0, 0).unwrap()
    }

    fn appender(dir: &Path, policy: RotationPolicy) -> DailyRotatingFileAppender {
        DailyRotatingFileAppender::new(
            dir,
            "application-%DATE%.log",
            policy,
            RecordFormatter::new("1.0.0"),
        )
        .unwrap()
    }

    fn record_at(ts: DateTime<Utc>, message: &str) -> LogRecord {
        LogRecord::new(SeverityLevel::Info, message).with_timestamp(ts)
    }

    fn gunzip(path: &Path) -> String {
        let mut out = String::new();
        GzDecoder::new(File::open(path).unwrap())
            .read_to_string(&mut out)
            .unwrap();
        out
    }

    #[test]
    fn test_pattern_validation() {
        let dir = tempdir().unwrap();
        for bad in ["application.log", "%DATE%-%DATE%.log", "sub/%DATE%.log"] {
            let result = DailyRotatingFileAppender::new(
                dir.path(),
                bad,
                RotationPolicy::default(),
                RecordFormatter::new("1"),
            );
            assert!(
                matches!(result, Err(LoggerError::InvalidConfiguration { .. })),
                "pattern {} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_date_pattern_validation() {
        let dir = tempdir().unwrap();
        for bad in ["%Q", "%Y/%m/%d", "%Y\\%m", ""] {
            let result = DailyRotatingFileAppender::new(
                dir.path(),
                "application-%DATE%.log",
                RotationPolicy::new().with_date_pattern(bad),
                RecordFormatter::new("1"),
            );
            assert!(
                matches!(result, Err(LoggerError::InvalidConfiguration { .. })),
                "date pattern {:?} should be rejected",
                bad
            );
        }

        let hourly = DailyRotatingFileAppender::new(
            dir.path(),
            "application-%DATE%.log",
            RotationPolicy::new().with_date_pattern("%Y-%m-%d-%H"),
            RecordFormatter::new("1"),
        );
        assert!(hourly.is_ok());
    }

    #[test]
    fn test_zero_max_size_rejected() {
        let dir = tempdir().unwrap();
        let result = DailyRotatingFileAppender::new(
            dir.path(),
            "application-%DATE%.log",
            RotationPolicy::new().with_max_size(Some(0)),
            RecordFormatter::new("1"),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_opens_todays_segment() {
        let dir = tempdir().unwrap();
        let appender = appender(dir.path(), RotationPolicy::default());

        let today = Utc::now().format("%Y-%m-%d").to_string();
        let expected = dir.path().join(format!("application-{}.log", today));
        assert_eq!(appender.current_path(), Some(expected.as_path()));
        assert!(expected.exists());
    }

    #[test]
    fn test_segment_path_naming() {
        let dir = tempdir().unwrap();
        let appender = appender(dir.path(), RotationPolicy::default());
        assert_eq!(
            appender.segment_path("2025-01-08", 0),
            dir.path().join("application-2025-01-08.log")
        );
        assert_eq!(
            appender.segment_path("2025-01-08", 2),
            dir.path().join("application-2025-01-08.log.2")
        );
    }

    #[test]
    fn test_date_change_opens_new_dated_segment() {
        let dir = tempdir().unwrap();
        let mut appender = appender(dir.path(), RotationPolicy::default());

        appender.append(&record_at(at(8, 23), "late on the 8th")).unwrap();
        appender.append(&record_at(at(9, 0), "early on the 9th")).unwrap();
        appender.flush().unwrap();

        let day8 = dir.path().join("application-2025-01-08.log");
        let day9 = dir.path().join("application-2025-01-09.log");
        assert!(!day8.exists());
        assert!(gunzip(&gz_path(&day8)).contains("late on the 8th"));
        assert!(fs::read_to_string(&day9).unwrap().contains("early on the 9th"));
        assert_eq!(appender.current_path(), Some(day9.as_path()));
    }

    #[test]
    fn test_late_record_stays_in_current_segment() {
        let dir = tempdir().unwrap();
        let mut appender = appender(dir.path(), RotationPolicy::default());

        let after_midnight = Utc.with_ymd_and_hms(2025, 1, 9, 0, 0, 5).unwrap();
        let before_midnight = Utc.with_ymd_and_hms(2025, 1, 8, 23, 59, 59).unwrap();
        appender.append(&record_at(after_midnight, "first of the 9th")).unwrap();
        appender.append(&record_at(before_midnight, "late from the 8th")).unwrap();
        appender
            .append(&record_at(after_midnight + chrono::Duration::seconds(1), "second of the 9th"))
            .unwrap();
        appender.flush().unwrap();

        let day9 = dir.path().join("application-2025-01-09.log");
        assert_eq!(appender.current_path(), Some(day9.as_path()));
        assert_eq!(fs::read_to_string(&day9).unwrap().lines().count(), 3);

        let day8 = dir.path().join("application-2025-01-08.log");
        assert!(!day8.exists());
        assert!(!gz_path(&day8).exists());
        assert!(!gz_path(&day9).exists());
        assert!(!appender.segment_path("2025-01-09", 1).exists());
    }

    #[test]
    fn test_size_cap_closes_segment() {
        let dir = tempdir().unwrap();
        let policy = RotationPolicy::new()
            .with_max_size(Some(300))
            .with_compression(false);
        let mut appender = appender(dir.path(), policy);

        for i in 0..20 {
            appender
                .append(&record_at(at(8, 12), &format!("Entry number {}", i)))
                .unwrap();
        }
        appender.flush().unwrap();

        let first = dir.path().join("application-2025-01-08.log");
        let second = dir.path().join("application-2025-01-08.log.1");
        assert!(first.exists());
        assert!(second.exists());
        assert!(fs::metadata(&first).unwrap().len() <= 300);

        // Every record lands in exactly one segment
        let mut total = 0;
        let mut index = 0;
        loop {
            let path = appender.segment_path("2025-01-08", index);
            if !path.exists() {
                break;
            }
            total += fs::read_to_string(&path).unwrap().lines().count();
            index += 1;
        }
        assert_eq!(total, 20);
    }

    #[test]
    fn test_oversized_record_still_written() {
        let dir = tempdir().unwrap();
        let policy = RotationPolicy::new()
            .with_max_size(Some(10))
            .with_compression(false);
        let mut appender = appender(dir.path(), policy);

        appender.append(&record_at(at(8, 1), "much longer than ten bytes")).unwrap();
        appender.append(&record_at(at(8, 2), "second")).unwrap();
        appender.flush().unwrap();

        let first = fs::read_to_string(dir.path().join("application-2025-01-08.log")).unwrap();
        let second = fs::read_to_string(dir.path().join("application-2025-01-08.log.1")).unwrap();
        assert!(first.contains("much longer"));
        assert!(second.contains("second"));
    }

    #[test]
    fn test_closed_segments_are_gzipped() {
        let dir = tempdir().unwrap();
        let policy = RotationPolicy::new().with_max_size(Some(200));
        let mut appender = appender(dir.path(), policy);

        for i in 0..10 {
            appender
                .append(&record_at(at(8, 12), &format!("Compressed entry {}", i)))
                .unwrap();
        }
        appender.flush().unwrap();

        let first = dir.path().join("application-2025-01-08.log");
        assert!(!first.exists());
        let archived = gunzip(&gz_path(&first));
        assert!(archived.contains("Compressed entry 0"));
    }

    #[test]
    fn test_resume_appends_to_existing_segment() {
        let dir = tempdir().unwrap();
        let policy = RotationPolicy::new().with_compression(false);
        let today = Utc::now();
        let key = today.format("%Y-%m-%d").to_string();

        {
            let mut first = appender(dir.path(), policy.clone());
            first.append(&record_at(today, "before restart")).unwrap();
        }

        let mut second = appender(dir.path(), policy);
        assert!(second.current_size() > 0);
        second.append(&record_at(today, "after restart")).unwrap();
        second.flush().unwrap();

        let content =
            fs::read_to_string(dir.path().join(format!("application-{}.log", key))).unwrap();
        assert!(content.contains("before restart"));
        assert!(content.contains("after restart"));
    }

    #[test]
    fn test_resume_skips_compressed_segments() {
        let dir = tempdir().unwrap();
        let today = Utc::now().format("%Y-%m-%d").to_string();
        let base = dir.path().join(format!("application-{}.log", today));
        fs::write(gz_path(&base), b"").unwrap();

        let appender = appender(dir.path(), RotationPolicy::default());
        let expected = dir.path().join(format!("application-{}.log.1", today));
        assert_eq!(appender.current_path(), Some(expected.as_path()));
    }

    #[test]
    fn test_compress_file_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("segment.log");
        fs::write(&path, "line one\nline two\n").unwrap();

        compress_file(&path).unwrap();

        assert!(!path.exists());
        assert_eq!(gunzip(&gz_path(&path)), "line one\nline two\n");
    }
}
