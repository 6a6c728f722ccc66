//! Integration tests for the registry logger
//!
//! These tests verify:
//! - Per-level emission and sink routing
//! - Metadata flattening in files and the console suffix
//! - Construction failures
//! - Log directory layout and idempotence
//! - Size-capped rotation with gzip of closed segments

use core_registry_logger::{
    metadata, CaptureBuffer, LoggerError, LoggerOptions, Metadata, RegistryLogger, SeverityLevel,
};
use flate2::read::GzDecoder;
use serde_json::Value;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn logger_with(root: &Path, project: &str, level: &str, console: &CaptureBuffer) -> RegistryLogger {
    RegistryLogger::builder()
        .project_name(project)
        .log_level(level)
        .package_version("2.3.1")
        .root_dir(root)
        .colors(false)
        .capture_console(console.clone())
        .build()
        .expect("Failed to build logger")
}

fn read_json_lines(path: &Path) -> Vec<Value> {
    let content = fs::read_to_string(path).unwrap_or_default();
    content
        .lines()
        .map(|line| serde_json::from_str(line).expect("Each line should be JSON"))
        .collect()
}

fn messages(records: &[Value]) -> Vec<String> {
    records
        .iter()
        .map(|r| r["message"].as_str().unwrap_or_default().to_string())
        .collect()
}

fn segment_text(path: &Path) -> String {
    if path.extension().is_some_and(|ext| ext == "gz") {
        let mut decoder = GzDecoder::new(fs::File::open(path).expect("open gz"));
        let mut text = String::new();
        decoder.read_to_string(&mut text).expect("decompress");
        text
    } else {
        fs::read_to_string(path).expect("read segment")
    }
}

/// Every rotating segment in the log dir, live or archived, in date order
///
/// A run that crosses UTC midnight spreads its records over two dates.
fn rotating_segments(log_dir: &Path) -> Vec<PathBuf> {
    let mut segments: Vec<PathBuf> = fs::read_dir(log_dir)
        .expect("Failed to list log dir")
        .map(|entry| entry.expect("dir entry").path())
        .filter(|path| {
            path.file_name()
                .is_some_and(|name| name.to_string_lossy().starts_with("application-"))
        })
        .collect();
    segments.sort();
    segments
}

fn rotating_records(log_dir: &Path) -> Vec<Value> {
    rotating_segments(log_dir)
        .iter()
        .flat_map(|path| {
            segment_text(path)
                .lines()
                .map(|line| serde_json::from_str(line).expect("Each line should be JSON"))
                .collect::<Vec<Value>>()
        })
        .collect()
}

#[test]
fn test_every_level_has_an_emission_method() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let console = CaptureBuffer::new();
    let logger = logger_with(temp_dir.path(), "levels", "trace", &console);

    logger.fatal("m-fatal");
    logger.error("m-error");
    logger.task_error("m-task_error");
    logger.warn("m-warn");
    logger.info("m-info");
    logger.task("m-task");
    logger.debug("m-debug");
    logger.trace("m-trace");
    logger.flush().expect("Failed to flush");

    let combined = read_json_lines(&logger.log_dir().join("combined.log"));
    assert_eq!(combined.len(), 8);
    for (record, level) in combined.iter().zip(SeverityLevel::ALL) {
        assert_eq!(record["level"], level.to_str());
        assert_eq!(record["message"], format!("m-{}", level));
    }
}

#[test]
fn test_with_metadata_methods_carry_level() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let console = CaptureBuffer::new();
    let logger = logger_with(temp_dir.path(), "levels-md", "trace", &console);

    let md = || metadata! { "k" => "v" };
    logger.fatal_with_metadata("fatal", md());
    logger.error_with_metadata("error", md());
    logger.task_error_with_metadata("task_error", md());
    logger.warn_with_metadata("warn", md());
    logger.info_with_metadata("info", md());
    logger.task_with_metadata("task", md());
    logger.debug_with_metadata("debug", md());
    logger.trace_with_metadata("trace", md());
    logger.flush().expect("Failed to flush");

    let combined = read_json_lines(&logger.log_dir().join("combined.log"));
    assert_eq!(combined.len(), 8);
    for record in &combined {
        assert_eq!(record["level"], record["message"]);
        assert_eq!(record["k"], "v");
    }
}

#[test]
fn test_threshold_filters_files_but_not_console() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let console = CaptureBuffer::new();
    let logger = logger_with(temp_dir.path(), "warn-threshold", "warn", &console);

    logger.info("only on the console");
    logger.warn("everywhere but error.log");
    logger.flush().expect("Failed to flush");

    let combined = read_json_lines(&logger.log_dir().join("combined.log"));
    let rotating = rotating_records(logger.log_dir());
    let errors = read_json_lines(&logger.log_dir().join("error.log"));

    assert_eq!(messages(&combined), vec!["everywhere but error.log"]);
    assert_eq!(messages(&rotating), vec!["everywhere but error.log"]);
    assert!(errors.is_empty());

    let lines = console.lines();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("[2.3.1] [info]: only on the console"));
    assert!(lines[1].contains("[warn]: everywhere but error.log"));
}

#[test]
fn test_error_reaches_every_sink() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let console = CaptureBuffer::new();
    let logger = logger_with(temp_dir.path(), "info-threshold", "info", &console);

    logger.error("disk unavailable");
    logger.flush().expect("Failed to flush");

    for (name, records) in [
        ("error.log", read_json_lines(&logger.log_dir().join("error.log"))),
        ("combined.log", read_json_lines(&logger.log_dir().join("combined.log"))),
        ("rotating", rotating_records(logger.log_dir())),
    ] {
        assert_eq!(messages(&records), vec!["disk unavailable"], "{}", name);
        assert_eq!(records[0]["level"], "error");
    }
    assert!(console.contents().contains("[error]: disk unavailable"));
}

#[test]
fn test_task_error_is_not_an_error_file_record() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let console = CaptureBuffer::new();
    let logger = logger_with(temp_dir.path(), "task-errors", "info", &console);

    logger.task_error("job failed");
    logger.fatal("process exiting");
    logger.flush().expect("Failed to flush");

    let errors = read_json_lines(&logger.log_dir().join("error.log"));
    assert_eq!(messages(&errors), vec!["process exiting"]);

    let combined = read_json_lines(&logger.log_dir().join("combined.log"));
    assert_eq!(messages(&combined), vec!["job failed", "process exiting"]);
}

#[test]
fn test_metadata_is_flattened_in_files() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let console = CaptureBuffer::new();
    let logger = logger_with(temp_dir.path(), "metadata", "info", &console);

    logger.info_with_metadata(
        "request done",
        Metadata::new().with_field("requestId", "abc"),
    );
    logger.flush().expect("Failed to flush");

    let combined = read_json_lines(&logger.log_dir().join("combined.log"));
    assert_eq!(combined.len(), 1);
    assert_eq!(combined[0]["requestId"], "abc");
    assert_eq!(combined[0]["message"], "request done");
    assert!(combined[0].get("metadata").is_none());

    let line = console.contents();
    assert!(line.ends_with(r#"[info]: request done {"requestId":"abc"}"#));
}

#[test]
fn test_reserved_metadata_keys_do_not_override_record() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let console = CaptureBuffer::new();
    let logger = logger_with(temp_dir.path(), "reserved", "info", &console);

    logger.warn_with_metadata(
        "real message",
        metadata! {
            "message" => "forged",
            "level" => "fatal",
            "timestamp" => "1970-01-01 00:00:00",
            "peer" => "10.0.0.4",
        },
    );
    logger.flush().expect("Failed to flush");

    let combined = read_json_lines(&logger.log_dir().join("combined.log"));
    assert_eq!(combined[0]["message"], "real message");
    assert_eq!(combined[0]["level"], "warn");
    assert_ne!(combined[0]["timestamp"], "1970-01-01 00:00:00");
    assert_eq!(combined[0]["peer"], "10.0.0.4");
    assert!(!console.contents().contains("forged"));
}

#[test]
fn test_file_timestamps_use_registry_format() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let console = CaptureBuffer::new();
    let logger = logger_with(temp_dir.path(), "timestamps", "info", &console);

    logger.info("tick");
    logger.flush().expect("Failed to flush");

    let combined = read_json_lines(&logger.log_dir().join("combined.log"));
    let timestamp = combined[0]["timestamp"].as_str().expect("timestamp string");
    assert!(
        chrono::NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%d %H:%M:%S").is_ok(),
        "unexpected timestamp {}",
        timestamp
    );
}

#[test]
fn test_multiline_message_stays_on_one_console_line() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let console = CaptureBuffer::new();
    let logger = logger_with(temp_dir.path(), "injection", "info", &console);

    logger.info("User login\nerror [2024-10-17] Fake error injected");
    logger.flush().expect("Failed to flush");

    let lines = console.lines();
    assert_eq!(lines.len(), 1);
    assert!(!lines[0].contains('\n'));
    assert!(lines[0].contains("\\n"));

    let combined = read_json_lines(&logger.log_dir().join("combined.log"));
    assert_eq!(combined.len(), 1);
    assert_eq!(
        combined[0]["message"],
        "User login\nerror [2024-10-17] Fake error injected"
    );
}

#[test]
fn test_log_directory_layout_and_idempotence() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let console = CaptureBuffer::new();

    let first = logger_with(temp_dir.path(), "shared", "info", &console);
    let second = logger_with(temp_dir.path(), "shared", "debug", &console);

    let expected = temp_dir.path().join("core-registry").join("logs").join("shared");
    assert_eq!(first.log_dir(), expected);
    assert_eq!(second.log_dir(), expected);
    assert!(expected.is_dir());

    first.info("from first");
    second.info("from second");
    first.flush().expect("Failed to flush");
    second.flush().expect("Failed to flush");

    let mut combined = messages(&read_json_lines(&expected.join("combined.log")));
    combined.sort();
    assert_eq!(combined, vec!["from first", "from second"]);
}

#[test]
fn test_projects_are_isolated() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let console = CaptureBuffer::new();

    let a = logger_with(temp_dir.path(), "alpha", "info", &console);
    let b = logger_with(temp_dir.path(), "beta", "info", &console);
    assert_ne!(a.log_dir(), b.log_dir());

    a.info("alpha only");
    a.flush().expect("Failed to flush");
    b.flush().expect("Failed to flush");

    assert!(read_json_lines(&b.log_dir().join("combined.log")).is_empty());
}

#[test]
fn test_introspection() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let console = CaptureBuffer::new();
    let logger = logger_with(temp_dir.path(), "introspect", "task", &console);

    assert_eq!(logger.project_name(), "introspect");
    assert_eq!(logger.log_level(), SeverityLevel::Task);
    assert_eq!(logger.package_version(), "2.3.1");
    assert_eq!(
        logger.route_names(),
        vec!["console", "error-file", "combined-file", "rotating-file"]
    );
}

#[test]
fn test_invalid_level_fails_construction() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let result = RegistryLogger::builder()
        .project_name("bad-level")
        .log_level("verbose")
        .package_version("1.0.0")
        .root_dir(temp_dir.path())
        .build();

    match result {
        Err(LoggerError::InvalidConfiguration { component, .. }) => {
            assert_eq!(component, "log_level")
        }
        other => panic!("expected configuration error, got {:?}", other.err()),
    }
    // Nothing is created for a rejected configuration
    assert!(!temp_dir.path().join("core-registry").exists());
}

#[test]
fn test_invalid_project_name_fails_construction() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    for name in ["", "../escape", "a/b"] {
        let result = RegistryLogger::builder()
            .project_name(name)
            .log_level("info")
            .package_version("1.0.0")
            .root_dir(temp_dir.path())
            .build();
        assert!(
            matches!(result, Err(LoggerError::InvalidConfiguration { .. })),
            "'{}' should be rejected",
            name
        );
    }
}

#[test]
fn test_uncreatable_log_directory_fails_construction() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let blocker = temp_dir.path().join("not-a-dir");
    fs::write(&blocker, b"file").expect("Failed to write blocker");

    let result = RegistryLogger::builder()
        .project_name("blocked")
        .log_level("info")
        .package_version("1.0.0")
        .root_dir(&blocker)
        .build();

    let err = result.err().expect("construction should fail");
    assert!(matches!(err, LoggerError::LogDirectory { .. }));
    assert!(err.is_construction_error());
}

#[test]
fn test_options_json_construction() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let options = LoggerOptions::from_json(
        r#"{"projectName":"from-json","logLevel":"debug","packageVersion":"0.1.0"}"#,
    )
    .expect("Failed to parse options");

    let logger = RegistryLogger::builder()
        .options(options)
        .root_dir(temp_dir.path())
        .capture_console(CaptureBuffer::new())
        .build()
        .expect("Failed to build logger");

    assert_eq!(logger.log_level(), SeverityLevel::Debug);
    assert!(logger.log_dir().ends_with("core-registry/logs/from-json"));
}

#[test]
fn test_size_cap_closes_and_compresses_segments() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let console = CaptureBuffer::new();
    let cap = 4096;

    let logger = RegistryLogger::builder()
        .project_name("rotation")
        .log_level("info")
        .package_version("2.3.1")
        .root_dir(temp_dir.path())
        .capture_console(console)
        .synchronous()
        .max_segment_size(Some(cap))
        .build()
        .expect("Failed to build logger");

    let total = 200;
    for i in 0..total {
        logger.info(format!("Rotation payload number {:04} with some padding text", i));
    }
    logger.flush().expect("Failed to flush");

    let mut archived = 0;
    let mut seen = 0;
    for path in rotating_segments(logger.log_dir()) {
        if path.extension().is_some_and(|ext| ext == "gz") {
            archived += 1;
        }
        let content = segment_text(&path);
        assert!(content.len() as u64 <= cap, "{} over cap", path.display());
        seen += content.lines().count();
    }

    assert!(archived >= 1, "at least one segment should have closed");
    assert_eq!(seen, total);
}

#[test]
fn test_rotating_segment_resumes_after_restart() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");

    for run in 0..2 {
        let logger = logger_with(temp_dir.path(), "restart", "info", &CaptureBuffer::new());
        logger.info(format!("run {}", run));
        logger.flush().expect("Failed to flush");
    }

    let log_dir = temp_dir.path().join("core-registry/logs/restart");
    let rotating = rotating_records(&log_dir);
    assert_eq!(messages(&rotating), vec!["run 0", "run 1"]);
}

#[test]
fn test_drop_flushes_pending_records() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_dir;
    {
        let logger = logger_with(temp_dir.path(), "drop-flush", "info", &CaptureBuffer::new());
        for i in 0..20 {
            logger.warn(format!("pending {}", i));
        }
        log_dir = logger.log_dir().to_path_buf();
    }

    let combined = read_json_lines(&log_dir.join("combined.log"));
    assert_eq!(combined.len(), 20);
}
