//! Appender implementations

pub mod console;
pub mod json_file;
pub mod rotating_file;

pub use console::{CaptureBuffer, ConsoleAppender};
pub use json_file::JsonFileAppender;
pub use rotating_file::{
    DailyRotatingFileAppender, RotationPolicy, DATE_PLACEHOLDER, DEFAULT_MAX_SEGMENT_SIZE,
};

pub use crate::core::Appender;
