//! Severity taxonomy for Core Registry logs
//!
//! Levels are ranked most severe first. A lower rank means a more severe
//! record, so the derived `Ord` sorts `Fatal` before `Trace`.

use super::overflow_policy::LogPriority;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum SeverityLevel {
    Fatal = 0,
    Error = 1,
    TaskError = 2,
    Warn = 3,
    #[default]
    Info = 4,
    Task = 5,
    Debug = 6,
    Trace = 7,
}

impl SeverityLevel {
    /// All levels in rank order, most severe first
    pub const ALL: [SeverityLevel; 8] = [
        SeverityLevel::Fatal,
        SeverityLevel::Error,
        SeverityLevel::TaskError,
        SeverityLevel::Warn,
        SeverityLevel::Info,
        SeverityLevel::Task,
        SeverityLevel::Debug,
        SeverityLevel::Trace,
    ];

    pub fn to_str(&self) -> &'static str {
        match self {
            SeverityLevel::Fatal => "fatal",
            SeverityLevel::Error => "error",
            SeverityLevel::TaskError => "task_error",
            SeverityLevel::Warn => "warn",
            SeverityLevel::Info => "info",
            SeverityLevel::Task => "task",
            SeverityLevel::Debug => "debug",
            SeverityLevel::Trace => "trace",
        }
    }

    /// Numeric rank, 0 for `fatal` through 7 for `trace`
    #[inline]
    pub fn rank(&self) -> u8 {
        *self as u8
    }

    /// Look up a level by its numeric rank
    pub fn from_rank(rank: u8) -> Option<Self> {
        Self::ALL.get(usize::from(rank)).copied()
    }

    /// Whether this level is at least as severe as `threshold`
    #[inline]
    pub fn passes(&self, threshold: SeverityLevel) -> bool {
        self.rank() <= threshold.rank()
    }

    pub fn is_more_severe_than(&self, other: SeverityLevel) -> bool {
        self.rank() < other.rank()
    }

    pub fn color_code(&self) -> colored::Color {
        use colored::Color::*;
        match self {
            SeverityLevel::Fatal | SeverityLevel::Error | SeverityLevel::TaskError => Red,
            SeverityLevel::Warn => Yellow,
            SeverityLevel::Info => Green,
            SeverityLevel::Task => Cyan,
            SeverityLevel::Debug => Blue,
            SeverityLevel::Trace => Magenta,
        }
    }

    /// Priority used when the async queue overflows
    pub fn priority(&self) -> LogPriority {
        match self {
            SeverityLevel::Fatal | SeverityLevel::Error | SeverityLevel::TaskError => {
                LogPriority::Critical
            }
            SeverityLevel::Warn => LogPriority::High,
            _ => LogPriority::Normal,
        }
    }
}

impl fmt::Display for SeverityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.to_str())
    }
}

impl FromStr for SeverityLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fatal" => Ok(SeverityLevel::Fatal),
            "error" => Ok(SeverityLevel::Error),
            "task_error" | "task-error" => Ok(SeverityLevel::TaskError),
            "warn" | "warning" => Ok(SeverityLevel::Warn),
            "info" => Ok(SeverityLevel::Info),
            "task" => Ok(SeverityLevel::Task),
            "debug" => Ok(SeverityLevel::Debug),
            "trace" => Ok(SeverityLevel::Trace),
            _ => Err(format!("Invalid log level: '{}'", s)),
        }
    }
}
