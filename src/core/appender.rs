//! Sink seam: appenders and the level filters routing records to them

use super::{error::Result, log_level::SeverityLevel, log_record::LogRecord};
use std::fmt;

pub trait Appender: Send + Sync {
    fn append(&mut self, record: &LogRecord) -> Result<()>;
    fn flush(&mut self) -> Result<()>;
    fn name(&self) -> &str;
}

/// Acceptance predicate of a sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelFilter {
    /// Every record, regardless of the router threshold
    All,
    /// Records at this level or more severe
    AtMost(SeverityLevel),
}

impl LevelFilter {
    #[inline]
    pub fn accepts(&self, level: SeverityLevel) -> bool {
        match self {
            LevelFilter::All => true,
            LevelFilter::AtMost(threshold) => level.passes(*threshold),
        }
    }
}

impl fmt::Display for LevelFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LevelFilter::All => write!(f, "all"),
            LevelFilter::AtMost(level) => write!(f, "<= {}", level),
        }
    }
}

/// An appender together with the filter deciding what reaches it
pub struct Route {
    pub filter: LevelFilter,
    pub appender: Box<dyn Appender>,
}

impl Route {
    pub fn new(filter: LevelFilter, appender: impl Appender + 'static) -> Self {
        Self {
            filter,
            appender: Box::new(appender),
        }
    }

    pub fn name(&self) -> &str {
        self.appender.name()
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("name", &self.name())
            .field("filter", &self.filter)
            .finish()
    }
}
