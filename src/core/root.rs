//! Resolution of the shared root directory that holds Core Registry logs
//!
//! Logs live under `<root>/core-registry/logs/<project>`. The root follows the
//! Chia convention: `CHIA_ROOT` when set, otherwise `~/.chia/mainnet`.

use super::error::{LoggerError, Result};
use std::path::{Path, PathBuf};

/// Environment variable overriding the Chia root
pub const CHIA_ROOT_ENV: &str = "CHIA_ROOT";

/// Root used when `CHIA_ROOT` is not set, relative to the home directory
pub const DEFAULT_ROOT_SUFFIX: &str = ".chia/mainnet";

/// Supplies the shared root directory
pub trait RootResolver: Send + Sync {
    fn resolve(&self) -> Result<PathBuf>;
}

/// Resolves the root from the environment the way Chia tooling does
#[derive(Debug, Clone, Copy, Default)]
pub struct ChiaRootResolver;

impl ChiaRootResolver {
    pub fn new() -> Self {
        Self
    }

    /// Pure resolution step, given the env value and home directory
    pub fn resolve_from(chia_root: Option<&str>, home: Option<&Path>) -> Result<PathBuf> {
        match chia_root.map(str::trim).filter(|v| !v.is_empty()) {
            Some(value) => expand_home(value, home),
            None => home
                .map(|h| h.join(DEFAULT_ROOT_SUFFIX))
                .ok_or_else(|| {
                    LoggerError::root_resolution(format!(
                        "{} is not set and no home directory is available",
                        CHIA_ROOT_ENV
                    ))
                }),
        }
    }
}

impl RootResolver for ChiaRootResolver {
    fn resolve(&self) -> Result<PathBuf> {
        let chia_root = std::env::var(CHIA_ROOT_ENV).ok();
        let home = dirs::home_dir();
        Self::resolve_from(chia_root.as_deref(), home.as_deref())
    }
}

/// Always returns the same directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedRoot(pub PathBuf);

impl FixedRoot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }
}

impl RootResolver for FixedRoot {
    fn resolve(&self) -> Result<PathBuf> {
        Ok(self.0.clone())
    }
}

/// Expand a leading `~` to the home directory
fn expand_home(value: &str, home: Option<&Path>) -> Result<PathBuf> {
    let rest = match value.strip_prefix('~') {
        Some(rest) => rest,
        None => return Ok(PathBuf::from(value)),
    };

    // `~user` forms are taken literally
    if !(rest.is_empty() || rest.starts_with('/') || rest.starts_with('\\')) {
        return Ok(PathBuf::from(value));
    }

    let home = home.ok_or_else(|| {
        LoggerError::root_resolution(format!(
            "{}='{}' refers to the home directory, which is not available",
            CHIA_ROOT_ENV, value
        ))
    })?;
    let rest = rest.trim_start_matches(['/', '\\']);
    Ok(if rest.is_empty() {
        home.to_path_buf()
    } else {
        home.join(rest)
    })
}

/// `<root>/core-registry/logs/<project_name>`
pub fn log_dir_for(root: &Path, project_name: &str) -> PathBuf {
    root.join("core-registry").join("logs").join(project_name)
}
