//! Logging bootstrap
//!
//! Foreground commands log to stdout. Under the Service Control Manager
//! there is no console, so records go to `diskwatch.log` next to the
//! executable. `DISKWATCH_LOG` overrides the default `info` filter.

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

pub const LOG_FILE_NAME: &str = "diskwatch.log";
const LOG_ENV: &str = "DISKWATCH_LOG";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stdout,
    File(PathBuf),
}

/// `<dir of the running executable>/diskwatch.log`
pub fn log_file_beside_executable() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("Failed to get executable path")?;
    let dir = exe.parent().unwrap_or_else(|| Path::new("."));
    Ok(log_file_in(dir))
}

pub fn log_file_in(dir: &Path) -> PathBuf {
    dir.join(LOG_FILE_NAME)
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"))
}

pub fn init(target: &LogTarget) -> Result<()> {
    match target {
        LogTarget::Stdout => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .with_target(false)
                .try_init()
                .map_err(|e| anyhow::anyhow!("Failed to initialise logging: {}", e))?;
        }
        LogTarget::File(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;

            tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .with_ansi(false)
                .with_file(true)
                .with_line_number(true)
                .with_writer(Mutex::new(file))
                .try_init()
                .map_err(|e| anyhow::anyhow!("Failed to initialise logging: {}", e))?;

            tracing::info!("--- Application starting, logging to {} ---", path.display());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_file_lives_in_given_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = log_file_in(dir.path());
        assert_eq!(path.parent(), Some(dir.path()));
        assert!(path.ends_with(LOG_FILE_NAME));
    }

    #[test]
    fn test_log_file_beside_executable() {
        let path = log_file_beside_executable().unwrap();
        assert_eq!(path.file_name().and_then(|n| n.to_str()), Some(LOG_FILE_NAME));
    }
}
