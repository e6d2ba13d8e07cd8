//! Tracing setup for the `warden` binary.
//!
//! Query output owns stdout, so log lines go to stderr or to a file.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Where log lines are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    File(PathBuf),
}

impl LogTarget {
    /// A file target at [`log_path`].
    pub fn file() -> Self {
        Self::File(log_path())
    }
}

/// Installs the global subscriber and returns the target actually in use.
///
/// The level follows `RUST_LOG` and defaults to `info`. A log file that
/// cannot be opened degrades to stderr.
pub fn init_logging(target: LogTarget) -> LogTarget {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if let LogTarget::File(path) = target {
        match open_log_file(&path) {
            Ok(file) => {
                tracing_subscriber::fmt()
                    .with_env_filter(filter)
                    .with_writer(file)
                    .with_ansi(false)
                    .init();
                return LogTarget::File(path);
            }
            Err(e) => eprintln!(
                "Warning: cannot open log file {}, logging to stderr: {e}",
                path.display()
            ),
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    LogTarget::Stderr
}

/// Creates (or truncates) the log file and any missing parent directories.
fn open_log_file(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    File::create(path)
}

/// `redshift-warden/warden.log` under the platform state directory, else the
/// config directory, else the temp directory.
pub fn log_path() -> PathBuf {
    dirs::state_dir()
        .or_else(dirs::config_dir)
        .unwrap_or_else(std::env::temp_dir)
        .join("redshift-warden")
        .join("warden.log")
}
