// ============================================================================
// ffpulse-cli/src/logging.rs
// ============================================================================
//
// LOGGING UTILITIES: log setup for the ffpulse binary
//
// Records go to stderr, and to a timestamped file when --log-dir is given.
// stdout stays reserved for command output (JSON lines in --json mode).

use anyhow::Context;
use log::LevelFilter;
use std::path::{Path, PathBuf};

/// Returns the current local timestamp formatted as "YYYYMMDD_HHMMSS".
pub fn get_timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// `<log_dir>/ffpulse_run_<timestamp>.log`
pub fn log_file_path(log_dir: &Path) -> PathBuf {
    log_dir.join(format!("ffpulse_run_{}.log", get_timestamp()))
}

/// Installs the global logger. Returns the log file path, if any.
pub fn init(verbose: bool, log_dir: Option<&Path>) -> anyhow::Result<Option<PathBuf>> {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let log_file = log_dir.map(log_file_path);
    ffpulse_core::file_logging::setup_logging(log_file.as_deref(), level)
        .context("Failed to initialize logging")?;
    Ok(log_file)
}
