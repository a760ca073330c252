//! Error types for the ffpulse-core library.
//!
//! Probe and spawn failures are returned synchronously from task submission.
//! A transcoding process that exits non-zero is *not* an error value here: it
//! is reported through the task's event channel as a terminal error event.

use crate::task::TaskId;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failures of the duration probe subprocess.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Failed to start ffprobe at '{}': {source}", path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("ffprobe exited with status {}: {stderr}", code.map_or_else(|| "<signal>".to_string(), |c| c.to_string()))]
    ExitStatus { code: Option<i32>, stderr: String },

    #[error("ffprobe output is not a duration: '{0}'")]
    Unparsable(String),
}

/// Main error type for the core library.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Duration probe failed: {0}")]
    Probe(#[from] ProbeError),

    #[error("Failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Process control failed for '{program}': {source}")]
    ProcessControl {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Task '{0}' is already active")]
    DuplicateTask(TaskId),

    #[error("Task '{0}' is not active")]
    UnknownTask(TaskId),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

/// Result type for core operations.
pub type CoreResult<T> = std::result::Result<T, CoreError>;

/// Builds a [`CoreError::Spawn`] for a program that could not be launched.
pub fn command_start_error(program: impl Into<String>, source: io::Error) -> CoreError {
    CoreError::Spawn {
        program: program.into(),
        source,
    }
}

/// Builds a [`CoreError::ProcessControl`] for wait/kill failures.
pub fn process_control_error(program: impl Into<String>, source: io::Error) -> CoreError {
    CoreError::ProcessControl {
        program: program.into(),
        source,
    }
}
