//! FFprobe integration for duration probing.
//!
//! Only the container duration is requested, printed without wrappers or key
//! names, so stdout is a single floating-point token.

use crate::error::ProbeError;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Arguments placed before the input path.
pub const DURATION_PROBE_ARGS: [&str; 6] = [
    "-v",
    "error",
    "-show_entries",
    "format=duration",
    "-of",
    "default=noprint_wrappers=1:nokey=1",
];

/// Something that can determine the total duration of a media file.
pub trait DurationProbe: Send + Sync {
    /// Returns the duration of `input` in seconds.
    fn probe_duration(&self, input: &Path) -> Result<f64, ProbeError>;
}

/// Runs the ffprobe executable as a short-lived subprocess.
#[derive(Debug, Clone)]
pub struct FfprobeDurationProbe {
    probe_path: PathBuf,
}

impl FfprobeDurationProbe {
    pub fn new(probe_path: impl Into<PathBuf>) -> Self {
        Self {
            probe_path: probe_path.into(),
        }
    }

    #[must_use]
    pub fn probe_path(&self) -> &Path {
        &self.probe_path
    }
}

impl DurationProbe for FfprobeDurationProbe {
    fn probe_duration(&self, input: &Path) -> Result<f64, ProbeError> {
        log::debug!(
            "Running ffprobe for duration on: {}",
            input.display()
        );

        let output = Command::new(&self.probe_path)
            .args(DURATION_PROBE_ARGS)
            .arg(input)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| {
                log::error!(
                    "Failed to start ffprobe '{}': {}",
                    self.probe_path.display(),
                    source
                );
                ProbeError::Spawn {
                    path: self.probe_path.clone(),
                    source,
                }
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !output.status.success() {
            log::error!(
                "ffprobe failed for {} ({}): {}",
                input.display(),
                output.status,
                stderr
            );
            return Err(ProbeError::ExitStatus {
                code: output.status.code(),
                stderr,
            });
        }
        if !stderr.is_empty() {
            log::warn!("ffprobe stderr for {}: {}", input.display(), stderr);
        }

        let duration = parse_duration_output(&String::from_utf8_lossy(&output.stdout))?;
        log::debug!("Duration of {}: {:.3}s", input.display(), duration);
        Ok(duration)
    }
}

/// Parses the single-token stdout of the duration probe.
pub fn parse_duration_output(stdout: &str) -> Result<f64, ProbeError> {
    let token = stdout.trim();
    match token.parse::<f64>() {
        Ok(secs) if secs.is_finite() && secs >= 0.0 => Ok(secs),
        _ => Err(ProbeError::Unparsable(token.to_string())),
    }
}
