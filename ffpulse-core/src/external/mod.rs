// ============================================================================
// ffpulse-core/src/external/mod.rs
// ============================================================================
//
// EXTERNAL TOOLS: Interactions with the ffmpeg and ffprobe executables
//
// This module encapsulates everything that touches the external binaries:
// finding them, probing input duration, spawning the transcoding engine and
// querying its version. Orchestration code depends only on the traits
// re-exported here, so tests substitute the mocks.
//
// KEY COMPONENTS:
// - BinaryLocator: platform/packaging-aware resolution of executable paths
// - DurationProbe / FfprobeDurationProbe: one-shot duration query
// - FfmpegSpawner / FfmpegProcess: engine process seam (ffmpeg-sidecar)
// - engine_version: `ffmpeg -version` check

// ---- Internal crate imports ----
use crate::error::{CoreError, CoreResult, command_start_error};

// ---- Standard library imports ----
use std::path::Path;
use std::process::{Command, Stdio};

// ============================================================================
// SUBMODULES
// ============================================================================

/// Resolution of engine and probe executable paths
pub mod locator;

/// Contains traits and implementations for executing ffmpeg commands
pub mod ffmpeg_executor;

/// Contains traits and implementations for executing ffprobe commands
pub mod ffprobe_executor;

/// Scripted stand-ins for the external tools
#[cfg(any(test, feature = "test-mocks"))]
pub mod mocks;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use ffmpeg_executor::{
    EngineCommand, FfmpegProcess, FfmpegSpawner, ProcessExit, SidecarProcess, SidecarSpawner,
};
pub use ffprobe_executor::{DURATION_PROBE_ARGS, DurationProbe, FfprobeDurationProbe};
pub use locator::{BinaryLocator, BinaryPaths, Platform};

// ============================================================================
// VERSION CHECK
// ============================================================================

/// Runs `<engine> -version` and returns the first line of its output,
/// e.g. `ffmpeg version 7.1 Copyright (c) 2000-2024 the FFmpeg developers`.
///
/// Fails when the binary cannot be started or exits unsuccessfully.
pub fn engine_version(engine: &Path) -> CoreResult<String> {
    let output = Command::new(engine)
        .arg("-version")
        .stdin(Stdio::null())
        .output()
        .map_err(|e| {
            log::warn!("Could not run '{} -version': {}", engine.display(), e);
            command_start_error(engine.display().to_string(), e)
        })?;

    if !output.status.success() {
        return Err(CoreError::Config(format!(
            "'{} -version' exited with {}",
            engine.display(),
            output.status
        )));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let first_line = stdout.lines().next().unwrap_or_default().trim().to_string();
    log::debug!("Engine version: {first_line}");
    Ok(first_line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_version_missing_binary() {
        let err = engine_version(Path::new("/definitely/not/here/ffmpeg")).unwrap_err();
        assert!(matches!(err, CoreError::Spawn { .. }));
    }
}
