// ============================================================================
// ffpulse-core/src/external/ffmpeg_executor.rs
// ============================================================================
//
// FFMPEG EXECUTOR: FFmpeg Process Management and Abstraction
//
// This module provides the seam between task orchestration and the actual
// ffmpeg processes. The orchestrator only sees the two traits below, so tests
// can replay scripted stderr output without any binary installed.
//
// KEY COMPONENTS:
// - FfmpegProcess: Trait representing an active FFmpeg process
// - FfmpegSpawner: Trait for creating new FFmpeg processes
// - SidecarSpawner: Concrete implementation using ffmpeg-sidecar

use crate::error::{CoreResult, command_start_error, process_control_error};
use ffmpeg_sidecar::child::FfmpegChild as SidecarChild;
use ffmpeg_sidecar::command::FfmpegCommand;
use std::fmt;
use std::io::Read;
use std::path::PathBuf;
use std::process::Stdio;

/// Fully assembled engine invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineCommand {
    pub program: PathBuf,
    /// Caller arguments followed by the output path.
    pub args: Vec<String>,
}

impl EngineCommand {
    #[must_use]
    pub fn program_name(&self) -> String {
        self.program
            .file_name()
            .map_or_else(|| self.program.display().to_string(), |n| n.to_string_lossy().into_owned())
    }
}

impl fmt::Display for EngineCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            if arg.contains(' ') {
                write!(f, " \"{arg}\"")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// How a process ended. `code` is `None` when it was terminated by a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessExit {
    pub code: Option<i32>,
}

impl ProcessExit {
    #[must_use]
    pub fn success(self) -> bool {
        self.code == Some(0)
    }
}

impl From<std::process::ExitStatus> for ProcessExit {
    fn from(status: std::process::ExitStatus) -> Self {
        Self {
            code: status.code(),
        }
    }
}

/// Trait representing an active ffmpeg process instance.
pub trait FfmpegProcess: Send {
    /// Takes ownership of the diagnostic (stderr) stream. Returns `None` on
    /// subsequent calls.
    fn take_diagnostics(&mut self) -> Option<Box<dyn Read + Send>>;

    /// Non-blocking exit check.
    fn try_wait(&mut self) -> CoreResult<Option<ProcessExit>>;

    /// Terminates the process.
    fn kill(&mut self) -> CoreResult<()>;

    /// OS process id, when there is one.
    fn id(&self) -> Option<u32>;
}

/// Trait representing something that can spawn an FfmpegProcess.
pub trait FfmpegSpawner: Send + Sync {
    type Process: FfmpegProcess + 'static;

    fn spawn(&self, command: &EngineCommand) -> CoreResult<Self::Process>;
}

/// Wrapper around `ffmpeg_sidecar::child::FfmpegChild` implementing `FfmpegProcess`.
pub struct SidecarProcess {
    child: SidecarChild,
    program: String,
    pid: u32,
}

impl FfmpegProcess for SidecarProcess {
    fn take_diagnostics(&mut self) -> Option<Box<dyn Read + Send>> {
        self.child
            .take_stderr()
            .map(|stderr| Box::new(stderr) as Box<dyn Read + Send>)
    }

    fn try_wait(&mut self) -> CoreResult<Option<ProcessExit>> {
        self.child
            .as_inner_mut()
            .try_wait()
            .map(|status| status.map(ProcessExit::from))
            .map_err(|e| process_control_error(&self.program, e))
    }

    fn kill(&mut self) -> CoreResult<()> {
        self.child
            .kill()
            .map_err(|e| process_control_error(&self.program, e))
    }

    fn id(&self) -> Option<u32> {
        Some(self.pid)
    }
}

/// Concrete implementation of `FfmpegSpawner` using `ffmpeg-sidecar`.
#[derive(Debug, Clone, Default)]
pub struct SidecarSpawner;

impl FfmpegSpawner for SidecarSpawner {
    type Process = SidecarProcess;

    fn spawn(&self, command: &EngineCommand) -> CoreResult<Self::Process> {
        let mut cmd = FfmpegCommand::new_with_path(&command.program);
        cmd.args(&command.args);
        // Only stderr is read, so stdout must not be a pipe.
        cmd.as_inner_mut().stdout(Stdio::null());

        log::debug!("Spawning ffmpeg: {command}");

        let mut child = cmd.spawn().map_err(|e| {
            log::error!("Failed to start {}: {}", command.program.display(), e);
            command_start_error(command.program.display().to_string(), e)
        })?;
        let pid = child.as_inner_mut().id();

        Ok(SidecarProcess {
            child,
            program: command.program_name(),
            pid,
        })
    }
}
