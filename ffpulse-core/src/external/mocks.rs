// ffpulse-core/src/external/mocks.rs

// --- Mocking Infrastructure (for testing) ---

// Compiled for this crate's unit tests and, through the "test-mocks" feature,
// for downstream test suites.

use super::{DurationProbe, EngineCommand, FfmpegProcess, FfmpegSpawner, ProcessExit};
use crate::error::{CoreError, CoreResult, ProbeError, command_start_error};
use std::collections::{HashMap, VecDeque};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

const GATE_POLL: Duration = Duration::from_millis(2);

/// Stderr replay: hands out one scripted chunk per `read`.
///
/// With a gate, the reader blocks after the last chunk until the owning
/// process is killed, like a long-running ffmpeg would.
struct ScriptedStderr {
    chunks: VecDeque<Vec<u8>>,
    gate: Option<Arc<AtomicBool>>,
}

impl Read for ScriptedStderr {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if let Some(mut chunk) = self.chunks.pop_front() {
            let n = chunk.len().min(buf.len());
            buf[..n].copy_from_slice(&chunk[..n]);
            if n < chunk.len() {
                self.chunks.push_front(chunk.split_off(n));
            }
            return Ok(n);
        }
        if let Some(killed) = &self.gate {
            while !killed.load(Ordering::SeqCst) {
                thread::sleep(GATE_POLL);
            }
        }
        Ok(0)
    }
}

/// Mock implementation of FfmpegProcess.
pub struct MockFfmpegProcess {
    stderr: Option<ScriptedStderr>,
    exit: ProcessExit,
    killed: Arc<AtomicBool>,
    runs_until_killed: bool,
}

impl MockFfmpegProcess {
    /// Emits `chunks` on stderr, then exits with `exit_code`.
    pub fn scripted<I, C>(chunks: I, exit_code: i32) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Vec<u8>>,
    {
        Self::build(chunks, ProcessExit { code: Some(exit_code) }, false)
    }

    /// Emits `chunks`, then terminates by signal (no exit code).
    pub fn signalled<I, C>(chunks: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Vec<u8>>,
    {
        Self::build(chunks, ProcessExit { code: None }, false)
    }

    /// Emits `chunks`, then keeps running until killed.
    pub fn until_killed<I, C>(chunks: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Vec<u8>>,
    {
        Self::build(chunks, ProcessExit { code: None }, true)
    }

    fn build<I, C>(chunks: I, exit: ProcessExit, runs_until_killed: bool) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Vec<u8>>,
    {
        let killed = Arc::new(AtomicBool::new(false));
        let stderr = ScriptedStderr {
            chunks: chunks.into_iter().map(Into::into).collect(),
            gate: runs_until_killed.then(|| Arc::clone(&killed)),
        };
        Self {
            stderr: Some(stderr),
            exit,
            killed,
            runs_until_killed,
        }
    }

    /// Shared flag that flips once `kill` has been called.
    #[must_use]
    pub fn kill_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.killed)
    }
}

impl FfmpegProcess for MockFfmpegProcess {
    fn take_diagnostics(&mut self) -> Option<Box<dyn Read + Send>> {
        self.stderr
            .take()
            .map(|stderr| Box::new(stderr) as Box<dyn Read + Send>)
    }

    fn try_wait(&mut self) -> CoreResult<Option<ProcessExit>> {
        if self.killed.load(Ordering::SeqCst) {
            return Ok(Some(ProcessExit { code: None }));
        }
        if self.runs_until_killed {
            return Ok(None);
        }
        Ok(Some(self.exit))
    }

    fn kill(&mut self) -> CoreResult<()> {
        self.killed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn id(&self) -> Option<u32> {
        None
    }
}

/// Represents an expected ffmpeg command call and its mock result.
pub struct MockFfmpegExpectation {
    pub arg_pattern: String,
    pub result: CoreResult<MockFfmpegProcess>,
}

/// Mock implementation of FfmpegSpawner supporting multiple expectations.
///
/// Each expectation is consumed by the first spawn whose arguments contain
/// its pattern.
#[derive(Clone, Default)]
pub struct MockFfmpegSpawner {
    expectations: Arc<Mutex<Vec<MockFfmpegExpectation>>>,
    received_calls: Arc<Mutex<Vec<EngineCommand>>>,
}

impl MockFfmpegSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_expectation(&self, arg_pattern: &str, result: CoreResult<MockFfmpegProcess>) {
        self.expectations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(MockFfmpegExpectation {
                arg_pattern: arg_pattern.to_string(),
                result,
            });
    }

    pub fn add_process(&self, arg_pattern: &str, process: MockFfmpegProcess) {
        self.add_expectation(arg_pattern, Ok(process));
    }

    pub fn add_spawn_error_expectation(&self, arg_pattern: &str, error: CoreError) {
        self.add_expectation(arg_pattern, Err(error));
    }

    pub fn get_received_calls(&self) -> Vec<EngineCommand> {
        self.received_calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl FfmpegSpawner for MockFfmpegSpawner {
    type Process = MockFfmpegProcess;

    fn spawn(&self, command: &EngineCommand) -> CoreResult<Self::Process> {
        self.received_calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(command.clone());

        let mut expectations = self
            .expectations
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let found_index = expectations.iter().position(|exp| {
            command
                .args
                .iter()
                .any(|arg| arg.contains(&exp.arg_pattern))
        });

        let Some(index) = found_index else {
            log::error!("MockFfmpegSpawner: no expectation matches {command}");
            return Err(command_start_error(
                command.program_name(),
                io::Error::new(io::ErrorKind::NotFound, "no mock expectation"),
            ));
        };

        let expectation = expectations.remove(index);
        log::debug!(
            "MockFfmpegSpawner: matched expectation with pattern '{}'",
            expectation.arg_pattern
        );
        expectation.result
    }
}

/// Mock implementation of DurationProbe keyed by input path.
#[derive(Default)]
pub struct MockDurationProbe {
    durations: HashMap<PathBuf, f64>,
    failures: HashMap<PathBuf, i32>,
    calls: Mutex<Vec<PathBuf>>,
}

impl MockDurationProbe {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_duration(mut self, input: impl Into<PathBuf>, secs: f64) -> Self {
        self.durations.insert(input.into(), secs);
        self
    }

    /// Makes probing `input` fail as if ffprobe exited with `code`.
    #[must_use]
    pub fn with_failure(mut self, input: impl Into<PathBuf>, code: i32) -> Self {
        self.failures.insert(input.into(), code);
        self
    }

    pub fn calls(&self) -> Vec<PathBuf> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl DurationProbe for MockDurationProbe {
    fn probe_duration(&self, input: &Path) -> Result<f64, ProbeError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(input.to_path_buf());

        if let Some(&code) = self.failures.get(input) {
            return Err(ProbeError::ExitStatus {
                code: Some(code),
                stderr: format!("{}: Invalid data found when processing input", input.display()),
            });
        }
        self.durations
            .get(input)
            .copied()
            .ok_or_else(|| ProbeError::Unparsable("N/A".to_string()))
    }
}
