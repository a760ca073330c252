// ============================================================================
// ffpulse-core/src/orchestrator.rs
// ============================================================================
//
// PROCESS ORCHESTRATION: submission, supervision and cancellation of tasks
//
// A submission runs synchronously up to the point where the engine process
// has started: reserve the id, probe the duration, create the output
// directory, spawn ffmpeg, register the task. From then on a dedicated worker
// thread reads the process's stderr, publishes progress, waits for the exit
// and publishes exactly one terminal event, unless the task was cancelled.

use crate::config::{CoreConfig, ProbePolicy};
use crate::error::{CoreError, CoreResult};
use crate::events::TaskEvent;
use crate::external::{
    BinaryPaths, DurationProbe, EngineCommand, FfmpegProcess, FfmpegSpawner, FfprobeDurationProbe,
    ProcessExit, SidecarSpawner,
};
use crate::progress::{ProgressReporter, ProgressStream, TaskOutcome, SIGNAL_EXIT_CODE};
use crate::registry::{TaskControl, TaskEntry, TaskRegistry};
use crate::task::{Task, TaskId, TaskSpec, TaskStatus};
use crate::utils::{display_name, format_duration};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Starts engine processes for submitted tasks and tracks them until exit.
pub struct ProcessOrchestrator<P = FfprobeDurationProbe, S = SidecarSpawner> {
    paths: BinaryPaths,
    probe: P,
    spawner: S,
    registry: Arc<TaskRegistry>,
    output_dir: PathBuf,
    probe_policy: ProbePolicy,
    poll_interval: Duration,
}

impl ProcessOrchestrator {
    /// Orchestrator using the real ffprobe and ffmpeg binaries from `config`.
    pub fn from_config(config: &CoreConfig) -> CoreResult<Self> {
        let paths = config.binary_paths();
        let probe = FfprobeDurationProbe::new(&paths.probe);
        Self::with_parts(config, probe, SidecarSpawner)
    }
}

impl<P: DurationProbe, S: FfmpegSpawner> ProcessOrchestrator<P, S> {
    /// Orchestrator with injected probe and spawner implementations.
    pub fn with_parts(config: &CoreConfig, probe: P, spawner: S) -> CoreResult<Self> {
        config.validate()?;
        let paths = config.binary_paths();
        log::debug!(
            "Using ffmpeg at {} and ffprobe at {}",
            paths.engine.display(),
            paths.probe.display()
        );
        Ok(Self {
            paths,
            probe,
            spawner,
            registry: Arc::new(TaskRegistry::new()),
            output_dir: config.output_dir.clone(),
            probe_policy: config.probe_policy,
            poll_interval: config.poll_interval,
        })
    }

    #[must_use]
    pub fn binary_paths(&self) -> &BinaryPaths {
        &self.paths
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn probe(&self) -> &P {
        &self.probe
    }

    #[must_use]
    pub fn spawner(&self) -> &S {
        &self.spawner
    }

    /// Starts a task and returns the handle its events arrive on.
    ///
    /// Probe and spawn failures are returned here, before anything is
    /// registered. Failures of the running process arrive as a terminal
    /// error event instead.
    pub fn submit(&self, spec: TaskSpec) -> CoreResult<TaskHandle> {
        let reservation = self.registry.reserve(&spec.id)?;
        let mut task = Task::new(spec);
        let id = task.spec.id.clone();

        log::info!(
            "Task {id}: submitting {}",
            display_name(&task.spec.input_path)
        );

        task.advance(TaskStatus::Probing);
        task.duration_secs = match self.probe.probe_duration(&task.spec.input_path) {
            Ok(duration) => {
                log::info!("Task {id}: duration {}", format_duration(duration));
                Some(duration)
            }
            Err(e) if self.probe_policy == ProbePolicy::Lenient => {
                log::warn!("Task {id}: duration probe failed, continuing without progress: {e}");
                None
            }
            Err(e) => {
                log::error!("Task {id}: duration probe failed: {e}");
                task.advance(TaskStatus::Failed);
                return Err(e.into());
            }
        };

        let output_dir = task.spec.resolve_output_dir(&self.output_dir);
        if let Err(e) = std::fs::create_dir_all(&output_dir) {
            log::error!(
                "Task {id}: cannot create output directory {}: {e}",
                output_dir.display()
            );
            task.advance(TaskStatus::Failed);
            return Err(e.into());
        }
        let output_path = task.spec.resolve_output_path(&self.output_dir);
        let command = build_command(&self.paths.engine, &task.spec.arguments, &output_path);

        let mut process = match self.spawner.spawn(&command) {
            Ok(process) => process,
            Err(e) => {
                log::error!("Task {id}: failed to start ffmpeg: {e}");
                task.advance(TaskStatus::Failed);
                return Err(e);
            }
        };
        let diagnostics = process.take_diagnostics();
        let control = Arc::new(TaskControl::new(command.program_name(), Box::new(process)));

        task.advance(TaskStatus::Running);
        let (sender, events) = mpsc::channel();
        let reporter = ProgressReporter::new(id.clone(), task.duration_secs, sender);
        reservation.register(TaskEntry::new(task, Arc::clone(&control), output_path));

        let worker = TaskWorker {
            id: id.clone(),
            control: Arc::clone(&control),
            registry: Arc::clone(&self.registry),
            reporter,
            poll_interval: self.poll_interval,
        };
        let spawned = thread::Builder::new()
            .name(format!("ffpulse-task-{id}"))
            .spawn(move || worker.run(diagnostics));

        match spawned {
            Ok(join) => Ok(TaskHandle {
                id,
                events,
                worker: Some(join),
            }),
            Err(e) => {
                log::error!("Task {id}: failed to start worker thread: {e}");
                self.registry.retire_if_owner(&id, &control);
                if let Err(kill_err) = control.cancel() {
                    log::warn!("Task {id}: {kill_err}");
                }
                Err(CoreError::Io(e))
            }
        }
    }

    /// Stops an active task.
    ///
    /// The task is retired at once and its process killed; its event channel
    /// closes without a terminal event.
    pub fn cancel(&self, id: &TaskId) -> CoreResult<()> {
        let entry = self
            .registry
            .retire(id)
            .ok_or_else(|| CoreError::UnknownTask(id.clone()))?;
        log::info!("Task {id}: cancelling");
        entry.control().cancel()
    }

    /// Cancels every active task. Returns how many were cancelled.
    pub fn cancel_all(&self) -> usize {
        self.registry
            .active_ids()
            .iter()
            .filter(|id| match self.cancel(id) {
                Ok(()) => true,
                Err(CoreError::UnknownTask(_)) => false,
                Err(e) => {
                    log::warn!("Task {id}: {e}");
                    true
                }
            })
            .count()
    }
}

/// Caller arguments followed by the output path.
fn build_command(engine: &Path, arguments: &[String], output_path: &Path) -> EngineCommand {
    let mut args = arguments.to_vec();
    args.push(output_path.to_string_lossy().into_owned());
    EngineCommand {
        program: engine.to_path_buf(),
        args,
    }
}

/// Per-task event stream returned by [`ProcessOrchestrator::submit`].
///
/// The channel closes after the terminal event, or without one when the task
/// is cancelled.
pub struct TaskHandle {
    id: TaskId,
    events: Receiver<TaskEvent>,
    worker: Option<JoinHandle<()>>,
}

impl TaskHandle {
    #[must_use]
    pub fn id(&self) -> &TaskId {
        &self.id
    }

    #[must_use]
    pub fn events(&self) -> &Receiver<TaskEvent> {
        &self.events
    }

    /// Blocks for the next event; `None` once the channel is closed.
    pub fn recv(&self) -> Option<TaskEvent> {
        self.events.recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<TaskEvent, RecvTimeoutError> {
        self.events.recv_timeout(timeout)
    }

    pub fn iter(&self) -> mpsc::Iter<'_, TaskEvent> {
        self.events.iter()
    }

    /// Collects the remaining events and joins the worker thread.
    pub fn wait(mut self) -> Vec<TaskEvent> {
        let events: Vec<TaskEvent> = self.events.iter().collect();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("Task {}: worker thread panicked", self.id);
            }
        }
        events
    }
}

struct TaskWorker {
    id: TaskId,
    control: Arc<TaskControl>,
    registry: Arc<TaskRegistry>,
    reporter: ProgressReporter,
    poll_interval: Duration,
}

impl TaskWorker {
    fn run(mut self, diagnostics: Option<Box<dyn Read + Send>>) {
        let mut tail = String::new();
        if let Some(reader) = diagnostics {
            let mut stream = ProgressStream::new(reader);
            for elapsed in stream.by_ref() {
                // Keeps draining after a cancel so the process never blocks on stderr.
                let reporter = &mut self.reporter;
                self.registry.publish_if_owner(&self.id, &self.control, || {
                    reporter.report_elapsed(elapsed)
                });
            }
            tail = stream.tail().render();
        } else {
            log::warn!("Task {}: no diagnostic stream, progress unavailable", self.id);
        }

        let exit = self.wait_for_exit();

        // Cancellation retires the entry first; then nothing more is published.
        let Some(mut entry) = self.registry.retire_if_owner(&self.id, &self.control) else {
            if self.control.is_cancelled() {
                log::debug!("Task {}: cancelled, closing event stream", self.id);
            } else {
                log::warn!("Task {}: retired by another owner, closing event stream", self.id);
            }
            return;
        };

        let outcome = match exit {
            Ok(exit) => TaskOutcome::from(exit),
            Err(e) => {
                log::error!("Task {}: lost track of ffmpeg: {e}", self.id);
                TaskOutcome::Failed {
                    code: SIGNAL_EXIT_CODE,
                }
            }
        };

        match outcome {
            TaskOutcome::Completed => {
                entry.advance(TaskStatus::Completed);
                log::info!(
                    "Task {}: finished in {} -> {}",
                    self.id,
                    format_duration(entry.elapsed().as_secs_f64()),
                    entry.output_path().display()
                );
            }
            TaskOutcome::Failed { .. } => {
                entry.advance(TaskStatus::Failed);
                if !tail.is_empty() {
                    log::error!("Task {}: last ffmpeg output:\n{tail}", self.id);
                }
            }
        }

        self.reporter.finish(outcome);
    }

    fn wait_for_exit(&self) -> CoreResult<ProcessExit> {
        loop {
            if let Some(exit) = self.control.try_wait()? {
                log::debug!("Task {}: {} exited with {:?}", self.id, self.control.program(), exit.code);
                return Ok(exit);
            }
            thread::sleep(self.poll_interval);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CoreConfigBuilder;
    use crate::error::{ProbeError, command_start_error};
    use crate::external::mocks::{MockDurationProbe, MockFfmpegProcess, MockFfmpegSpawner};
    use std::io;
    use std::sync::atomic::Ordering;
    use tempfile::TempDir;

    const ENGINE: &str = "/mock/bin/ffmpeg";

    fn orchestrator(
        probe: MockDurationProbe,
        policy: ProbePolicy,
    ) -> (ProcessOrchestrator<MockDurationProbe, MockFfmpegSpawner>, TempDir) {
        let out = tempfile::tempdir().unwrap();
        let config = CoreConfigBuilder::new()
            .engine_path(ENGINE)
            .probe_path("/mock/bin/ffprobe")
            .output_dir(out.path())
            .probe_policy(policy)
            .poll_interval(Duration::from_millis(1))
            .build();
        let orchestrator =
            ProcessOrchestrator::with_parts(&config, probe, MockFfmpegSpawner::new()).unwrap();
        (orchestrator, out)
    }

    fn spec(id: &str, input: &str) -> TaskSpec {
        TaskSpec::new(id, input, format!("{id}.mp4")).with_arguments(["-i", input, "-c:v", "libx264"])
    }

    #[test]
    fn test_progress_then_completion() {
        let probe = MockDurationProbe::new().with_duration("/in/a.mov", 120.0);
        let (orch, out) = orchestrator(probe, ProbePolicy::Strict);
        orch.spawner().add_process(
            "a.mov",
            MockFfmpegProcess::scripted(
                [
                    "frame=  10 size=1kB time=00:00:30.00 bitrate=1kbits/s\r",
                    "frame=  20 size=2kB time=00:01:00.00 bitrate=1kbits/s\r",
                ],
                0,
            ),
        );

        let handle = orch.submit(spec("a", "/in/a.mov")).unwrap();
        let events = handle.wait();

        let id = TaskId::new("a");
        assert_eq!(
            events,
            vec![
                TaskEvent::progress(id.clone(), 25.0),
                TaskEvent::progress(id.clone(), 50.0),
                TaskEvent::progress(id.clone(), 100.0),
            ]
        );
        assert!(!orch.registry().contains(&id));

        let calls = orch.spawner().get_received_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].program, PathBuf::from(ENGINE));
        assert_eq!(
            calls[0].args.last().map(PathBuf::from),
            Some(out.path().join("a.mp4"))
        );
        assert_eq!(&calls[0].args[..4], ["-i", "/in/a.mov", "-c:v", "libx264"]);
    }

    #[test]
    fn test_probe_failure_rejects_before_spawn() {
        let probe = MockDurationProbe::new().with_failure("/in/bad.mov", 1);
        let (orch, _out) = orchestrator(probe, ProbePolicy::Strict);

        let err = orch.submit(spec("bad", "/in/bad.mov")).err().unwrap();
        assert!(matches!(
            err,
            CoreError::Probe(ProbeError::ExitStatus { code: Some(1), .. })
        ));
        assert!(orch.spawner().get_received_calls().is_empty());
        assert!(!orch.registry().contains(&TaskId::new("bad")));

        // The id is free again after a rejected submission.
        assert!(orch.registry().reserve(&TaskId::new("bad")).is_ok());
    }

    #[test]
    fn test_lenient_probe_failure_reports_only_terminal() {
        let probe = MockDurationProbe::new().with_failure("/in/odd.mov", 1);
        let (orch, _out) = orchestrator(probe, ProbePolicy::Lenient);
        orch.spawner().add_process(
            "odd.mov",
            MockFfmpegProcess::scripted(["time=00:00:30.00 x\r"], 0),
        );

        let events = orch.submit(spec("odd", "/in/odd.mov")).unwrap().wait();
        assert_eq!(events, vec![TaskEvent::progress(TaskId::new("odd"), 100.0)]);
    }

    #[test]
    fn test_engine_failure_reports_exit_code_only() {
        let probe = MockDurationProbe::new().with_duration("/in/b.mov", 120.0);
        let (orch, _out) = orchestrator(probe, ProbePolicy::Strict);
        orch.spawner().add_process(
            "b.mov",
            MockFfmpegProcess::scripted(["/in/b.mov: Invalid data found\n"], 1),
        );

        let events = orch.submit(spec("b", "/in/b.mov")).unwrap().wait();
        assert_eq!(events, vec![TaskEvent::error(TaskId::new("b"), 1)]);
        assert!(orch.registry().is_empty());
    }

    #[test]
    fn test_signal_termination_reports_minus_one() {
        let probe = MockDurationProbe::new().with_duration("/in/s.mov", 10.0);
        let (orch, _out) = orchestrator(probe, ProbePolicy::Strict);
        orch.spawner()
            .add_process("s.mov", MockFfmpegProcess::signalled(["time=00:00:05.00 x\r"]));

        let events = orch.submit(spec("s", "/in/s.mov")).unwrap().wait();
        assert_eq!(
            events,
            vec![
                TaskEvent::progress(TaskId::new("s"), 50.0),
                TaskEvent::error(TaskId::new("s"), SIGNAL_EXIT_CODE),
            ]
        );
    }

    #[test]
    fn test_spawn_failure_is_returned_and_not_registered() {
        let probe = MockDurationProbe::new().with_duration("/in/c.mov", 60.0);
        let (orch, _out) = orchestrator(probe, ProbePolicy::Strict);
        orch.spawner().add_spawn_error_expectation(
            "c.mov",
            command_start_error(ENGINE, io::Error::new(io::ErrorKind::NotFound, "missing")),
        );

        let err = orch.submit(spec("c", "/in/c.mov")).err().unwrap();
        assert!(matches!(err, CoreError::Spawn { .. }));
        assert!(!orch.registry().contains(&TaskId::new("c")));
    }

    #[test]
    fn test_concurrent_tasks_do_not_share_events() {
        let probe = MockDurationProbe::new()
            .with_duration("/in/x.mov", 100.0)
            .with_duration("/in/y.mov", 200.0);
        let (orch, _out) = orchestrator(probe, ProbePolicy::Strict);
        orch.spawner().add_process(
            "x.mov",
            MockFfmpegProcess::scripted(["time=00:00:10.00 a\r", "time=00:00:20.00 a\r"], 0),
        );
        orch.spawner().add_process(
            "y.mov",
            MockFfmpegProcess::scripted(["time=00:00:10.00 b\r"], 2),
        );

        let x = orch.submit(spec("x", "/in/x.mov")).unwrap();
        let y = orch.submit(spec("y", "/in/y.mov")).unwrap();
        let (x_events, y_events) = (x.wait(), y.wait());

        assert!(x_events.iter().all(|e| e.task_id.as_str() == "x"));
        assert!(y_events.iter().all(|e| e.task_id.as_str() == "y"));
        assert_eq!(x_events.last(), Some(&TaskEvent::progress(TaskId::new("x"), 100.0)));
        assert_eq!(
            y_events,
            vec![
                TaskEvent::progress(TaskId::new("y"), 5.0),
                TaskEvent::error(TaskId::new("y"), 2),
            ]
        );
    }

    #[test]
    fn test_duplicate_active_id_is_rejected() {
        let probe = MockDurationProbe::new().with_duration("/in/d.mov", 60.0);
        let (orch, _out) = orchestrator(probe, ProbePolicy::Strict);
        let process = MockFfmpegProcess::until_killed(["time=00:00:06.00 x\r"]);
        orch.spawner().add_process("d.mov", process);

        let handle = orch.submit(spec("d", "/in/d.mov")).unwrap();
        let err = orch.submit(spec("d", "/in/d.mov")).err().unwrap();
        assert!(matches!(err, CoreError::DuplicateTask(_)));
        // Only the first submission probed.
        assert_eq!(orch.probe().calls().len(), 1);

        orch.cancel(&TaskId::new("d")).unwrap();
        handle.wait();
    }

    #[test]
    fn test_cancel_kills_and_closes_without_terminal_event() {
        let probe = MockDurationProbe::new().with_duration("/in/e.mov", 60.0);
        let (orch, _out) = orchestrator(probe, ProbePolicy::Strict);
        let process = MockFfmpegProcess::until_killed(["time=00:00:06.00 x\r"]);
        let killed = process.kill_flag();
        orch.spawner().add_process("e.mov", process);

        let handle = orch.submit(spec("e", "/in/e.mov")).unwrap();
        let first = handle.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(first, TaskEvent::progress(TaskId::new("e"), 10.0));

        let snapshot = orch.registry().lookup(&TaskId::new("e")).unwrap();
        assert_eq!(snapshot.status, TaskStatus::Running);

        orch.cancel(&TaskId::new("e")).unwrap();
        assert!(killed.load(Ordering::SeqCst));
        assert!(!orch.registry().contains(&TaskId::new("e")));
        assert!(handle.wait().is_empty());

        assert!(matches!(
            orch.cancel(&TaskId::new("e")),
            Err(CoreError::UnknownTask(_))
        ));
    }

    #[test]
    fn test_id_reusable_after_completion() {
        let probe = MockDurationProbe::new().with_duration("/in/f.mov", 60.0);
        let (orch, _out) = orchestrator(probe, ProbePolicy::Strict);
        for _ in 0..2 {
            orch.spawner()
                .add_process("f.mov", MockFfmpegProcess::scripted(Vec::<&str>::new(), 0));
            let events = orch.submit(spec("f", "/in/f.mov")).unwrap().wait();
            assert_eq!(events, vec![TaskEvent::progress(TaskId::new("f"), 100.0)]);
        }
    }

    #[test]
    fn test_task_output_dir_is_created() {
        let probe = MockDurationProbe::new().with_duration("/in/g.mov", 60.0);
        let (orch, out) = orchestrator(probe, ProbePolicy::Strict);
        orch.spawner()
            .add_process("g.mov", MockFfmpegProcess::scripted(Vec::<&str>::new(), 0));

        let nested = out.path().join("nested").join("dir");
        let handle = orch
            .submit(spec("g", "/in/g.mov").with_output_dir(&nested))
            .unwrap();
        handle.wait();
        assert!(nested.is_dir());

        let calls = orch.spawner().get_received_calls();
        assert_eq!(
            calls[0].args.last().map(PathBuf::from),
            Some(nested.join("g.mp4"))
        );
    }
}
