//! Command implementations for the CLI.
//!
//! Each submodule contains the implementation of a specific command. Helpers
//! shared by the task-running commands live here.

pub mod batch;
pub mod info;
pub mod probe;
pub mod run;

use crate::cli::Cli;
use crate::output::{JsonReporter, Reporter, TerminalReporter};
use ffpulse_core::orchestrator::TaskHandle;
use ffpulse_core::{CoreConfig, CoreConfigBuilder, EventKind, ProbePolicy, TaskId};

/// Core configuration from `FFPULSE_*` variables overridden by global flags.
pub fn core_config(cli: &Cli, lenient: bool) -> anyhow::Result<CoreConfig> {
    let mut builder = CoreConfigBuilder::from_config(CoreConfig::from_env()?);
    if cli.packaged {
        builder = builder.packaged(true);
    }
    if let Some(path) = &cli.ffmpeg {
        builder = builder.engine_path(path);
    }
    if let Some(path) = &cli.ffprobe {
        builder = builder.probe_path(path);
    }
    if lenient {
        builder = builder.probe_policy(ProbePolicy::Lenient);
    }
    Ok(builder.build())
}

pub fn reporter(json: bool) -> Box<dyn Reporter> {
    if json {
        Box::new(JsonReporter::new())
    } else {
        Box::new(TerminalReporter::new())
    }
}

/// How a followed task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskResult {
    Completed,
    Failed(i32),
    /// The event stream closed without a terminal event.
    Interrupted,
}

/// Forwards every event of `handle` to `reporter` until the stream closes.
pub fn follow(handle: TaskHandle, reporter: &dyn Reporter) -> (TaskId, TaskResult) {
    let id = handle.id().clone();
    let mut last = None;
    for event in handle.iter() {
        reporter.event(&event);
        last = Some(event.kind);
    }
    handle.wait();

    let result = match last {
        Some(EventKind::Error { error }) => TaskResult::Failed(error),
        Some(EventKind::Progress { progress }) if progress >= 100.0 => TaskResult::Completed,
        _ => {
            reporter.task_interrupted(&id);
            TaskResult::Interrupted
        }
    };
    (id, result)
}
