use crate::cli::{BatchArgs, Cli};
use crate::commands::{TaskResult, core_config, follow, reporter};
use anyhow::{Context, bail};
use ffpulse_core::utils::display_name;
use ffpulse_core::{ProcessOrchestrator, TaskId, TaskSpec};
use std::fs;
use std::path::Path;
use std::thread;

/// Reads a JSON array of task specs.
pub fn load_tasks(path: &Path) -> anyhow::Result<Vec<TaskSpec>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read tasks file '{}'", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Invalid tasks file '{}'", path.display()))
}

/// Submits every task, then follows all of them concurrently.
pub fn run(cli: &Cli, args: &BatchArgs) -> anyhow::Result<()> {
    let specs = load_tasks(&args.tasks_file)?;
    if specs.is_empty() {
        log::warn!("No tasks in {}", args.tasks_file.display());
        return Ok(());
    }

    let config = core_config(cli, args.lenient)?;
    let orchestrator = ProcessOrchestrator::from_config(&config)?;
    let reporter = reporter(cli.json);
    let total = specs.len();

    let mut failed = 0;
    let mut handles = Vec::with_capacity(total);
    for spec in specs {
        let id = spec.id.clone();
        let label = display_name(&spec.input_path);
        match orchestrator.submit(spec) {
            Ok(handle) => {
                reporter.task_started(handle.id(), &label);
                handles.push(handle);
            }
            Err(e) => {
                log::error!("Task '{id}' was not started: {e}");
                failed += 1;
            }
        }
    }

    let reporter = reporter.as_ref();
    let results: Vec<_> = thread::scope(|scope| {
        let followers: Vec<_> = handles
            .into_iter()
            .map(|handle| {
                let id = handle.id().clone();
                (id, scope.spawn(move || follow(handle, reporter).1))
            })
            .collect();
        followers
            .into_iter()
            .map(|(id, follower)| (id, follower.join().ok()))
            .collect()
    });
    failed += count_failures(&results);

    if failed > 0 {
        bail!("{failed} of {total} tasks failed");
    }
    log::info!("All {total} tasks completed");
    Ok(())
}

/// Logs each followed task's result and returns how many did not complete.
/// `None` marks a follower thread that panicked.
fn count_failures(results: &[(TaskId, Option<TaskResult>)]) -> usize {
    let mut failed = 0;
    for (id, result) in results {
        match result {
            Some(TaskResult::Completed) => log::info!("Task '{id}' completed"),
            Some(TaskResult::Failed(code)) => {
                log::error!("Task '{id}' failed with exit code {code}");
                failed += 1;
            }
            Some(TaskResult::Interrupted) => {
                log::warn!("Task '{id}' ended without a result");
                failed += 1;
            }
            None => {
                log::error!("Task '{id}': following its events panicked");
                failed += 1;
            }
        }
    }
    failed
}
