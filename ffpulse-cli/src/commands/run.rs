use crate::cli::{Cli, RunArgs};
use crate::commands::{TaskResult, core_config, follow, reporter};
use anyhow::{Context, bail};
use ffpulse_core::utils::display_name;
use ffpulse_core::{ProcessOrchestrator, TaskSpec};

/// Submits one task and renders its events until it ends.
pub fn run(cli: &Cli, args: &RunArgs) -> anyhow::Result<()> {
    let config = core_config(cli, args.lenient)?;
    let orchestrator = ProcessOrchestrator::from_config(&config)?;

    let mut spec = TaskSpec::new(args.id.as_str(), &args.input, &args.output_name)
        .with_arguments(args.engine_args.iter().cloned());
    if let Some(dir) = &args.output_dir {
        spec = spec.with_output_dir(dir);
    }

    let reporter = reporter(cli.json);
    let handle = orchestrator
        .submit(spec)
        .with_context(|| format!("Failed to start task '{}'", args.id))?;
    reporter.task_started(handle.id(), &display_name(&args.input));

    match follow(handle, reporter.as_ref()) {
        (_, TaskResult::Completed) => Ok(()),
        (id, TaskResult::Failed(code)) => bail!("Task '{id}' failed: ffmpeg exited with code {code}"),
        (id, TaskResult::Interrupted) => bail!("Task '{id}' ended without a result"),
    }
}
