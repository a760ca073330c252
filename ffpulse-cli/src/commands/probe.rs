use crate::cli::{Cli, ProbeArgs};
use crate::commands::core_config;
use crate::output::{JsonReporter, print_info};
use anyhow::Context;
use ffpulse_core::external::{DurationProbe, FfprobeDurationProbe};
use ffpulse_core::format_duration;
use serde_json::json;

pub fn run(cli: &Cli, args: &ProbeArgs) -> anyhow::Result<()> {
    let config = core_config(cli, false)?;
    let probe = FfprobeDurationProbe::new(config.binary_paths().probe);
    let duration = probe
        .probe_duration(&args.input)
        .with_context(|| format!("Failed to probe '{}'", args.input.display()))?;

    if cli.json {
        JsonReporter::new().write_value(&json!({
            "input": args.input,
            "durationSecs": duration,
        }));
    } else {
        print_info("Input", args.input.display());
        print_info("Duration", format!("{duration:.3}s ({})", format_duration(duration)));
    }
    Ok(())
}
