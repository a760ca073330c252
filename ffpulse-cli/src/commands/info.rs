use crate::cli::Cli;
use crate::commands::core_config;
use crate::output::{JsonReporter, print_info};
use ffpulse_core::engine_version;
use serde_json::json;

/// Shows where the binaries are expected and whether ffmpeg runs.
pub fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = core_config(cli, false)?;
    let paths = config.binary_paths();
    let version = engine_version(&paths.engine);

    if cli.json {
        JsonReporter::new().write_value(&json!({
            "platform": config.platform.to_string(),
            "packaged": config.packaged,
            "ffmpeg": paths.engine,
            "ffprobe": paths.probe,
            "outputDir": config.output_dir,
            "ffmpegVersion": version.as_ref().ok(),
        }));
        return Ok(());
    }

    print_info("Platform", config.platform);
    print_info("Packaged", config.packaged);
    print_info("ffmpeg", paths.engine.display());
    print_info("ffprobe", paths.probe.display());
    print_info("Output directory", config.output_dir.display());
    match version {
        Ok(version) => print_info("ffmpeg version", version),
        Err(e) => print_info("ffmpeg version", format!("unavailable ({e})")),
    }
    Ok(())
}
