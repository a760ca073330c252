// ffpulse-cli/src/cli.rs
//
// Defines the command-line argument structures using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

// --- CLI Argument Definition ---

#[derive(Parser, Debug)]
#[command(
    author,
    version, // Reads from Cargo.toml via "cargo" feature in clap
    about = "ffpulse: run ffmpeg transcoding tasks with live progress",
    long_about = "Submits transcoding tasks to ffmpeg via ffpulse-core and reports their progress."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Also write the log to ffpulse_run_<timestamp>.log in this directory
    #[arg(long, global = true, value_name = "LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Use the binaries of the packaged bundle instead of the development tree
    #[arg(long, global = true)]
    pub packaged: bool,

    /// Print events and results as JSON lines on stdout
    #[arg(long, global = true)]
    pub json: bool,

    /// Path to ffmpeg, bypassing the bundled binary
    #[arg(long, global = true, value_name = "PATH", env = "FFPULSE_FFMPEG_PATH")]
    pub ffmpeg: Option<PathBuf>,

    /// Path to ffprobe, bypassing the bundled binary
    #[arg(long, global = true, value_name = "PATH", env = "FFPULSE_FFPROBE_PATH")]
    pub ffprobe: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Runs a single transcoding task
    Run(RunArgs),
    /// Runs every task of a JSON task list concurrently
    Batch(BatchArgs),
    /// Prints the duration of a media file
    Probe(ProbeArgs),
    /// Prints platform, binary locations and the ffmpeg version
    Info,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Task identifier used in events
    #[arg(long, value_name = "ID")]
    pub id: String,

    /// Input media file (probed for its duration)
    #[arg(short = 'i', long = "input", value_name = "INPUT_PATH")]
    pub input: PathBuf,

    /// File name of the output, appended to the ffmpeg arguments
    #[arg(short = 'n', long, value_name = "NAME")]
    pub output_name: String,

    /// Output directory (defaults to FFPULSE_OUTPUT_DIR or ./output)
    #[arg(short = 'o', long, value_name = "OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Run even if the duration cannot be probed (no percentages)
    #[arg(long)]
    pub lenient: bool,

    /// ffmpeg arguments, given after `--`
    #[arg(last = true, value_name = "FFMPEG_ARGS")]
    pub engine_args: Vec<String>,
}

#[derive(Args, Debug)]
pub struct BatchArgs {
    /// JSON array of {"id", "input", "outputName", "outputDir"?, "args"}
    #[arg(value_name = "TASKS_JSON")]
    pub tasks_file: PathBuf,

    /// Run tasks whose duration cannot be probed
    #[arg(long)]
    pub lenient: bool,
}

#[derive(Args, Debug)]
pub struct ProbeArgs {
    #[arg(value_name = "INPUT_PATH")]
    pub input: PathBuf,
}
