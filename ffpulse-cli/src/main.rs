// ffpulse-cli/src/main.rs
//
// Entry point of the `ffpulse` binary: parses arguments, sets up logging,
// dispatches to the command implementations and maps failures to a non-zero
// exit code.

use clap::Parser;
use ffpulse_cli::output::print_error;
use ffpulse_cli::{Cli, Commands, commands, logging};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match logging::init(cli.verbose, cli.log_dir.as_deref()) {
        Ok(Some(log_file)) => log::debug!("Logging to {}", log_file.display()),
        Ok(None) => {}
        Err(e) => {
            print_error(&format!("{e:#}"));
            return ExitCode::FAILURE;
        }
    }

    let result = match &cli.command {
        Commands::Run(args) => commands::run::run(&cli, args),
        Commands::Batch(args) => commands::batch::run(&cli, args),
        Commands::Probe(args) => commands::probe::run(&cli, args),
        Commands::Info => commands::info::run(&cli),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e:#}");
            print_error(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}
