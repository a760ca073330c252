// ffpulse-cli/src/lib.rs
//
// Library portion of the ffpulse CLI application.
// Contains argument definitions, command logic and output rendering.

pub mod cli;
pub mod commands;
pub mod logging;
pub mod output;

// Re-export items needed by the binary or integration tests
pub use cli::{BatchArgs, Cli, Commands, ProbeArgs, RunArgs};
