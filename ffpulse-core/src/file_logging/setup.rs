use crate::error::{CoreError, CoreResult};
use log::LevelFilter;
use log4rs::{
    append::console::{ConsoleAppender, Target},
    append::file::FileAppender,
    config::{Appender, Config, Root},
    encode::pattern::PatternEncoder,
};
use std::path::Path;

/// Line format of the log file.
pub const LOG_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S)} [{l}] {m}{n}";

const CONSOLE_PATTERN: &str = "{h({l})} {m}{n}";

/// Installs the global logger: stderr always, plus `log_file` when given.
///
/// Fails if a logger is already installed or the file cannot be opened.
pub fn setup_logging(log_file: Option<&Path>, log_level: LevelFilter) -> CoreResult<()> {
    let config = build_config(log_file, log_level)?;
    log4rs::init_config(config).map_err(|e| CoreError::Logging(e.to_string()))?;
    Ok(())
}

fn build_config(log_file: Option<&Path>, log_level: LevelFilter) -> CoreResult<Config> {
    let console = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(CONSOLE_PATTERN)))
        .build();

    let mut builder =
        Config::builder().appender(Appender::builder().build("console", Box::new(console)));
    let mut root = Root::builder().appender("console");

    if let Some(log_file) = log_file {
        // Create log directory if it doesn't exist
        if let Some(parent) = log_file.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file_appender = FileAppender::builder()
            .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
            .build(log_file)?;

        builder = builder.appender(Appender::builder().build("file", Box::new(file_appender)));
        root = root.appender("file");
    }

    builder
        .build(root.build(log_level))
        .map_err(|e| CoreError::Logging(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creates_log_directory() {
        let dir = tempfile::tempdir().unwrap();
        let log_file = dir.path().join("logs").join("run.log");
        build_config(Some(&log_file), LevelFilter::Info).unwrap();
        assert!(log_file.exists());
    }

    #[test]
    fn test_console_only_config() {
        assert!(build_config(None, LevelFilter::Debug).is_ok());
    }
}
