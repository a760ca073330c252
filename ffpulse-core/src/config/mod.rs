//! Configuration structures and constants for the ffpulse-core library.
//!
//! `CoreConfig` decides where the external binaries are found, where output
//! files go by default and how strictly duration probing is treated. It is
//! created by the host (e.g. ffpulse-cli), either directly, through
//! [`CoreConfigBuilder`], or from `FFPULSE_*` environment variables.

mod builder;

use crate::error::{CoreError, CoreResult};
use crate::external::{BinaryLocator, BinaryPaths, Platform};
use crate::external::locator::{default_dev_root, default_packaged_root};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub use builder::CoreConfigBuilder;

// Default constants

/// Default output directory, relative to the working directory.
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// How often a worker checks whether its process has exited after the
/// diagnostic stream closed.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

pub const ENV_PLATFORM: &str = "FFPULSE_PLATFORM";
pub const ENV_PACKAGED: &str = "FFPULSE_PACKAGED";
pub const ENV_DEV_RESOURCES_DIR: &str = "FFPULSE_DEV_RESOURCES_DIR";
pub const ENV_PACKAGED_RESOURCES_DIR: &str = "FFPULSE_PACKAGED_RESOURCES_DIR";
pub const ENV_FFMPEG_PATH: &str = "FFPULSE_FFMPEG_PATH";
pub const ENV_FFPROBE_PATH: &str = "FFPULSE_FFPROBE_PATH";
pub const ENV_OUTPUT_DIR: &str = "FFPULSE_OUTPUT_DIR";
pub const ENV_PROBE_POLICY: &str = "FFPULSE_PROBE_POLICY";

/// What a failed duration probe means for a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProbePolicy {
    /// The submission fails and no process is started.
    #[default]
    Strict,
    /// The task runs with an unknown duration and reports only its final result.
    Lenient,
}

impl FromStr for ProbePolicy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "lenient" => Ok(Self::Lenient),
            other => Err(CoreError::Config(format!(
                "unknown probe policy '{other}' (expected 'strict' or 'lenient')"
            ))),
        }
    }
}

/// Main configuration structure for the ffpulse-core library.
///
/// # Examples
///
/// ```rust
/// use ffpulse_core::config::{CoreConfigBuilder, ProbePolicy};
/// use std::path::PathBuf;
///
/// let config = CoreConfigBuilder::new()
///     .output_dir(PathBuf::from("/tmp/ffpulse-out"))
///     .packaged(true)
///     .probe_policy(ProbePolicy::Lenient)
///     .build();
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Platform family whose bundled binaries are used
    pub platform: Platform,

    /// Whether the application runs from a packaged bundle
    pub packaged: bool,

    /// Resource root used in development mode
    pub dev_resources_dir: PathBuf,

    /// Resource root used in packaged mode
    pub packaged_resources_dir: PathBuf,

    /// Explicit ffmpeg path, bypassing the locator
    pub engine_path: Option<PathBuf>,

    /// Explicit ffprobe path, bypassing the locator
    pub probe_path: Option<PathBuf>,

    /// Output directory for tasks that do not name one
    pub output_dir: PathBuf,

    pub probe_policy: ProbePolicy,

    pub poll_interval: Duration,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            platform: Platform::current(),
            packaged: false,
            dev_resources_dir: default_dev_root(),
            packaged_resources_dir: default_packaged_root(),
            engine_path: None,
            probe_path: None,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            probe_policy: ProbePolicy::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl CoreConfig {
    /// Defaults overridden by `FFPULSE_*` environment variables.
    pub fn from_env() -> CoreResult<Self> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Like [`CoreConfig::from_env`], reading variables through `lookup`.
    pub fn from_env_with<F>(lookup: F) -> CoreResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        if let Some(value) = var(ENV_PLATFORM) {
            config.platform = value
                .parse()
                .map_err(|e: String| CoreError::Config(format!("{ENV_PLATFORM}: {e}")))?;
        }
        if let Some(value) = var(ENV_PACKAGED) {
            config.packaged = parse_flag(ENV_PACKAGED, &value)?;
        }
        if let Some(value) = var(ENV_DEV_RESOURCES_DIR) {
            config.dev_resources_dir = PathBuf::from(value);
        }
        if let Some(value) = var(ENV_PACKAGED_RESOURCES_DIR) {
            config.packaged_resources_dir = PathBuf::from(value);
        }
        if let Some(value) = var(ENV_FFMPEG_PATH) {
            config.engine_path = Some(PathBuf::from(value));
        }
        if let Some(value) = var(ENV_FFPROBE_PATH) {
            config.probe_path = Some(PathBuf::from(value));
        }
        if let Some(value) = var(ENV_OUTPUT_DIR) {
            config.output_dir = PathBuf::from(value);
        }
        if let Some(value) = var(ENV_PROBE_POLICY) {
            config.probe_policy = value.parse()?;
        }

        Ok(config)
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.output_dir.as_os_str().is_empty() {
            return Err(CoreError::Config("output directory must not be empty".into()));
        }
        if self.poll_interval.is_zero() {
            return Err(CoreError::Config("poll interval must be greater than zero".into()));
        }
        Ok(())
    }

    #[must_use]
    pub fn locator(&self) -> BinaryLocator {
        BinaryLocator::new(&self.dev_resources_dir, &self.packaged_resources_dir)
    }

    /// Locator output with the explicit path overrides applied.
    #[must_use]
    pub fn binary_paths(&self) -> BinaryPaths {
        let located = self.locator().locate(self.platform, self.packaged);
        BinaryPaths {
            engine: self.engine_path.clone().unwrap_or(located.engine),
            probe: self.probe_path.clone().unwrap_or(located.probe),
        }
    }
}

fn parse_flag(key: &str, value: &str) -> CoreResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(CoreError::Config(format!("{key}: expected a boolean, got '{other}'"))),
    }
}
