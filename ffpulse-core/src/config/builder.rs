// ============================================================================
// ffpulse-core/src/config/builder.rs
// ============================================================================
//
// CONFIGURATION BUILDER: Builder Pattern for CoreConfig
//
// Fluent construction of CoreConfig. Every field has a default, so `build`
// cannot fail; call `CoreConfig::validate` before use.

// ---- Standard library imports ----
use std::path::PathBuf;
use std::time::Duration;

// ---- Internal crate imports ----
use super::{CoreConfig, ProbePolicy};
use crate::external::Platform;

/// Builder for creating CoreConfig instances.
///
/// # Examples
///
/// ```rust
/// use ffpulse_core::config::CoreConfigBuilder;
/// use std::time::Duration;
///
/// let config = CoreConfigBuilder::new()
///     .engine_path("/usr/bin/ffmpeg")
///     .probe_path("/usr/bin/ffprobe")
///     .poll_interval(Duration::from_millis(20))
///     .build();
/// assert_eq!(config.binary_paths().engine.to_str(), Some("/usr/bin/ffmpeg"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct CoreConfigBuilder {
    config: CoreConfig,
}

impl CoreConfigBuilder {
    /// Creates a new CoreConfigBuilder with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing configuration, e.g. one read from the environment.
    pub fn from_config(config: CoreConfig) -> Self {
        Self { config }
    }

    pub fn platform(mut self, platform: Platform) -> Self {
        self.config.platform = platform;
        self
    }

    pub fn packaged(mut self, packaged: bool) -> Self {
        self.config.packaged = packaged;
        self
    }

    pub fn dev_resources_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.dev_resources_dir = dir.into();
        self
    }

    pub fn packaged_resources_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.packaged_resources_dir = dir.into();
        self
    }

    /// Uses this ffmpeg instead of the bundled one.
    pub fn engine_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.engine_path = Some(path.into());
        self
    }

    /// Uses this ffprobe instead of the bundled one.
    pub fn probe_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.probe_path = Some(path.into());
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn probe_policy(mut self, policy: ProbePolicy) -> Self {
        self.config.probe_policy = policy;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    pub fn build(self) -> CoreConfig {
        self.config
    }
}
