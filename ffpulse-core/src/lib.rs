//! Core library for running ffmpeg transcoding tasks with live progress.
//!
//! This crate locates the bundled ffmpeg/ffprobe binaries, probes input
//! duration, spawns one engine process per task and turns the engine's
//! `time=` status output into per-task percentage events.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use ffpulse_core::{CoreConfig, ProcessOrchestrator, TaskSpec};
//!
//! let config = CoreConfig::from_env().unwrap();
//! let orchestrator = ProcessOrchestrator::from_config(&config).unwrap();
//!
//! let spec = TaskSpec::new("job-1", "/videos/in.mov", "in.mp4")
//!     .with_arguments(["-i", "/videos/in.mov", "-c:v", "libx264"]);
//! let handle = orchestrator.submit(spec).unwrap();
//!
//! for event in handle.iter() {
//!     println!("{}", serde_json::to_string(&event).unwrap());
//! }
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod external;
pub mod file_logging;
pub mod orchestrator;
pub mod progress;
pub mod registry;
pub mod task;
pub mod utils;

// Re-exports for public API
pub use config::{CoreConfig, CoreConfigBuilder, ProbePolicy};
pub use error::{CoreError, CoreResult, ProbeError};
pub use events::{EventKind, TaskEvent};
pub use external::{BinaryLocator, BinaryPaths, DurationProbe, Platform, engine_version};
pub use orchestrator::{ProcessOrchestrator, TaskHandle};
pub use progress::{ProgressParser, ProgressReporter, percent, time_to_seconds};
pub use registry::{TaskRegistry, TaskSnapshot};
pub use task::{TaskId, TaskSpec, TaskStatus};
pub use utils::format_duration;
