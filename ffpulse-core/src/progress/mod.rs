//! Progress extraction and publication.
//!
//! [`parser`] turns raw ffmpeg stderr into elapsed seconds; [`reporter`]
//! turns elapsed seconds into percentages on a task's event channel.

pub mod parser;
pub mod reporter;

pub use parser::{DiagnosticTail, ProgressParser, ProgressStream, time_to_seconds};
pub use reporter::{ProgressReporter, SIGNAL_EXIT_CODE, TaskOutcome, percent};
