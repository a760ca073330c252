//! Log output setup for hosts of the core library.
//!
//! The library itself only emits records through the `log` facade; a host
//! calls [`setup_logging`] once at startup to route them to stderr and,
//! optionally, a log file.

pub mod setup;

pub use setup::{LOG_PATTERN, setup_logging};
