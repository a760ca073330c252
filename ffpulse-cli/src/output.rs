// ============================================================================
// ffpulse-cli/src/output.rs
// ============================================================================
//
// OUTPUT: rendering of task events and command results
//
// KEY COMPONENTS:
// - Reporter: sink for the events of one or more running tasks
// - TerminalReporter: one indicatif bar per task on stderr
// - JsonReporter: one serialized TaskEvent per line on stdout

use console::style;
use ffpulse_core::{EventKind, TaskEvent, TaskId};
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::collections::HashMap;
use std::fmt::Display;
use std::io::{self, IsTerminal, Write};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Bar length; positions are percentages with two decimals.
const BAR_SCALE: f64 = 100.0;
const BAR_LENGTH: u64 = 100 * 100;

/// Receives task lifecycle notifications and events. Shared between the
/// threads following individual tasks.
pub trait Reporter: Send + Sync {
    fn task_started(&self, id: &TaskId, label: &str);
    fn event(&self, event: &TaskEvent);
    /// The channel of `id` closed without a terminal event.
    fn task_interrupted(&self, id: &TaskId);
}

pub struct TerminalReporter {
    multi: MultiProgress,
    bars: Mutex<HashMap<TaskId, ProgressBar>>,
}

impl Default for TerminalReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalReporter {
    pub fn new() -> Self {
        let multi = MultiProgress::new();
        if !io::stderr().is_terminal() {
            multi.set_draw_target(ProgressDrawTarget::hidden());
        }
        Self {
            multi,
            bars: Mutex::new(HashMap::new()),
        }
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{spinner:.green} {prefix:<12} [{bar:30.cyan/blue}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##.")
    }

    fn with_bar(&self, id: &TaskId, f: impl FnOnce(&ProgressBar)) {
        let bars = self.bars.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(bar) = bars.get(id) {
            f(bar);
        }
    }
}

impl Reporter for TerminalReporter {
    fn task_started(&self, id: &TaskId, label: &str) {
        let bar = self.multi.add(ProgressBar::new(BAR_LENGTH));
        bar.set_style(Self::bar_style());
        bar.set_prefix(id.to_string());
        bar.set_message(format!("  0.0% {label}"));
        bar.enable_steady_tick(Duration::from_millis(100));
        self.bars
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.clone(), bar);
    }

    fn event(&self, event: &TaskEvent) {
        self.with_bar(&event.task_id, |bar| match event.kind {
            EventKind::Progress { progress } if progress >= 100.0 => {
                bar.set_position(BAR_LENGTH);
                bar.finish_with_message(format!("{}", style("done").green()));
            }
            EventKind::Progress { progress } => {
                bar.set_position((progress * BAR_SCALE) as u64);
                bar.set_message(format!("{progress:>5.1}%"));
            }
            EventKind::Error { error } => {
                bar.abandon_with_message(format!(
                    "{}",
                    style(format!("failed (exit code {error})")).red().bold()
                ));
            }
        });
    }

    fn task_interrupted(&self, id: &TaskId) {
        self.with_bar(id, |bar| {
            bar.abandon_with_message(format!("{}", style("interrupted").yellow()));
        });
    }
}

/// Writes each event as one JSON object per line.
pub struct JsonReporter {
    output: Mutex<Box<dyn Write + Send>>,
}

impl Default for JsonReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonReporter {
    /// Create a JSON reporter that writes to stdout
    pub fn new() -> Self {
        Self::with_writer(Box::new(io::stdout()))
    }

    /// Create a JSON reporter with a custom writer
    pub fn with_writer(writer: Box<dyn Write + Send>) -> Self {
        Self {
            output: Mutex::new(writer),
        }
    }

    pub fn write_value<T: serde::Serialize + ?Sized>(&self, value: &T) {
        let mut output = self.output.lock().unwrap_or_else(PoisonError::into_inner);
        match serde_json::to_string(value) {
            Ok(line) => {
                let _ = writeln!(output, "{line}");
                let _ = output.flush();
            }
            Err(e) => log::warn!("Failed to serialize output: {e}"),
        }
    }
}

impl Reporter for JsonReporter {
    fn task_started(&self, _id: &TaskId, _label: &str) {}

    fn event(&self, event: &TaskEvent) {
        self.write_value(event);
    }

    fn task_interrupted(&self, _id: &TaskId) {}
}

/// Print an info line with label and value, with the label styled
pub fn print_info<T: Display>(label: &str, value: T) {
    println!("{}: {}", style(label).cyan(), value);
}

/// Print an error message with red styling
pub fn print_error(message: &str) {
    eprintln!("{} {}", style("Error:").red().bold(), message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_json_reporter_writes_one_line_per_event() {
        let buf = SharedBuf::default();
        let reporter = JsonReporter::with_writer(Box::new(buf.clone()));
        let id = TaskId::new("job-1");

        reporter.task_started(&id, "in.mov");
        reporter.event(&TaskEvent::progress(id.clone(), 25.0));
        reporter.event(&TaskEvent::error(id.clone(), 1));

        let text = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            [
                r#"{"taskId":"job-1","progress":25.0}"#,
                r#"{"taskId":"job-1","error":1}"#,
            ]
        );
    }

    #[test]
    fn test_terminal_reporter_tracks_bars() {
        let reporter = TerminalReporter::new();
        reporter.multi.set_draw_target(ProgressDrawTarget::hidden());
        let id = TaskId::new("a");
        reporter.task_started(&id, "in.mov");
        reporter.event(&TaskEvent::progress(id.clone(), 42.5));

        let bars = reporter.bars.lock().unwrap();
        assert_eq!(bars[&id].position(), 4250);
        drop(bars);

        reporter.event(&TaskEvent::progress(id.clone(), 100.0));
        assert!(reporter.bars.lock().unwrap()[&id].is_finished());
        // Unknown ids are ignored.
        reporter.event(&TaskEvent::progress(TaskId::new("zzz"), 1.0));
    }
}
