//! Turns elapsed seconds into per-task progress events.
//!
//! A `ProgressReporter` owns the sending half of its task's channel. The
//! terminal event is published by [`ProgressReporter::finish`], which consumes
//! the reporter and thereby closes the channel.

use crate::events::TaskEvent;
use crate::external::ProcessExit;
use crate::task::TaskId;
use crate::utils::format_duration;
use std::sync::mpsc::Sender;

/// Exit code reported when the engine was terminated by a signal.
pub const SIGNAL_EXIT_CODE: i32 = -1;

/// `elapsed / duration` as a percentage clamped to `0..=100` and rounded to
/// two decimals. `None` when there is no usable denominator.
#[must_use]
pub fn percent(elapsed: f64, duration: f64) -> Option<f64> {
    if !(duration.is_finite() && duration > 0.0 && elapsed.is_finite()) {
        return None;
    }
    let raw = (elapsed / duration * 100.0).clamp(0.0, 100.0);
    Some((raw * 100.0).round() / 100.0)
}

/// Final result of a task's process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Completed,
    Failed { code: i32 },
}

impl From<ProcessExit> for TaskOutcome {
    fn from(exit: ProcessExit) -> Self {
        match exit.code {
            Some(0) => Self::Completed,
            Some(code) => Self::Failed { code },
            None => Self::Failed {
                code: SIGNAL_EXIT_CODE,
            },
        }
    }
}

pub struct ProgressReporter {
    task_id: TaskId,
    duration: Option<f64>,
    sender: Sender<TaskEvent>,
    last_percent: Option<f64>,
    last_logged_threshold: i32,
    subscriber_gone: bool,
}

impl ProgressReporter {
    pub fn new(task_id: TaskId, duration: Option<f64>, sender: Sender<TaskEvent>) -> Self {
        let duration = duration.filter(|d| d.is_finite() && *d > 0.0);
        if duration.is_none() {
            log::warn!(
                "Task {task_id}: duration unknown or zero; only the final result will be reported"
            );
        }
        Self {
            task_id,
            duration,
            sender,
            last_percent: None,
            last_logged_threshold: -1,
            subscriber_gone: false,
        }
    }

    #[must_use]
    pub fn last_percent(&self) -> Option<f64> {
        self.last_percent
    }

    /// Publishes progress for `elapsed` seconds. Returns the published
    /// percentage, or `None` when nothing was sent (no duration, or a value
    /// below the last one).
    pub fn report_elapsed(&mut self, elapsed: f64) -> Option<f64> {
        let pct = percent(elapsed, self.duration?)?;
        if self.last_percent.is_some_and(|last| pct < last) {
            log::trace!(
                "Task {}: ignoring progress regression to {pct:.2}%",
                self.task_id
            );
            return None;
        }

        self.last_percent = Some(pct);
        self.log_milestone(pct, elapsed);
        self.publish(TaskEvent::progress(self.task_id.clone(), pct));
        Some(pct)
    }

    /// Publishes the terminal event and closes the channel.
    pub fn finish(mut self, outcome: TaskOutcome) {
        let event = match outcome {
            TaskOutcome::Completed => {
                log::info!(target: "ffpulse::progress", "Task {}: completed", self.task_id);
                TaskEvent::progress(self.task_id.clone(), 100.0)
            }
            TaskOutcome::Failed { code } => {
                log::error!(
                    target: "ffpulse::progress",
                    "Task {}: ffmpeg exited with code {code}",
                    self.task_id
                );
                TaskEvent::error(self.task_id.clone(), code)
            }
        };
        self.publish(event);
    }

    fn publish(&mut self, event: TaskEvent) {
        if self.sender.send(event).is_err() && !self.subscriber_gone {
            log::debug!("Task {}: subscriber dropped, events discarded", self.task_id);
            self.subscriber_gone = true;
        }
    }

    /// Logs at every 10% step.
    fn log_milestone(&mut self, pct: f64, elapsed: f64) {
        let threshold = (pct as i32 / 10) * 10;
        if threshold > self.last_logged_threshold {
            log::info!(
                target: "ffpulse::progress",
                "Task {}: {:.1}% complete | Time: {} / {}",
                self.task_id,
                pct,
                format_duration(elapsed),
                format_duration(self.duration.unwrap_or(0.0))
            );
            self.last_logged_threshold = threshold;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_percent_basic() {
        assert_eq!(percent(30.0, 120.0), Some(25.0));
        assert_eq!(percent(60.0, 120.0), Some(50.0));
        assert_eq!(percent(1.0, 3.0), Some(33.33));
        assert_eq!(percent(2.0, 3.0), Some(66.67));
    }

    #[test]
    fn test_percent_is_clamped() {
        assert_eq!(percent(500.0, 120.0), Some(100.0));
        assert_eq!(percent(-3.0, 120.0), Some(0.0));
        for e in [0.0, 0.5, 1.0, 59.99, 120.0, 1e9] {
            let p = percent(e, 120.0).unwrap();
            assert!((0.0..=100.0).contains(&p));
        }
    }

    #[test]
    fn test_percent_without_denominator() {
        assert_eq!(percent(10.0, 0.0), None);
        assert_eq!(percent(10.0, -1.0), None);
        assert_eq!(percent(10.0, f64::NAN), None);
        assert_eq!(percent(f64::NAN, 10.0), None);
    }

    #[test]
    fn test_percent_monotonic() {
        let mut last = 0.0;
        for i in 0..=1000 {
            let p = percent(i as f64 * 0.137, 97.3).unwrap();
            assert!(p >= last);
            last = p;
        }
    }

    #[test]
    fn test_reporter_publishes_then_terminal() {
        let (tx, rx) = mpsc::channel();
        let mut reporter = ProgressReporter::new(TaskId::new("a"), Some(120.0), tx);
        assert_eq!(reporter.report_elapsed(30.0), Some(25.0));
        assert_eq!(reporter.report_elapsed(60.0), Some(50.0));
        reporter.finish(TaskOutcome::Completed);

        let events: Vec<TaskEvent> = rx.iter().collect();
        assert_eq!(
            events,
            vec![
                TaskEvent::progress(TaskId::new("a"), 25.0),
                TaskEvent::progress(TaskId::new("a"), 50.0),
                TaskEvent::progress(TaskId::new("a"), 100.0),
            ]
        );
    }

    #[test]
    fn test_reporter_drops_regressions() {
        let (tx, rx) = mpsc::channel();
        let mut reporter = ProgressReporter::new(TaskId::new("a"), Some(100.0), tx);
        reporter.report_elapsed(40.0);
        assert_eq!(reporter.report_elapsed(20.0), None);
        assert_eq!(reporter.last_percent(), Some(40.0));
        drop(reporter);
        assert_eq!(rx.iter().count(), 1);
    }

    #[test]
    fn test_reporter_without_duration_only_terminal() {
        let (tx, rx) = mpsc::channel();
        let mut reporter = ProgressReporter::new(TaskId::new("z"), Some(0.0), tx);
        assert_eq!(reporter.report_elapsed(10.0), None);
        reporter.finish(TaskOutcome::Failed { code: 1 });
        let events: Vec<TaskEvent> = rx.iter().collect();
        assert_eq!(events, vec![TaskEvent::error(TaskId::new("z"), 1)]);
    }

    #[test]
    fn test_outcome_from_exit() {
        assert_eq!(
            TaskOutcome::from(ProcessExit { code: Some(0) }),
            TaskOutcome::Completed
        );
        assert_eq!(
            TaskOutcome::from(ProcessExit { code: Some(3) }),
            TaskOutcome::Failed { code: 3 }
        );
        assert_eq!(
            TaskOutcome::from(ProcessExit { code: None }),
            TaskOutcome::Failed {
                code: SIGNAL_EXIT_CODE
            }
        );
    }

    #[test]
    fn test_send_to_dropped_subscriber_is_harmless() {
        let (tx, rx) = mpsc::channel();
        drop(rx);
        let mut reporter = ProgressReporter::new(TaskId::new("gone"), Some(10.0), tx);
        assert_eq!(reporter.report_elapsed(5.0), Some(50.0));
        reporter.finish(TaskOutcome::Completed);
    }
}
