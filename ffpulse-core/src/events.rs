//! Events published to task subscribers.
//!
//! On the wire an event is a flat JSON object:
//!
//! ```json
//! { "taskId": "job-1", "progress": 25.0 }
//! { "taskId": "job-1", "error": 1 }
//! ```

use crate::task::TaskId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskEvent {
    pub task_id: TaskId,
    #[serde(flatten)]
    pub kind: EventKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventKind {
    /// Percentage in `0.0..=100.0`, two-decimal granularity.
    Progress { progress: f64 },
    /// Non-zero exit code of the engine (`-1` when killed by a signal).
    Error { error: i32 },
}

impl TaskEvent {
    pub fn progress(task_id: TaskId, progress: f64) -> Self {
        Self {
            task_id,
            kind: EventKind::Progress { progress },
        }
    }

    pub fn error(task_id: TaskId, code: i32) -> Self {
        Self {
            task_id,
            kind: EventKind::Error { error: code },
        }
    }

    #[must_use]
    pub fn progress_value(&self) -> Option<f64> {
        match self.kind {
            EventKind::Progress { progress } => Some(progress),
            EventKind::Error { .. } => None,
        }
    }

    #[must_use]
    pub fn error_code(&self) -> Option<i32> {
        match self.kind {
            EventKind::Error { error } => Some(error),
            EventKind::Progress { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_progress_event_json_shape() {
        let event = TaskEvent::progress(TaskId::new("a"), 25.5);
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({ "taskId": "a", "progress": 25.5 })
        );
    }

    #[test]
    fn test_error_event_json_shape() {
        let event = TaskEvent::error(TaskId::new("b"), 1);
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({ "taskId": "b", "error": 1 })
        );
        assert_eq!(event.error_code(), Some(1));
        assert_eq!(event.progress_value(), None);
    }

    #[test]
    fn test_event_parses_back() {
        let event: TaskEvent = serde_json::from_str(r#"{"taskId":"c","progress":100.0}"#).unwrap();
        assert_eq!(event, TaskEvent::progress(TaskId::new("c"), 100.0));
    }
}
