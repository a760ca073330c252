//! Task identity, submission parameters and the status state machine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Caller-chosen identifier of a transcoding task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for TaskId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Lifecycle state of a task.
///
/// Transitions only move forward:
/// `Pending -> Probing -> Running -> {Completed | Failed}`. A task that fails
/// before its process starts may go straight to `Failed` from `Pending` or
/// `Probing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Probing,
    Running,
    Completed,
    Failed,
}

impl TaskStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether `next` is a legal successor of `self`.
    #[must_use]
    pub fn can_advance_to(self, next: TaskStatus) -> bool {
        use TaskStatus::*;
        matches!(
            (self, next),
            (Pending, Probing)
                | (Probing, Running)
                | (Running, Completed)
                | (Pending | Probing | Running, Failed)
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Probing => "probing",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Everything a caller supplies when submitting a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSpec {
    pub id: TaskId,
    #[serde(rename = "input")]
    pub input_path: PathBuf,
    #[serde(rename = "outputName")]
    pub output_file_name: String,
    /// Falls back to the configured default output directory when absent.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    /// Engine arguments, without the output path.
    #[serde(default, rename = "args")]
    pub arguments: Vec<String>,
}

impl TaskSpec {
    pub fn new(
        id: impl Into<TaskId>,
        input_path: impl Into<PathBuf>,
        output_file_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            input_path: input_path.into(),
            output_file_name: output_file_name.into(),
            output_dir: None,
            arguments: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn with_arguments<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arguments = args.into_iter().map(Into::into).collect();
        self
    }

    /// Directory the output file is written to.
    #[must_use]
    pub fn resolve_output_dir(&self, default_dir: &Path) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| default_dir.to_path_buf())
    }

    /// Full output path appended to the engine arguments.
    #[must_use]
    pub fn resolve_output_path(&self, default_dir: &Path) -> PathBuf {
        self.resolve_output_dir(default_dir)
            .join(&self.output_file_name)
    }
}

/// Live state of one task, owned by the submitter and then by the registry.
#[derive(Debug)]
pub(crate) struct Task {
    pub spec: TaskSpec,
    pub status: TaskStatus,
    pub duration_secs: Option<f64>,
    pub last_progress: Option<f64>,
}

impl Task {
    pub fn new(spec: TaskSpec) -> Self {
        Self {
            spec,
            status: TaskStatus::Pending,
            duration_secs: None,
            last_progress: None,
        }
    }

    /// Moves to `next`, ignoring (and logging) illegal transitions.
    pub fn advance(&mut self, next: TaskStatus) -> bool {
        if self.status.can_advance_to(next) {
            log::debug!("Task {}: {} -> {}", self.spec.id, self.status, next);
            self.status = next;
            true
        } else {
            log::warn!(
                "Task {}: refusing status change {} -> {}",
                self.spec.id,
                self.status,
                next
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_transitions() {
        assert!(TaskStatus::Pending.can_advance_to(TaskStatus::Probing));
        assert!(TaskStatus::Probing.can_advance_to(TaskStatus::Running));
        assert!(TaskStatus::Running.can_advance_to(TaskStatus::Completed));
        assert!(TaskStatus::Running.can_advance_to(TaskStatus::Failed));
        assert!(TaskStatus::Probing.can_advance_to(TaskStatus::Failed));
    }

    #[test]
    fn test_no_backward_or_terminal_exits() {
        assert!(!TaskStatus::Running.can_advance_to(TaskStatus::Probing));
        assert!(!TaskStatus::Completed.can_advance_to(TaskStatus::Running));
        assert!(!TaskStatus::Failed.can_advance_to(TaskStatus::Running));
        assert!(!TaskStatus::Completed.can_advance_to(TaskStatus::Failed));
        assert!(!TaskStatus::Pending.can_advance_to(TaskStatus::Completed));
        assert!(!TaskStatus::Pending.can_advance_to(TaskStatus::Running));
    }

    #[test]
    fn test_task_advance_refuses_illegal_steps() {
        let mut task = Task::new(TaskSpec::new("t1", "in.mkv", "out.mkv"));
        assert!(task.advance(TaskStatus::Probing));
        assert!(task.advance(TaskStatus::Running));
        assert!(task.advance(TaskStatus::Completed));
        assert!(!task.advance(TaskStatus::Running));
        assert_eq!(task.status, TaskStatus::Completed);
    }

    #[test]
    fn test_output_path_resolution() {
        let default_dir = Path::new("/videos/output");
        let spec = TaskSpec::new("a", "/in/movie.mkv", "movie.mp4");
        assert_eq!(
            spec.resolve_output_path(default_dir),
            PathBuf::from("/videos/output/movie.mp4")
        );

        let spec = spec.with_output_dir("/elsewhere");
        assert_eq!(
            spec.resolve_output_path(default_dir),
            PathBuf::from("/elsewhere/movie.mp4")
        );
    }

    #[test]
    fn test_spec_deserializes_from_batch_json() {
        let json = r#"{
            "id": "job-1",
            "input": "/in/a.mov",
            "outputName": "a.mp4",
            "args": ["-i", "/in/a.mov", "-c:v", "libx264"]
        }"#;
        let spec: TaskSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.id, TaskId::new("job-1"));
        assert_eq!(spec.output_dir, None);
        assert_eq!(spec.arguments.len(), 4);
    }
}
