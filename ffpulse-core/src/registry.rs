//! In-memory table of active tasks.
//!
//! Every operation takes the single registry lock, so the table can be shared
//! freely between the submitting thread, task workers and cancellers. The lock
//! is never held while waiting on a process.

use crate::error::{CoreError, CoreResult};
use crate::external::{FfmpegProcess, ProcessExit};
use crate::task::{Task, TaskId, TaskStatus};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Process handle shared between a registry entry and its worker.
pub struct TaskControl {
    program: String,
    pid: Option<u32>,
    process: Mutex<Box<dyn FfmpegProcess>>,
    cancelled: AtomicBool,
}

impl TaskControl {
    pub fn new(program: impl Into<String>, process: Box<dyn FfmpegProcess>) -> Self {
        let pid = process.id();
        Self {
            program: program.into(),
            pid,
            process: Mutex::new(process),
            cancelled: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn try_wait(&self) -> CoreResult<Option<ProcessExit>> {
        self.process().try_wait()
    }

    /// Marks the task as cancelled and kills its process.
    pub fn cancel(&self) -> CoreResult<()> {
        self.cancelled.store(true, Ordering::SeqCst);
        log::debug!("Killing {} (pid {:?})", self.program, self.pid);
        self.process().kill()
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn process(&self) -> MutexGuard<'_, Box<dyn FfmpegProcess>> {
        self.process.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Registry-side record of a running task.
pub struct TaskEntry {
    task: Task,
    control: Arc<TaskControl>,
    output_path: PathBuf,
    started_at: Instant,
}

impl TaskEntry {
    pub(crate) fn new(task: Task, control: Arc<TaskControl>, output_path: PathBuf) -> Self {
        Self {
            task,
            control,
            output_path,
            started_at: Instant::now(),
        }
    }

    #[must_use]
    pub fn id(&self) -> &TaskId {
        &self.task.spec.id
    }

    #[must_use]
    pub fn status(&self) -> TaskStatus {
        self.task.status
    }

    #[must_use]
    pub fn duration_secs(&self) -> Option<f64> {
        self.task.duration_secs
    }

    #[must_use]
    pub fn control(&self) -> &Arc<TaskControl> {
        &self.control
    }

    #[must_use]
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub(crate) fn advance(&mut self, next: TaskStatus) -> bool {
        self.task.advance(next)
    }

    fn record_progress(&mut self, percent: f64) {
        if self.task.last_progress.is_none_or(|last| percent >= last) {
            self.task.last_progress = Some(percent);
        }
    }

    fn snapshot(&self) -> TaskSnapshot {
        TaskSnapshot {
            id: self.task.spec.id.clone(),
            status: self.task.status,
            duration_secs: self.task.duration_secs,
            last_progress: self.task.last_progress,
            input_path: self.task.spec.input_path.clone(),
            output_path: self.output_path.clone(),
            pid: self.control.pid(),
            running_for: self.elapsed(),
        }
    }
}

/// Point-in-time copy of an entry, returned by [`TaskRegistry::lookup`].
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSnapshot {
    pub id: TaskId,
    pub status: TaskStatus,
    pub duration_secs: Option<f64>,
    pub last_progress: Option<f64>,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub pid: Option<u32>,
    pub running_for: Duration,
}

#[derive(Default)]
struct RegistryState {
    active: HashMap<TaskId, TaskEntry>,
    /// Ids claimed by a submission that has not started its process yet.
    reserved: HashSet<TaskId>,
}

#[derive(Default)]
pub struct TaskRegistry {
    state: Mutex<RegistryState>,
}

impl TaskRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claims `id` for a submission in progress. The claim is released when
    /// the returned guard is dropped without registering.
    pub fn reserve(&self, id: &TaskId) -> CoreResult<Reservation<'_>> {
        let mut state = self.lock();
        if state.active.contains_key(id) || !state.reserved.insert(id.clone()) {
            return Err(CoreError::DuplicateTask(id.clone()));
        }
        Ok(Reservation {
            registry: self,
            id: id.clone(),
            armed: true,
        })
    }

    /// Adds an entry under its own id.
    pub fn register(&self, entry: TaskEntry) -> CoreResult<()> {
        let mut state = self.lock();
        let id = entry.id().clone();
        if state.active.contains_key(&id) || state.reserved.contains(&id) {
            return Err(CoreError::DuplicateTask(id));
        }
        log::debug!("Registered task {id}");
        state.active.insert(id, entry);
        Ok(())
    }

    #[must_use]
    pub fn lookup(&self, id: &TaskId) -> Option<TaskSnapshot> {
        self.lock().active.get(id).map(TaskEntry::snapshot)
    }

    #[must_use]
    pub fn contains(&self, id: &TaskId) -> bool {
        self.lock().active.contains_key(id)
    }

    /// Removes an entry. Returns `None` if it was already gone.
    pub fn retire(&self, id: &TaskId) -> Option<TaskEntry> {
        let entry = self.lock().active.remove(id);
        if entry.is_some() {
            log::debug!("Retired task {id}");
        }
        entry
    }

    /// Removes the entry for `id` only if it still holds `control`.
    pub fn retire_if_owner(&self, id: &TaskId, control: &Arc<TaskControl>) -> Option<TaskEntry> {
        let mut state = self.lock();
        let owned = state
            .active
            .get(id)
            .is_some_and(|entry| Arc::ptr_eq(&entry.control, control));
        if !owned {
            return None;
        }
        log::debug!("Retired task {id}");
        state.active.remove(id)
    }

    /// Applies a status transition. Returns `false` for unknown ids and
    /// illegal transitions.
    pub fn set_status(&self, id: &TaskId, status: TaskStatus) -> bool {
        self.lock()
            .active
            .get_mut(id)
            .is_some_and(|entry| entry.advance(status))
    }

    /// Stores the latest published percentage. Lower values are ignored.
    pub fn record_progress(&self, id: &TaskId, percent: f64) {
        if let Some(entry) = self.lock().active.get_mut(id) {
            entry.record_progress(percent);
        }
    }

    /// Runs `publish` under the registry lock while `control` still owns
    /// `id`, and records the percentage it returns. Returns `false` without
    /// calling `publish` once the task is retired, so nothing can be
    /// published after a cancel.
    pub fn publish_if_owner<F>(&self, id: &TaskId, control: &Arc<TaskControl>, publish: F) -> bool
    where
        F: FnOnce() -> Option<f64>,
    {
        let mut state = self.lock();
        let Some(entry) = state
            .active
            .get_mut(id)
            .filter(|entry| Arc::ptr_eq(&entry.control, control))
        else {
            return false;
        };
        if let Some(percent) = publish() {
            entry.record_progress(percent);
        }
        true
    }

    /// Ids of all active tasks, sorted.
    #[must_use]
    pub fn active_ids(&self) -> Vec<TaskId> {
        let mut ids: Vec<TaskId> = self.lock().active.keys().cloned().collect();
        ids.sort();
        ids
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().active.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn release(&self, id: &TaskId) {
        self.lock().reserved.remove(id);
    }
}

/// Claim on a task id, see [`TaskRegistry::reserve`].
pub struct Reservation<'a> {
    registry: &'a TaskRegistry,
    id: TaskId,
    armed: bool,
}

impl Reservation<'_> {
    #[must_use]
    pub fn id(&self) -> &TaskId {
        &self.id
    }

    /// Turns the claim into an active entry.
    pub fn register(mut self, entry: TaskEntry) {
        debug_assert_eq!(entry.id(), &self.id);
        let mut state = self.registry.lock();
        state.reserved.remove(&self.id);
        log::debug!("Registered task {}", self.id);
        state.active.insert(self.id.clone(), entry);
        self.armed = false;
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.registry.release(&self.id);
        }
    }
}
