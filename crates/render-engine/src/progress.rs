//! Process-wide render progress.
//!
//! The tracker keeps the latest snapshot per project and nothing else.
//! Each job writes through its own [`JobProgress`] handle; starting a new
//! job for a project invalidates the previous handle, so a stale job can
//! never overwrite the snapshot of the one that replaced it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;

use reelcut_project_model::project::ProjectId;

/// Progress value recorded when a job fails.
pub const PROGRESS_FAILED: i32 = -1;

/// Upper bound on the characters of a failure stage label.
pub const MAX_STAGE_CHARS: usize = 120;

const PLAN_READY: i32 = 5;
const SEGMENTS_SPAN: f64 = 75.0;
const JOINING: i32 = 83;
const COMPLETE: i32 = 100;

/// Point-in-time readout of one project's render.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RenderProgress {
    /// Percent complete in `[0, 100]`, or [`PROGRESS_FAILED`].
    pub progress: i32,

    /// Human-readable stage label.
    pub stage: String,
}

impl RenderProgress {
    pub fn new(progress: i32, stage: impl Into<String>) -> Self {
        Self {
            progress,
            stage: stage.into(),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.progress == PROGRESS_FAILED
    }

    pub fn is_complete(&self) -> bool {
        self.progress == COMPLETE
    }
}

/// Callback invoked after every accepted progress update.
pub type ProgressListener = Box<dyn Fn(ProjectId, &RenderProgress) + Send + Sync>;

#[derive(Debug)]
struct Entry {
    job: u64,
    snapshot: RenderProgress,
    terminal: bool,
}

/// Synchronized map from project id to its latest progress snapshot.
#[derive(Default)]
pub struct ProgressTracker {
    entries: RwLock<HashMap<ProjectId, Entry>>,
    listeners: RwLock<Vec<ProgressListener>>,
    next_job: AtomicU64,
}

impl std::fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("entries", &*self.read_entries())
            .finish_non_exhaustive()
    }
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for every accepted update of every job.
    pub fn subscribe(&self, listener: ProgressListener) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    /// Start tracking a new job for `project_id`.
    ///
    /// Resets the snapshot to `0 / "preparing"` and returns the only handle
    /// allowed to update it until the next `begin` for the same project.
    pub fn begin(self: &Arc<Self>, project_id: ProjectId) -> JobProgress {
        let job = self.next_job.fetch_add(1, Ordering::Relaxed) + 1;
        let snapshot = RenderProgress::new(0, "preparing");
        self.write_entries().insert(
            project_id,
            Entry {
                job,
                snapshot: snapshot.clone(),
                terminal: false,
            },
        );
        self.notify(project_id, &snapshot);

        JobProgress {
            tracker: Arc::clone(self),
            project_id,
            job,
        }
    }

    /// Latest snapshot, or the default (`0`, empty stage) when no job has
    /// run for this project.
    pub fn get(&self, project_id: ProjectId) -> RenderProgress {
        self.read_entries()
            .get(&project_id)
            .map(|entry| entry.snapshot.clone())
            .unwrap_or_default()
    }

    /// Whether a job has ever reported for this project.
    pub fn contains(&self, project_id: ProjectId) -> bool {
        self.read_entries().contains_key(&project_id)
    }

    fn update(&self, project_id: ProjectId, job: u64, progress: i32, stage: String) -> bool {
        let snapshot = {
            let mut entries = self.write_entries();
            let Some(entry) = entries.get_mut(&project_id) else {
                return false;
            };
            if entry.job != job || entry.terminal {
                return false;
            }

            if progress == PROGRESS_FAILED {
                entry.terminal = true;
                entry.snapshot = RenderProgress::new(progress, stage);
            } else {
                // Never move backwards within a job.
                let progress = progress.clamp(entry.snapshot.progress, COMPLETE);
                entry.terminal = progress == COMPLETE;
                entry.snapshot = RenderProgress::new(progress, stage);
            }
            entry.snapshot.clone()
        };

        self.notify(project_id, &snapshot);
        true
    }

    fn notify(&self, project_id: ProjectId, snapshot: &RenderProgress) {
        let listeners = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        for listener in listeners.iter() {
            listener(project_id, snapshot);
        }
    }

    fn read_entries(&self) -> RwLockReadGuard<'_, HashMap<ProjectId, Entry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_entries(&self) -> RwLockWriteGuard<'_, HashMap<ProjectId, Entry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Write handle for one job's progress.
///
/// Every method returns whether the update was recorded. Updates are
/// dropped after the job completed or failed, or once a newer job for the
/// same project has begun.
#[derive(Debug, Clone)]
pub struct JobProgress {
    tracker: Arc<ProgressTracker>,
    project_id: ProjectId,
    job: u64,
}

impl JobProgress {
    pub fn project_id(&self) -> ProjectId {
        self.project_id
    }

    pub fn report(&self, progress: i32, stage: impl Into<String>) -> bool {
        self.tracker
            .update(self.project_id, self.job, progress, stage.into())
    }

    /// The plan is chosen and encoding begins.
    pub fn plan_ready(&self, extracting: bool) -> bool {
        let stage = if extracting {
            "extracting segments"
        } else {
            "encoding"
        };
        self.report(PLAN_READY, stage)
    }

    /// Segment `done` of `total` finished encoding.
    pub fn segment_done(&self, done: usize, total: usize) -> bool {
        self.report(
            segment_checkpoint(done, total),
            format!("segment {done}/{total} rendering"),
        )
    }

    pub fn joining(&self) -> bool {
        self.report(JOINING, "joining segments")
    }

    pub fn complete(&self) -> bool {
        self.report(COMPLETE, "complete")
    }

    /// Record a terminal failure with a bounded summary of `message`.
    pub fn fail(&self, message: &str) -> bool {
        self.report(PROGRESS_FAILED, failure_stage(message))
    }
}

/// Percentage after `done` of `total` segments.
pub fn segment_checkpoint(done: usize, total: usize) -> i32 {
    if total == 0 {
        return PLAN_READY;
    }
    let fraction = done.min(total) as f64 / total as f64;
    PLAN_READY + (fraction * SEGMENTS_SPAN).round() as i32
}

/// `error: <message>` truncated on a character boundary to
/// [`MAX_STAGE_CHARS`] characters.
pub fn failure_stage(message: &str) -> String {
    let first_line = message.lines().next().unwrap_or_default();
    format!("error: {first_line}")
        .chars()
        .take(MAX_STAGE_CHARS)
        .collect()
}
