//! Render job state machine.
//!
//! ```text
//!   ready ──start_render──▶ rendering ──┬─▶ done
//!     ▲                                 └─▶ error
//!     └──────────── (any non-rendering status is "ready")
//! ```
//!
//! `start_render` validates and snapshots synchronously, moves the project
//! to `rendering`, and returns. The job itself runs on the blocking pool
//! and always ends in `done` or `error`, with its private temp directory
//! removed on every path.

use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use reelcut_common::config::AppConfig;
use reelcut_common::error::{ReelcutError, ReelcutResult};
use reelcut_project_model::caption::Caption;
use reelcut_project_model::highlight::{Highlight, HighlightId};
use reelcut_project_model::project::{ProjectId, ProjectStatus, ProjectUpdate};
use reelcut_project_model::store::{RenderStore, StoreError};

use crate::engine::MediaEngine;
use crate::executor::RenderExecutor;
use crate::plan::{plan_segments, PlanKind};
use crate::progress::{JobProgress, ProgressTracker, RenderProgress};
use crate::stitch::ConcatStitcher;

/// Prefix of job-private temp directories.
const WORK_DIR_PREFIX: &str = ".render-";

/// What to render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderRequest {
    /// Highlights to extract. `None` or empty renders the whole video.
    pub highlight_ids: Option<Vec<HighlightId>>,

    /// Burn captions into the output.
    pub include_captions: bool,
}

impl Default for RenderRequest {
    fn default() -> Self {
        Self {
            highlight_ids: None,
            include_captions: true,
        }
    }
}

impl RenderRequest {
    pub fn whole_video() -> Self {
        Self::default()
    }

    pub fn highlights(ids: impl IntoIterator<Item = HighlightId>) -> Self {
        Self {
            highlight_ids: Some(ids.into_iter().collect()),
            ..Self::default()
        }
    }

    pub fn without_captions(mut self) -> Self {
        self.include_captions = false;
        self
    }
}

/// An accepted render.
///
/// Dropping the ticket does not cancel the job.
#[derive(Debug)]
pub struct RenderTicket {
    pub project_id: ProjectId,

    /// Where the output will be written on success.
    pub output_path: PathBuf,

    pub handle: JoinHandle<ReelcutResult<PathBuf>>,
}

impl RenderTicket {
    /// Wait for the job to finish.
    pub async fn wait(self) -> ReelcutResult<PathBuf> {
        self.handle
            .await
            .map_err(|e| ReelcutError::execution(format!("render task failed: {e}")))?
    }
}

/// Progress readout for one project.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderStatusReport {
    pub project_id: ProjectId,
    pub status: ProjectStatus,
    pub progress: i32,
    pub stage: String,

    /// Public URL of the output, once it exists on disk.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_url: Option<String>,
}

/// An opened final output.
#[derive(Debug)]
pub struct OutputFile {
    pub path: PathBuf,

    /// Suggested file name for downloads.
    pub download_name: String,

    pub file: File,
}

/// Suggested download name of a project's output.
pub fn download_name(project_id: ProjectId) -> String {
    format!("reelcut_{project_id}_final.mp4")
}

/// Owns render status and guarantees at most one active job per project.
#[derive(Clone)]
pub struct RenderJobController {
    store: Arc<dyn RenderStore>,
    engine: Arc<dyn MediaEngine>,
    tracker: Arc<ProgressTracker>,
    config: Arc<AppConfig>,
    active: Arc<Mutex<HashSet<ProjectId>>>,
}

impl RenderJobController {
    pub fn new(
        store: Arc<dyn RenderStore>,
        engine: Arc<dyn MediaEngine>,
        config: AppConfig,
    ) -> Self {
        Self {
            store,
            engine,
            tracker: Arc::new(ProgressTracker::new()),
            config: Arc::new(config),
            active: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn tracker(&self) -> &Arc<ProgressTracker> {
        &self.tracker
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Whether a job for `project_id` is running in this process.
    pub fn is_active(&self, project_id: ProjectId) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&project_id)
    }

    /// Validate, snapshot, and schedule a render.
    ///
    /// Every rejection (`NotFound`, `Validation`, `Conflict`) happens before
    /// any state changes. Must be called from within a Tokio runtime.
    pub fn start_render(
        &self,
        project_id: ProjectId,
        request: RenderRequest,
    ) -> ReelcutResult<RenderTicket> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| ReelcutError::unsupported("render jobs require a Tokio runtime"))?;

        let project = self.store.get(project_id).map_err(store_error)?;
        if project.status.is_rendering() {
            return Err(ReelcutError::conflict(format!(
                "project {project_id} is already rendering"
            )));
        }
        let claim = ActiveClaim::acquire(&self.active, project_id)?;

        let source = project.source_path.clone().ok_or_else(|| {
            ReelcutError::validation(format!("project {project_id} has no source video"))
        })?;
        if !source.is_file() {
            return Err(ReelcutError::validation(format!(
                "source video not found at {}",
                source.display()
            )));
        }

        let snapshot = self.snapshot(project_id, &request)?;

        // Another process may have claimed the project since the read above.
        self.store.begin_render(project_id).map_err(store_error)?;
        let progress = self.tracker.begin(project_id);

        let output_path = self.config.output_path_for(project_id);
        let job = RenderJob {
            project_id,
            source,
            output_path: output_path.clone(),
            temp_root: self.config.render.temp_root.clone(),
            snapshot,
            include_captions: request.include_captions,
            store: Arc::clone(&self.store),
            executor: RenderExecutor::new(Arc::clone(&self.engine), self.config.render.clone()),
            stitcher: ConcatStitcher::new(Arc::clone(&self.engine)),
            progress: progress.clone(),
        };

        tracing::info!(
            project_id,
            highlights = ?request.highlight_ids,
            include_captions = request.include_captions,
            output = %output_path.display(),
            "Render accepted"
        );

        let store = Arc::clone(&self.store);
        let handle = runtime.spawn(async move {
            let _claim = claim;
            match tokio::task::spawn_blocking(move || job.run()).await {
                Ok(result) => result,
                Err(e) => {
                    let err = ReelcutError::execution(format!("render job aborted: {e}"));
                    mark_failed(store.as_ref(), &progress, &err);
                    Err(err)
                }
            }
        });

        Ok(RenderTicket {
            project_id,
            output_path,
            handle,
        })
    }

    /// Current status, progress, and output URL of a project.
    pub fn progress_report(&self, project_id: ProjectId) -> ReelcutResult<RenderStatusReport> {
        let project = self.store.get(project_id).map_err(store_error)?;
        let RenderProgress { progress, stage } = self.tracker.get(project_id);
        let output_url = self
            .config
            .output_path_for(project_id)
            .is_file()
            .then(|| self.config.output_url_for(project_id));

        Ok(RenderStatusReport {
            project_id,
            status: project.status,
            progress,
            stage,
            output_url,
        })
    }

    /// Open the final output of a project for streaming.
    pub fn open_output(&self, project_id: ProjectId) -> ReelcutResult<OutputFile> {
        let project = self.store.get(project_id).map_err(store_error)?;
        let path = project
            .output_path
            .unwrap_or_else(|| self.config.output_path_for(project_id));
        if !path.is_file() {
            return Err(ReelcutError::not_found(format!(
                "project {project_id} has no rendered output"
            )));
        }

        let file = File::open(&path)?;
        Ok(OutputFile {
            path,
            download_name: download_name(project_id),
            file,
        })
    }

    fn snapshot(&self, project_id: ProjectId, request: &RenderRequest) -> ReelcutResult<Snapshot> {
        let captions = if request.include_captions {
            self.store.list_captions(project_id).map_err(store_error)?
        } else {
            Vec::new()
        };
        let highlights = match request.highlight_ids.as_deref() {
            Some(ids) if !ids.is_empty() => self
                .store
                .list_highlights(project_id, Some(ids))
                .map_err(store_error)?,
            _ => Vec::new(),
        };

        for caption in &captions {
            caption
                .validate()
                .map_err(|e| ReelcutError::validation(e.to_string()))?;
        }
        for highlight in &highlights {
            highlight
                .validate()
                .map_err(|e| ReelcutError::validation(e.to_string()))?;
        }

        Ok(Snapshot {
            captions,
            highlights,
            requested: request.highlight_ids.clone(),
        })
    }
}

/// Immutable inputs of one job.
struct Snapshot {
    captions: Vec<Caption>,
    highlights: Vec<Highlight>,
    requested: Option<Vec<HighlightId>>,
}

struct RenderJob {
    project_id: ProjectId,
    source: PathBuf,
    output_path: PathBuf,
    temp_root: Option<PathBuf>,
    snapshot: Snapshot,
    include_captions: bool,
    store: Arc<dyn RenderStore>,
    executor: RenderExecutor,
    stitcher: ConcatStitcher,
    progress: JobProgress,
}

impl RenderJob {
    fn run(self) -> ReelcutResult<PathBuf> {
        let started = std::time::Instant::now();
        let result = self.execute().and_then(|output| {
            self.store
                .update(
                    self.project_id,
                    ProjectUpdate::status(ProjectStatus::Done).with_output_path(output.clone()),
                )
                .map_err(store_error)?;
            Ok(output)
        });

        match result {
            Ok(output) => {
                self.progress.complete();
                tracing::info!(
                    project_id = self.project_id,
                    output = %output.display(),
                    elapsed_secs = started.elapsed().as_secs_f64(),
                    "Render complete"
                );
                Ok(output)
            }
            Err(err) => {
                mark_failed(self.store.as_ref(), &self.progress, &err);
                Err(err)
            }
        }
    }

    fn execute(&self) -> ReelcutResult<PathBuf> {
        let plan = plan_segments(
            &self.snapshot.captions,
            self.snapshot.requested.as_deref(),
            &self.snapshot.highlights,
        );
        let extracting = plan.kind() == PlanKind::Highlights;
        self.progress.plan_ready(extracting);
        tracing::info!(
            project_id = self.project_id,
            segments = plan.len(),
            kind = ?plan.kind(),
            duration_secs = ?plan.total_duration(),
            "Segment plan ready"
        );

        let work_dir = self.create_work_dir()?;

        let segments = self.executor.render_all(
            &self.source,
            &plan,
            work_dir.path(),
            self.include_captions,
            |done, total| {
                self.progress.segment_done(done, total);
            },
        )?;

        if plan.needs_concat() {
            self.progress.joining();
        }
        self.stitcher
            .stitch(&segments, work_dir.path(), &self.output_path)?;

        let work_path = work_dir.path().to_path_buf();
        if let Err(e) = work_dir.close() {
            tracing::warn!(
                dir = %work_path.display(),
                error = %e,
                "Failed to remove render work directory"
            );
        }

        Ok(self.output_path.clone())
    }

    /// Job-private directory, next to the output unless a temp root is
    /// configured. Removed when dropped.
    fn create_work_dir(&self) -> ReelcutResult<tempfile::TempDir> {
        let parent = match &self.temp_root {
            Some(root) => root.clone(),
            None => self
                .output_path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(std::env::temp_dir),
        };
        std::fs::create_dir_all(&parent)?;

        let dir = tempfile::Builder::new()
            .prefix(WORK_DIR_PREFIX)
            .tempdir_in(&parent)?;
        tracing::debug!(
            project_id = self.project_id,
            dir = %dir.path().display(),
            "Created render work directory"
        );
        Ok(dir)
    }
}

/// Move the project to `error` and record the failure once.
fn mark_failed(store: &dyn RenderStore, progress: &JobProgress, err: &ReelcutError) {
    let project_id = progress.project_id();
    tracing::error!(project_id, error = %err, "Render failed");

    if let Err(e) = store.update(project_id, ProjectUpdate::status(ProjectStatus::Error)) {
        tracing::error!(project_id, error = %e, "Failed to record render failure");
    }
    progress.fail(&failure_summary(err));
}

fn failure_summary(err: &ReelcutError) -> String {
    match err {
        ReelcutError::Execution { message } => message.clone(),
        other => other.to_string(),
    }
}

fn store_error(err: StoreError) -> ReelcutError {
    match err {
        StoreError::ProjectNotFound { id } => ReelcutError::not_found(format!("project {id}")),
        StoreError::Invalid(e) => ReelcutError::validation(e.to_string()),
        StoreError::AlreadyRendering { id } => {
            ReelcutError::conflict(format!("project {id} is already rendering"))
        }
        other => ReelcutError::store(other.to_string()),
    }
}

/// Membership in the active set, released on drop.
struct ActiveClaim {
    active: Arc<Mutex<HashSet<ProjectId>>>,
    project_id: ProjectId,
}

impl ActiveClaim {
    fn acquire(
        active: &Arc<Mutex<HashSet<ProjectId>>>,
        project_id: ProjectId,
    ) -> ReelcutResult<Self> {
        let inserted = active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(project_id);
        if !inserted {
            return Err(ReelcutError::conflict(format!(
                "project {project_id} is already rendering"
            )));
        }
        Ok(Self {
            active: Arc::clone(active),
            project_id,
        })
    }
}

impl Drop for ActiveClaim {
    fn drop(&mut self) {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.project_id);
    }
}
