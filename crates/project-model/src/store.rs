//! Record store interfaces.
//!
//! Rendering never owns project data. It reads a snapshot through these
//! traits when a job starts and writes back only status and output path.

use std::path::PathBuf;

use crate::caption::Caption;
use crate::highlight::{Highlight, HighlightId};
use crate::project::{Project, ProjectId, ProjectStatus, ProjectUpdate};

/// Project records: read and partially update.
pub trait ProjectStore: Send + Sync {
    fn get(&self, id: ProjectId) -> Result<Project, StoreError>;

    /// Apply `update` and return the stored result.
    fn update(&self, id: ProjectId, update: ProjectUpdate) -> Result<Project, StoreError>;

    /// Atomically move a project to `rendering`.
    ///
    /// Fails with [`StoreError::AlreadyRendering`] when the stored status is
    /// already `rendering`, including when another process set it.
    fn begin_render(&self, id: ProjectId) -> Result<Project, StoreError>;
}

/// Caption records.
pub trait CaptionStore: Send + Sync {
    /// All captions of a project, ordered by start time.
    fn list_captions(&self, project_id: ProjectId) -> Result<Vec<Caption>, StoreError>;
}

/// Highlight records.
pub trait HighlightStore: Send + Sync {
    /// Highlights of a project, restricted to `ids` when given. Order is
    /// unspecified.
    fn list_highlights(
        &self,
        project_id: ProjectId,
        ids: Option<&[HighlightId]>,
    ) -> Result<Vec<Highlight>, StoreError>;
}

/// Everything a render job needs from storage.
pub trait RenderStore: ProjectStore + CaptionStore + HighlightStore {}

impl<T: ProjectStore + CaptionStore + HighlightStore> RenderStore for T {}

/// A record that breaks a model invariant.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct InvalidRecord {
    pub message: String,
}

impl InvalidRecord {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Errors that can occur when reading or writing records.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Project {id} not found")]
    ProjectNotFound { id: ProjectId },

    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid record: {0}")]
    Invalid(#[from] InvalidRecord),

    #[error("Project {id} is already rendering")]
    AlreadyRendering { id: ProjectId },
}

/// Set `rendering` on `project` unless it is already set.
pub(crate) fn claim_rendering(project: &mut Project) -> Result<(), StoreError> {
    if project.status.is_rendering() {
        return Err(StoreError::AlreadyRendering { id: project.id });
    }
    ProjectUpdate::status(ProjectStatus::Rendering).apply_to(project);
    Ok(())
}

/// Keep highlights whose id is in `ids`; `None` keeps everything.
pub(crate) fn retain_requested(highlights: &mut Vec<Highlight>, ids: Option<&[HighlightId]>) {
    if let Some(ids) = ids {
        highlights.retain(|h| ids.contains(&h.id));
    }
}

/// Order captions by start time.
pub(crate) fn sort_captions(captions: &mut [Caption]) {
    captions.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
}
