//! Project metadata and lifecycle status.
//!
//! A project ties a downloaded source video to the captions and highlights
//! derived from it, and to the final vertical render produced from both.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Project identifier.
pub type ProjectId = u64;

/// Top-level project record (`project.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Unique project identifier.
    pub id: ProjectId,

    /// Human-readable project title.
    pub title: String,

    /// Lifecycle status.
    pub status: ProjectStatus,

    /// Where the source was acquired from, if it came from a URL.
    #[serde(default)]
    pub source_url: Option<String>,

    /// Local path of the acquired source video.
    #[serde(default)]
    pub source_path: Option<PathBuf>,

    /// Local path of the last successful render.
    #[serde(default)]
    pub output_path: Option<PathBuf>,

    /// Creation timestamp (RFC 3339).
    pub created_at: String,

    /// Last modified timestamp (RFC 3339).
    #[serde(default)]
    pub updated_at: String,
}

/// Lifecycle status of a project.
///
/// Acquisition, transcription, and highlight selection move a project from
/// `Pending` to `Ready`. Rendering owns the `Rendering`, `Done`, and `Error`
/// transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    #[default]
    Pending,
    Downloading,
    Transcribing,
    Highlighting,
    Ready,
    Rendering,
    Done,
    Error,
}

impl ProjectStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ProjectStatus::Pending => "pending",
            ProjectStatus::Downloading => "downloading",
            ProjectStatus::Transcribing => "transcribing",
            ProjectStatus::Highlighting => "highlighting",
            ProjectStatus::Ready => "ready",
            ProjectStatus::Rendering => "rendering",
            ProjectStatus::Done => "done",
            ProjectStatus::Error => "error",
        }
    }

    /// Whether a render job currently owns the project.
    pub fn is_rendering(self) -> bool {
        self == ProjectStatus::Rendering
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Partial update applied by [`crate::store::ProjectStore::update`].
///
/// Only fields that are `Some` are written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectUpdate {
    pub status: Option<ProjectStatus>,
    pub output_path: Option<PathBuf>,
}

impl ProjectUpdate {
    pub fn status(status: ProjectStatus) -> Self {
        Self {
            status: Some(status),
            output_path: None,
        }
    }

    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    /// Apply this update to a project, bumping its modification time.
    pub fn apply_to(&self, project: &mut Project) {
        if let Some(status) = self.status {
            project.status = status;
        }
        if let Some(path) = &self.output_path {
            project.output_path = Some(path.clone());
        }
        project.updated_at = chrono::Utc::now().to_rfc3339();
    }
}

/// Fields needed to register a new project.
#[derive(Debug, Clone, Default)]
pub struct NewProject {
    pub title: String,
    pub source_url: Option<String>,
    pub source_path: Option<PathBuf>,
    pub status: ProjectStatus,
}

impl Project {
    /// Create a project record with fresh timestamps.
    pub fn new(id: ProjectId, fields: NewProject) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id,
            title: fields.title,
            status: fields.status,
            source_url: fields.source_url,
            source_path: fields.source_path,
            output_path: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}
