//! Filesystem record store.
//!
//! ```text
//! <root>/
//!   <project_id>/
//!     project.json
//!     captions.json     (optional, defaults to [])
//!     highlights.json   (optional, defaults to [])
//!     project.lock      (advisory lock for project.json writes)
//! ```
//!
//! Several processes may share one store root. Every read-modify-write of
//! `project.json` holds an exclusive lock on `project.lock`.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::caption::Caption;
use crate::highlight::{Highlight, HighlightId};
use crate::project::{NewProject, Project, ProjectId, ProjectUpdate};
use crate::store::{
    claim_rendering, retain_requested, sort_captions, CaptionStore, HighlightStore, ProjectStore,
    StoreError,
};

const PROJECT_FILE: &str = "project.json";
const CAPTIONS_FILE: &str = "captions.json";
const HIGHLIGHTS_FILE: &str = "highlights.json";
const LOCK_FILE: &str = "project.lock";

/// A store that keeps one directory of JSON files per project.
#[derive(Debug)]
pub struct JsonStore {
    root: PathBuf,
    // Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl JsonStore {
    /// Open (and create if needed) a store rooted at `root`.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root).map_err(|e| StoreError::IoError {
            path: root.clone(),
            source: e,
        })?;
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn project_dir(&self, id: ProjectId) -> PathBuf {
        self.root.join(id.to_string())
    }

    /// Register a project under the next free id.
    pub fn create_project(&self, fields: NewProject) -> Result<Project, StoreError> {
        let _guard = self.lock_writes();
        let id = self.project_ids()?.into_iter().max().unwrap_or(0) + 1;
        let dir = self.project_dir(id);
        std::fs::create_dir_all(&dir).map_err(|e| StoreError::IoError {
            path: dir.clone(),
            source: e,
        })?;

        let project = Project::new(id, fields);
        write_json(&dir.join(PROJECT_FILE), &project)?;
        tracing::debug!(project_id = id, dir = %dir.display(), "Created project record");
        Ok(project)
    }

    /// All projects, newest first.
    pub fn list_projects(&self) -> Result<Vec<Project>, StoreError> {
        let mut projects = self
            .project_ids()?
            .into_iter()
            .map(|id| self.get(id))
            .collect::<Result<Vec<_>, _>>()?;
        projects.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(projects)
    }

    /// Replace all captions of a project after validating each one.
    pub fn replace_captions(
        &self,
        project_id: ProjectId,
        mut captions: Vec<Caption>,
    ) -> Result<(), StoreError> {
        let _guard = self.lock_writes();
        self.ensure_exists(project_id)?;
        for caption in &captions {
            caption.validate()?;
        }
        sort_captions(&mut captions);
        write_json(&self.project_dir(project_id).join(CAPTIONS_FILE), &captions)
    }

    /// Replace all highlights of a project after validating each one.
    pub fn replace_highlights(
        &self,
        project_id: ProjectId,
        highlights: Vec<Highlight>,
    ) -> Result<(), StoreError> {
        let _guard = self.lock_writes();
        self.ensure_exists(project_id)?;
        for highlight in &highlights {
            highlight.validate()?;
        }
        write_json(
            &self.project_dir(project_id).join(HIGHLIGHTS_FILE),
            &highlights,
        )
    }

    fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_exists(&self, id: ProjectId) -> Result<(), StoreError> {
        if self.project_dir(id).join(PROJECT_FILE).exists() {
            Ok(())
        } else {
            Err(StoreError::ProjectNotFound { id })
        }
    }

    /// Read, change, and write back `project.json` while holding both the
    /// in-process mutex and the cross-process file lock.
    fn modify_project(
        &self,
        id: ProjectId,
        change: impl FnOnce(&mut Project) -> Result<(), StoreError>,
    ) -> Result<Project, StoreError> {
        let _guard = self.lock_writes();
        self.ensure_exists(id)?;

        let lock_path = self.project_dir(id).join(LOCK_FILE);
        let lock_file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| StoreError::IoError {
                path: lock_path.clone(),
                source: e,
            })?;
        FileExt::lock_exclusive(&lock_file).map_err(|e| StoreError::IoError {
            path: lock_path.clone(),
            source: e,
        })?;

        let result = self.get(id).and_then(|mut project| {
            change(&mut project)?;
            write_json(&self.project_dir(id).join(PROJECT_FILE), &project)?;
            Ok(project)
        });

        if let Err(e) = FileExt::unlock(&lock_file) {
            tracing::warn!(project_id = id, error = %e, "Failed to unlock project record");
        }
        result
    }

    fn project_ids(&self) -> Result<Vec<ProjectId>, StoreError> {
        let entries = std::fs::read_dir(&self.root).map_err(|e| StoreError::IoError {
            path: self.root.clone(),
            source: e,
        })?;

        Ok(entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().join(PROJECT_FILE).exists())
            .filter_map(|entry| entry.file_name().to_str()?.parse::<ProjectId>().ok())
            .collect())
    }

    fn read_list<T: DeserializeOwned>(
        &self,
        project_id: ProjectId,
        file: &str,
    ) -> Result<Vec<T>, StoreError> {
        self.ensure_exists(project_id)?;
        let path = self.project_dir(project_id).join(file);
        if !path.exists() {
            return Ok(Vec::new());
        }
        read_json(&path)
    }
}

impl ProjectStore for JsonStore {
    fn get(&self, id: ProjectId) -> Result<Project, StoreError> {
        self.ensure_exists(id)?;
        read_json(&self.project_dir(id).join(PROJECT_FILE))
    }

    fn update(&self, id: ProjectId, update: ProjectUpdate) -> Result<Project, StoreError> {
        self.modify_project(id, |project| {
            update.apply_to(project);
            Ok(())
        })
    }

    fn begin_render(&self, id: ProjectId) -> Result<Project, StoreError> {
        self.modify_project(id, claim_rendering)
    }
}

impl CaptionStore for JsonStore {
    fn list_captions(&self, project_id: ProjectId) -> Result<Vec<Caption>, StoreError> {
        let mut captions: Vec<Caption> = self.read_list(project_id, CAPTIONS_FILE)?;
        sort_captions(&mut captions);
        Ok(captions)
    }
}

impl HighlightStore for JsonStore {
    fn list_highlights(
        &self,
        project_id: ProjectId,
        ids: Option<&[HighlightId]>,
    ) -> Result<Vec<Highlight>, StoreError> {
        let mut highlights: Vec<Highlight> = self.read_list(project_id, HIGHLIGHTS_FILE)?;
        retain_requested(&mut highlights, ids);
        Ok(highlights)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let content = std::fs::read_to_string(path).map_err(|e| StoreError::IoError {
        path: path.to_path_buf(),
        source: e,
    })?;
    serde_json::from_str(&content).map_err(|e| StoreError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Write through a sibling temp file so readers never see a half-written
/// record.
fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| StoreError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;
    let staging = path.with_extension("json.tmp");
    std::fs::write(&staging, json).map_err(|e| StoreError::IoError {
        path: staging.clone(),
        source: e,
    })?;
    std::fs::rename(&staging, path).map_err(|e| StoreError::IoError {
        path: path.to_path_buf(),
        source: e,
    })
}
