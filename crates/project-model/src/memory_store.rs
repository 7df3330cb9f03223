//! In-process record store.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::caption::Caption;
use crate::highlight::{Highlight, HighlightId};
use crate::project::{NewProject, Project, ProjectId, ProjectUpdate};
use crate::store::{
    claim_rendering, retain_requested, sort_captions, CaptionStore, HighlightStore, ProjectStore,
    StoreError,
};

#[derive(Debug, Default)]
struct Records {
    next_id: ProjectId,
    projects: BTreeMap<ProjectId, Project>,
    captions: BTreeMap<ProjectId, Vec<Caption>>,
    highlights: BTreeMap<ProjectId, Vec<Highlight>>,
}

/// A store that keeps every record in memory.
///
/// Used for embedding the render engine without a filesystem store and for
/// tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<Records>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn records(&self) -> MutexGuard<'_, Records> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a project and return its record.
    pub fn create_project(&self, fields: NewProject) -> Project {
        let mut records = self.records();
        records.next_id += 1;
        let project = Project::new(records.next_id, fields);
        records.projects.insert(project.id, project.clone());
        project
    }

    /// Replace all captions of a project.
    pub fn replace_captions(
        &self,
        project_id: ProjectId,
        mut captions: Vec<Caption>,
    ) -> Result<(), StoreError> {
        let mut records = self.records();
        if !records.projects.contains_key(&project_id) {
            return Err(StoreError::ProjectNotFound { id: project_id });
        }
        sort_captions(&mut captions);
        records.captions.insert(project_id, captions);
        Ok(())
    }

    /// Replace all highlights of a project.
    pub fn replace_highlights(
        &self,
        project_id: ProjectId,
        highlights: Vec<Highlight>,
    ) -> Result<(), StoreError> {
        let mut records = self.records();
        if !records.projects.contains_key(&project_id) {
            return Err(StoreError::ProjectNotFound { id: project_id });
        }
        records.highlights.insert(project_id, highlights);
        Ok(())
    }
}

impl ProjectStore for MemoryStore {
    fn get(&self, id: ProjectId) -> Result<Project, StoreError> {
        self.records()
            .projects
            .get(&id)
            .cloned()
            .ok_or(StoreError::ProjectNotFound { id })
    }

    fn update(&self, id: ProjectId, update: ProjectUpdate) -> Result<Project, StoreError> {
        let mut records = self.records();
        let project = records
            .projects
            .get_mut(&id)
            .ok_or(StoreError::ProjectNotFound { id })?;
        update.apply_to(project);
        Ok(project.clone())
    }

    fn begin_render(&self, id: ProjectId) -> Result<Project, StoreError> {
        let mut records = self.records();
        let project = records
            .projects
            .get_mut(&id)
            .ok_or(StoreError::ProjectNotFound { id })?;
        claim_rendering(project)?;
        Ok(project.clone())
    }
}

impl CaptionStore for MemoryStore {
    fn list_captions(&self, project_id: ProjectId) -> Result<Vec<Caption>, StoreError> {
        Ok(self
            .records()
            .captions
            .get(&project_id)
            .cloned()
            .unwrap_or_default())
    }
}

impl HighlightStore for MemoryStore {
    fn list_highlights(
        &self,
        project_id: ProjectId,
        ids: Option<&[HighlightId]>,
    ) -> Result<Vec<Highlight>, StoreError> {
        let mut highlights = self
            .records()
            .highlights
            .get(&project_id)
            .cloned()
            .unwrap_or_default();
        retain_requested(&mut highlights, ids);
        Ok(highlights)
    }
}
