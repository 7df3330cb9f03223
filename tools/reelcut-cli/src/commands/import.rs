//! Load captions and highlights into a project.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use reelcut_common::config::AppConfig;
use reelcut_project_model::caption::Caption;
use reelcut_project_model::highlight::Highlight;
use reelcut_project_model::project::ProjectId;

pub fn run(
    config: &AppConfig,
    id: ProjectId,
    captions: Option<PathBuf>,
    highlights: Option<PathBuf>,
) -> anyhow::Result<()> {
    if captions.is_none() && highlights.is_none() {
        anyhow::bail!("Nothing to import: pass --captions and/or --highlights");
    }
    let store = super::open_store(config)?;

    if let Some(path) = captions {
        let mut records: Vec<Caption> = read_records(&path)?;
        for record in &mut records {
            record.project_id = id;
        }
        let count = records.len();
        store
            .replace_captions(id, records)
            .map_err(|e| anyhow::anyhow!("Failed to import captions: {e}"))?;
        println!("Imported {count} captions into project {id}");
    }

    if let Some(path) = highlights {
        let mut records: Vec<Highlight> = read_records(&path)?;
        for record in &mut records {
            record.project_id = id;
        }
        let count = records.len();
        store
            .replace_highlights(id, records)
            .map_err(|e| anyhow::anyhow!("Failed to import highlights: {e}"))?;
        println!("Imported {count} highlights into project {id}");
    }

    Ok(())
}

fn read_records<T: DeserializeOwned>(path: &Path) -> anyhow::Result<Vec<T>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", path.display()))?;
    serde_json::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Failed to parse {}: {e}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelcut_project_model::project::{NewProject, ProjectStatus};
    use reelcut_project_model::store::{CaptionStore, HighlightStore};
    use reelcut_project_model::JsonStore;

    #[test]
    fn test_import_assigns_project_and_validates() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            store_dir: dir.path().join("store"),
            ..AppConfig::default()
        };
        let project = JsonStore::open(&config.store_dir)
            .unwrap()
            .create_project(NewProject {
                title: "Talk".to_string(),
                status: ProjectStatus::Ready,
                ..NewProject::default()
            })
            .unwrap();

        let captions = dir.path().join("captions.json");
        std::fs::write(
            &captions,
            r#"[{"id": 1, "project_id": 0, "start_time": 0.5, "end_time": 2.0, "text": "Hi",
                 "style": {"fontSize": 48, "color": "yellow"}}]"#,
        )
        .unwrap();
        let highlights = dir.path().join("highlights.json");
        std::fs::write(
            &highlights,
            r#"[{"id": 3, "project_id": 0, "title": "Hook", "start_time": 10, "end_time": 40}]"#,
        )
        .unwrap();

        run(&config, project.id, Some(captions), Some(highlights.clone())).unwrap();

        let store = JsonStore::open(&config.store_dir).unwrap();
        let listed = store.list_captions(project.id).unwrap();
        assert_eq!(listed[0].project_id, project.id);
        assert_eq!(listed[0].resolved_style().font_size, 48.0);
        let highlights_listed = store.list_highlights(project.id, None).unwrap();
        assert_eq!(highlights_listed[0].title, "Hook");

        std::fs::write(
            &highlights,
            r#"[{"id": 4, "project_id": 0, "title": "Backwards", "start_time": 40, "end_time": 10}]"#,
        )
        .unwrap();
        assert!(run(&config, project.id, None, Some(highlights)).is_err());
    }

    #[test]
    fn test_nothing_to_import() {
        assert!(run(&AppConfig::default(), 1, None, None).is_err());
    }
}
