//! Register a project.

use std::path::PathBuf;

use reelcut_common::config::AppConfig;
use reelcut_project_model::project::{NewProject, ProjectStatus};

pub fn run(
    config: &AppConfig,
    title: String,
    source: PathBuf,
    url: Option<String>,
) -> anyhow::Result<()> {
    if !source.is_file() {
        anyhow::bail!("Source video not found: {}", source.display());
    }
    let source = source.canonicalize()?;

    let store = super::open_store(config)?;
    let project = store
        .create_project(NewProject {
            title,
            source_url: url,
            source_path: Some(source),
            status: ProjectStatus::Ready,
        })
        .map_err(|e| anyhow::anyhow!("Failed to create project: {e}"))?;

    println!("Created project {}: {}", project.id, project.title);
    if let Some(path) = &project.source_path {
        println!("  Source: {}", path.display());
    }
    let records = store.root().join(project.id.to_string());
    println!("  Records: {}", records.display());
    println!();
    println!("Next steps:");
    println!(
        "  reelcut import {} --captions captions.json --highlights highlights.json",
        project.id
    );
    println!("  reelcut render {}", project.id);

    Ok(())
}
