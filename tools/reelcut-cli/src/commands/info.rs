//! Show project information.

use reelcut_common::config::AppConfig;
use reelcut_project_model::highlight::sort_by_start;
use reelcut_project_model::project::ProjectId;
use reelcut_project_model::store::{CaptionStore, HighlightStore, ProjectStore};

pub fn run(config: &AppConfig, id: ProjectId) -> anyhow::Result<()> {
    let store = super::open_store(config)?;
    let project = store
        .get(id)
        .map_err(|e| anyhow::anyhow!("Failed to load project: {e}"))?;
    let captions = store.list_captions(id)?;
    let mut highlights = store.list_highlights(id, None)?;
    sort_by_start(&mut highlights);

    println!("Project: {}", project.title);
    println!("  ID: {}", project.id);
    println!("  Status: {}", project.status);
    println!("  Created: {}", project.created_at);
    println!("  Modified: {}", project.updated_at);
    if let Some(url) = &project.source_url {
        println!("  Source URL: {url}");
    }
    match &project.source_path {
        Some(path) => println!("  Source: {}", path.display()),
        None => println!("  Source: (none)"),
    }
    if let Some(path) = &project.output_path {
        println!("  Output: {}", path.display());
    }
    println!();

    println!("Captions: {}", captions.len());
    if let (Some(first), Some(last)) = (captions.first(), captions.last()) {
        println!("  Span: {:.1}s - {:.1}s", first.start_time, last.end_time);
    }
    let styled = captions.iter().filter(|c| c.style.is_some()).count();
    if styled > 0 {
        println!("  Styled: {styled}");
    }
    println!();

    println!("Highlights: {}", highlights.len());
    for h in &highlights {
        println!(
            "  [{}] {:>7.1}s - {:>7.1}s ({:.1}s) {}",
            h.id,
            h.start_time,
            h.end_time,
            h.duration(),
            h.title
        );
    }

    Ok(())
}
