//! Render a project and wait for the result.

use std::io::Write;

use reelcut_common::config::AppConfig;
use reelcut_project_model::highlight::HighlightId;
use reelcut_project_model::project::ProjectId;
use reelcut_render_engine::RenderRequest;

pub async fn run(
    config: AppConfig,
    id: ProjectId,
    highlights: Vec<HighlightId>,
    include_captions: bool,
) -> anyhow::Result<()> {
    let controller = super::controller(config)?;

    controller.tracker().subscribe(Box::new(move |project_id, p| {
        if project_id != id {
            return;
        }
        if p.is_failed() {
            println!();
        } else {
            print!("\r  Progress: {:>3}% ({})          ", p.progress, p.stage);
            let _ = std::io::stdout().flush();
        }
    }));

    let request = RenderRequest {
        highlight_ids: (!highlights.is_empty()).then_some(highlights),
        include_captions,
    };

    println!("Rendering project {id}");
    match &request.highlight_ids {
        Some(ids) => println!("  Highlights: {ids:?}"),
        None => println!("  Highlights: whole video"),
    }
    let captions = if include_captions { "burned in" } else { "off" };
    println!("  Captions: {captions}");

    let ticket = controller.start_render(id, request)?;
    println!("  Output: {}", ticket.output_path.display());

    match ticket.wait().await {
        Ok(path) => {
            println!("\nRender complete: {}", path.display());
            Ok(())
        }
        Err(e) => {
            let report = controller.progress_report(id)?;
            println!("Render failed: {}", report.stage);
            Err(e.into())
        }
    }
}
