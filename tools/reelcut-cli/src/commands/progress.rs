//! Print a project's persisted render status.
//!
//! Progress percentages live in the rendering process only, so this command
//! reports what the store knows: the status and, once it exists, the output.

use serde::Serialize;

use reelcut_common::config::AppConfig;
use reelcut_project_model::project::{ProjectId, ProjectStatus};
use reelcut_render_engine::RenderStatusReport;

#[derive(Debug, Serialize)]
struct StatusView {
    project_id: ProjectId,
    status: ProjectStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    output_url: Option<String>,
}

impl From<RenderStatusReport> for StatusView {
    fn from(report: RenderStatusReport) -> Self {
        Self {
            project_id: report.project_id,
            status: report.status,
            output_url: report.output_url,
        }
    }
}

pub fn run(config: AppConfig, id: ProjectId) -> anyhow::Result<()> {
    let report = super::controller(config)?.progress_report(id)?;
    let view = StatusView::from(report);
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(())
}
