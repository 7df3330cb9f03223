//! Copy a project's final output.

use std::path::PathBuf;

use reelcut_common::config::AppConfig;
use reelcut_project_model::project::ProjectId;

pub fn run(config: AppConfig, id: ProjectId, dest: PathBuf) -> anyhow::Result<()> {
    let mut output = super::controller(config)?.open_output(id)?;

    let dest = if dest.is_dir() {
        dest.join(&output.download_name)
    } else {
        dest
    };
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = std::fs::File::create(&dest)?;
    let bytes = std::io::copy(&mut output.file, &mut file)?;
    println!(
        "Wrote {} ({:.1} MB) from {}",
        dest.display(),
        bytes as f64 / 1_048_576.0,
        output.path.display()
    );
    Ok(())
}
