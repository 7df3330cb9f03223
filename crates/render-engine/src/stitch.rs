//! Joining segment artifacts into the final output.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use reelcut_common::error::{ReelcutError, ReelcutResult};

use crate::engine::MediaEngine;

/// Name of the concat list inside the job directory.
pub const CONCAT_LIST_FILE: &str = "concat.txt";

/// Name of the joined file inside the job directory, before promotion.
pub const JOINED_FILE: &str = "joined.mp4";

/// Promotes a single segment or stream-copies several into the final file.
pub struct ConcatStitcher {
    engine: Arc<dyn MediaEngine>,
}

impl ConcatStitcher {
    pub fn new(engine: Arc<dyn MediaEngine>) -> Self {
        Self { engine }
    }

    /// Produce `output` from `segments`, which must be in output order.
    ///
    /// Intermediate files are written inside `work_dir`; `output` is only
    /// touched by the final move, so a failure never leaves a partial file
    /// there.
    pub fn stitch(
        &self,
        segments: &[PathBuf],
        work_dir: &Path,
        output: &Path,
    ) -> ReelcutResult<()> {
        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent)?;
        }

        match segments {
            [] => Err(ReelcutError::execution("no segments to stitch")),
            [single] => {
                tracing::debug!(
                    from = %single.display(),
                    to = %output.display(),
                    "Promoting single segment"
                );
                promote(single, output)
            }
            many => {
                let list_path = work_dir.join(CONCAT_LIST_FILE);
                std::fs::write(&list_path, concat_list(many))?;

                let joined = work_dir.join(JOINED_FILE);
                tracing::info!(
                    segments = many.len(),
                    engine = self.engine.name(),
                    "Concatenating segments"
                );
                self.engine.concat(&list_path, &joined).map_err(|e| match e {
                    ReelcutError::Execution { message } => {
                        ReelcutError::execution(format!("concatenation failed: {message}"))
                    }
                    other => other,
                })?;

                match std::fs::metadata(&joined) {
                    Ok(meta) if meta.len() > 0 => promote(&joined, output),
                    _ => Err(ReelcutError::execution("concatenation produced no output")),
                }
            }
        }
    }
}

/// Concat demuxer list: one quoted `file` line per segment.
pub fn concat_list(segments: &[PathBuf]) -> String {
    segments
        .iter()
        .map(|path| format!("file {}\n", quote_concat_path(path)))
        .collect()
}

/// Single-quote a path for the concat list; embedded quotes become `'\''`.
pub fn quote_concat_path(path: &Path) -> String {
    format!("'{}'", path.display().to_string().replace('\'', r"'\''"))
}

/// Move `from` onto `to`, replacing any previous output.
///
/// Falls back to copy-then-rename when the two paths are on different
/// filesystems.
fn promote(from: &Path, to: &Path) -> ReelcutResult<()> {
    if std::fs::rename(from, to).is_ok() {
        return Ok(());
    }

    let staging = to.with_extension("mp4.partial");
    let copied = std::fs::copy(from, &staging).and_then(|_| std::fs::rename(&staging, to));
    if let Err(e) = copied {
        let _ = std::fs::remove_file(&staging);
        return Err(ReelcutError::execution(format!(
            "failed to move {} to {}: {e}",
            from.display(),
            to.display()
        )));
    }
    let _ = std::fs::remove_file(from);
    Ok(())
}
