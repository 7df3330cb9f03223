//! Highlights: source time windows selected for the short.

use serde::{Deserialize, Serialize};

use crate::project::ProjectId;
use crate::store::InvalidRecord;

/// Highlight identifier.
pub type HighlightId = u64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Highlight {
    pub id: HighlightId,

    pub project_id: ProjectId,

    pub title: String,

    /// Window start in source seconds.
    pub start_time: f64,

    /// Window end in source seconds. Always greater than `start_time`.
    pub end_time: f64,

    /// Why this window was selected.
    #[serde(default)]
    pub reason: Option<String>,

    /// Display ordering hint. Rendering orders by `start_time` instead.
    #[serde(default)]
    pub order: i32,
}

impl Highlight {
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    pub fn validate(&self) -> Result<(), InvalidRecord> {
        if !self.start_time.is_finite() || !self.end_time.is_finite() {
            return Err(InvalidRecord::new(format!("highlight {} has a non-finite time", self.id)));
        }
        if self.start_time < 0.0 {
            return Err(InvalidRecord::new(format!(
                "highlight {} starts before the source ({:.3}s)",
                self.id, self.start_time
            )));
        }
        if self.end_time <= self.start_time {
            return Err(InvalidRecord::new(format!(
                "highlight {} ends at {:.3}s before it starts at {:.3}s",
                self.id, self.end_time, self.start_time
            )));
        }
        Ok(())
    }
}

/// Sort highlights by ascending start time; ties keep their input order.
pub fn sort_by_start(highlights: &mut [Highlight]) {
    highlights.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
}
