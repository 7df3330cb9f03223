//! Segment planning: which source windows to render, in which order, with
//! which captions.

use reelcut_project_model::caption::Caption;
use reelcut_project_model::highlight::{sort_by_start, Highlight, HighlightId};

/// One source window to encode independently.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// Position in the final output.
    pub index: usize,

    /// Absolute start in source seconds.
    pub start: f64,

    /// Window length in seconds; `None` runs to the end of the source.
    pub duration: Option<f64>,

    /// Subtracted from caption times to make them segment-local.
    pub time_offset: f64,

    /// Captions overlapping this window, in source order.
    pub captions: Vec<Caption>,

    /// Title of the highlight this segment came from.
    pub label: Option<String>,
}

impl Segment {
    /// Absolute end in source seconds, when bounded.
    pub fn end(&self) -> Option<f64> {
        self.duration.map(|d| self.start + d)
    }
}

/// How the plan was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanKind {
    /// A single segment covering the whole source.
    WholeVideo,
    /// One segment per selected highlight.
    Highlights,
}

/// An ordered, non-empty list of segments.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentPlan {
    kind: PlanKind,
    segments: Vec<Segment>,
}

impl SegmentPlan {
    pub fn kind(&self) -> PlanKind {
        self.kind
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Whether the segments must be joined after rendering.
    pub fn needs_concat(&self) -> bool {
        self.segments.len() > 1
    }

    /// Total output length, when every segment is bounded.
    pub fn total_duration(&self) -> Option<f64> {
        self.segments.iter().map(|s| s.duration).sum()
    }
}

/// Plan the segments of a render.
///
/// With a non-empty `requested` id list, each matching highlight becomes a
/// segment, ordered by ascending start time; that order is the order of the
/// final output. Ids that match nothing are ignored. When nothing is
/// requested, or nothing requested matches, the whole source is rendered as
/// one segment carrying every caption.
pub fn plan_segments(
    captions: &[Caption],
    requested: Option<&[HighlightId]>,
    highlights: &[Highlight],
) -> SegmentPlan {
    let requested = requested.filter(|ids| !ids.is_empty());

    let mut selected: Vec<Highlight> = match requested {
        Some(ids) => highlights
            .iter()
            .filter(|h| ids.contains(&h.id))
            .cloned()
            .collect(),
        None => Vec::new(),
    };

    if selected.is_empty() {
        if let Some(ids) = requested {
            tracing::warn!(
                requested = ?ids,
                "None of the requested highlights exist; rendering the whole video"
            );
        }
        return whole_video(captions);
    }

    sort_by_start(&mut selected);

    let segments = selected
        .into_iter()
        .enumerate()
        .map(|(index, highlight)| Segment {
            index,
            start: highlight.start_time,
            duration: Some(highlight.duration()),
            time_offset: highlight.start_time,
            captions: captions
                .iter()
                .filter(|c| c.overlaps(highlight.start_time, highlight.end_time))
                .cloned()
                .collect(),
            label: Some(highlight.title),
        })
        .collect();

    SegmentPlan {
        kind: PlanKind::Highlights,
        segments,
    }
}

fn whole_video(captions: &[Caption]) -> SegmentPlan {
    SegmentPlan {
        kind: PlanKind::WholeVideo,
        segments: vec![Segment {
            index: 0,
            start: 0.0,
            duration: None,
            time_offset: 0.0,
            captions: captions.to_vec(),
            label: None,
        }],
    }
}
