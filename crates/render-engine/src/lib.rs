//! Reelcut Render Engine
//!
//! Turns a project's source video, captions, and highlights into one
//! vertical short.
//!
//! # Pipeline Architecture
//!
//! ```text
//! highlights ──┐
//!              ├── plan: one segment per highlight (by start time)
//! captions ────┘         │
//!                        ▼
//! source.mp4 ──── per segment: trim ─▶ crop 9:16 ─▶ scale 1080x1920
//!                                              │
//!                                              ├── caption drawtext overlays
//!                                              ▼
//!                                        encode seg_NNN.mp4
//!                                              │
//!                         1 segment: move ─────┼───── n segments: concat copy
//!                                              ▼
//!                                  outputs/<project>/final.mp4
//! ```
//!
//! [`controller::RenderJobController`] runs the pipeline as a background
//! job and owns the project's render status; [`progress::ProgressTracker`]
//! exposes each job's latest progress snapshot.

pub mod controller;
pub mod engine;
pub mod executor;
pub mod filter;
pub mod plan;
pub mod progress;
pub mod stitch;

pub use controller::{
    download_name, OutputFile, RenderJobController, RenderRequest, RenderStatusReport,
    RenderTicket,
};
pub use engine::{FfmpegEngine, MediaEngine, TranscodeRequest};
pub use executor::RenderExecutor;
pub use filter::DrawTextFilter;
pub use plan::{plan_segments, PlanKind, Segment, SegmentPlan};
pub use progress::{JobProgress, ProgressListener, ProgressTracker, RenderProgress};
pub use stitch::ConcatStitcher;
