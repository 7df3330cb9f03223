//! Sequential per-segment encoding.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use reelcut_common::config::RenderSettings;
use reelcut_common::error::{ReelcutError, ReelcutResult};

use crate::engine::{MediaEngine, TranscodeRequest};
use crate::filter::{compile_caption_filters, compose_filter_graph, crop_and_scale};
use crate::plan::{Segment, SegmentPlan};

/// File name of the artifact for segment `index` inside the job directory.
pub fn segment_file_name(index: usize) -> String {
    format!("seg_{index:03}.mp4")
}

/// Drives the media engine once per planned segment.
pub struct RenderExecutor {
    engine: Arc<dyn MediaEngine>,
    settings: RenderSettings,
}

impl RenderExecutor {
    pub fn new(engine: Arc<dyn MediaEngine>, settings: RenderSettings) -> Self {
        Self { engine, settings }
    }

    /// Full `-vf` graph for one segment.
    pub fn filter_graph(&self, segment: &Segment, include_captions: bool) -> String {
        let transform = crop_and_scale(self.settings.width, self.settings.height);
        if !include_captions {
            return transform;
        }
        let overlays = compile_caption_filters(&segment.captions, segment.time_offset);
        compose_filter_graph(&transform, &overlays)
    }

    /// Render every segment of `plan` into `work_dir`, in plan order.
    ///
    /// `on_segment(done, total)` is called after each segment finishes. The
    /// first failure aborts the run; artifacts already written are left for
    /// the caller's temp directory cleanup.
    pub fn render_all(
        &self,
        source: &Path,
        plan: &SegmentPlan,
        work_dir: &Path,
        include_captions: bool,
        mut on_segment: impl FnMut(usize, usize),
    ) -> ReelcutResult<Vec<PathBuf>> {
        let total = plan.len();
        let mut outputs = Vec::with_capacity(total);

        for segment in plan.segments() {
            let path = self.render_segment(source, segment, work_dir, include_captions)?;
            outputs.push(path);
            on_segment(segment.index + 1, total);
        }

        Ok(outputs)
    }

    /// Render one segment and verify the engine produced a non-empty file.
    pub fn render_segment(
        &self,
        source: &Path,
        segment: &Segment,
        work_dir: &Path,
        include_captions: bool,
    ) -> ReelcutResult<PathBuf> {
        ensure_readable(source)?;

        let output = work_dir.join(segment_file_name(segment.index));
        let request = TranscodeRequest {
            source: source.to_path_buf(),
            output: output.clone(),
            start: segment.start,
            duration: segment.duration,
            filter_graph: self.filter_graph(segment, include_captions),
        };

        tracing::info!(
            segment = segment.index,
            start_secs = segment.start,
            duration_secs = ?segment.duration,
            captions = segment.captions.len(),
            engine = self.engine.name(),
            "Rendering segment"
        );
        let started = std::time::Instant::now();

        self.engine.transcode(&request).map_err(|e| match e {
            ReelcutError::Execution { message } => {
                ReelcutError::execution(format!("segment {} failed: {message}", segment.index + 1))
            }
            other => other,
        })?;

        match std::fs::metadata(&output) {
            Ok(meta) if meta.len() > 0 => {}
            Ok(_) => {
                return Err(ReelcutError::execution(format!(
                    "segment {} produced an empty file",
                    segment.index + 1
                )))
            }
            Err(_) => {
                return Err(ReelcutError::execution(format!(
                    "segment {} produced no output at {}",
                    segment.index + 1,
                    output.display()
                )))
            }
        }

        tracing::info!(
            segment = segment.index,
            elapsed_ms = started.elapsed().as_millis(),
            "Segment rendered"
        );
        Ok(output)
    }
}

fn ensure_readable(source: &Path) -> ReelcutResult<()> {
    match std::fs::metadata(source) {
        Ok(meta) if meta.is_file() => Ok(()),
        Ok(_) => Err(ReelcutError::execution(format!(
            "source {} is not a regular file",
            source.display()
        ))),
        Err(e) => Err(ReelcutError::execution(format!(
            "source {} is not readable: {e}",
            source.display()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::plan_segments;
    use reelcut_project_model::caption::Caption;
    use reelcut_project_model::highlight::Highlight;
    use std::sync::Mutex;

    /// Writes the filter graph into the output so tests can inspect it.
    #[derive(Default)]
    struct RecordingEngine {
        requests: Mutex<Vec<TranscodeRequest>>,
        fail_on_call: Option<usize>,
        skip_output: bool,
    }

    impl MediaEngine for RecordingEngine {
        fn transcode(&self, request: &TranscodeRequest) -> ReelcutResult<()> {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request.clone());
            if self.fail_on_call == Some(requests.len()) {
                return Err(ReelcutError::execution("exit status 1"));
            }
            if !self.skip_output {
                std::fs::write(&request.output, request.filter_graph.as_bytes())?;
            }
            Ok(())
        }

        fn concat(&self, _list_file: &Path, _output: &Path) -> ReelcutResult<()> {
            Ok(())
        }

        fn is_available(&self) -> bool {
            true
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    fn highlight(id: u64, start: f64, end: f64) -> Highlight {
        Highlight {
            id,
            project_id: 1,
            title: format!("h{id}"),
            start_time: start,
            end_time: end,
            reason: None,
            order: 0,
        }
    }

    fn caption(start: f64, end: f64, text: &str) -> Caption {
        Caption {
            id: 1,
            project_id: 1,
            start_time: start,
            end_time: end,
            text: text.to_string(),
            style: None,
        }
    }

    fn source_in(dir: &Path) -> PathBuf {
        let source = dir.join("source.mp4");
        std::fs::write(&source, b"source").unwrap();
        source
    }

    #[test]
    fn test_renders_in_plan_order() {
        let dir = tempfile::tempdir().unwrap();
        let source = source_in(dir.path());
        let engine = Arc::new(RecordingEngine::default());
        let executor = RenderExecutor::new(engine.clone(), RenderSettings::default());

        let plan = plan_segments(
            &[caption(65.0, 70.0, "later"), caption(12.0, 14.0, "early")],
            Some(&[1, 2][..]),
            &[highlight(1, 60.0, 90.0), highlight(2, 10.0, 40.0)],
        );

        let mut reported = Vec::new();
        let outputs = executor
            .render_all(&source, &plan, dir.path(), true, |done, total| {
                reported.push((done, total))
            })
            .unwrap();

        assert_eq!(
            outputs,
            vec![
                dir.path().join(segment_file_name(0)),
                dir.path().join(segment_file_name(1)),
            ]
        );
        assert_eq!(reported, vec![(1, 2), (2, 2)]);

        let requests = engine.requests.lock().unwrap();
        assert_eq!(requests[0].start, 10.0);
        assert_eq!(requests[1].start, 60.0);
        let (early, later) = (&requests[0].filter_graph, &requests[1].filter_graph);
        assert!(early.contains("text='early'"));
        assert!(early.contains("gte(t,2.000)*lt(t,4.000)"));
        assert!(later.contains("text='later'"));
        assert!(later.contains("gte(t,5.000)*lt(t,10.000)"));
    }

    #[test]
    fn test_captions_can_be_left_out() {
        let executor = RenderExecutor::new(
            Arc::new(RecordingEngine::default()),
            RenderSettings::default(),
        );
        let plan = plan_segments(&[caption(0.0, 1.0, "hi")], None, &[]);
        let graph = executor.filter_graph(&plan.segments()[0], false);
        assert_eq!(graph, "crop=ih*9/16:ih,scale=1080:1920");
    }

    #[test]
    fn test_first_failure_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let source = source_in(dir.path());
        let engine = Arc::new(RecordingEngine {
            fail_on_call: Some(2),
            ..RecordingEngine::default()
        });
        let executor = RenderExecutor::new(engine.clone(), RenderSettings::default());
        let plan = plan_segments(
            &[],
            Some(&[1, 2, 3][..]),
            &[
                highlight(1, 0.0, 5.0),
                highlight(2, 10.0, 15.0),
                highlight(3, 20.0, 25.0),
            ],
        );

        let mut reported = Vec::new();
        let err = executor
            .render_all(&source, &plan, dir.path(), true, |done, total| {
                reported.push((done, total))
            })
            .unwrap_err();

        assert!(err.to_string().contains("segment 2 failed"));
        assert_eq!(reported, vec![(1, 3)]);
        assert_eq!(engine.requests.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_missing_output_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = source_in(dir.path());
        let engine = Arc::new(RecordingEngine {
            skip_output: true,
            ..RecordingEngine::default()
        });
        let executor = RenderExecutor::new(engine, RenderSettings::default());
        let plan = plan_segments(&[], None, &[]);

        let err = executor
            .render_segment(&source, &plan.segments()[0], dir.path(), true)
            .unwrap_err();
        assert!(matches!(err, ReelcutError::Execution { .. }));
        assert!(err.to_string().contains("produced no output"));
    }

    #[test]
    fn test_unreadable_source_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(RecordingEngine::default());
        let executor = RenderExecutor::new(engine.clone(), RenderSettings::default());
        let plan = plan_segments(&[], None, &[]);

        let err = executor
            .render_segment(
                &dir.path().join("gone.mp4"),
                &plan.segments()[0],
                dir.path(),
                true,
            )
            .unwrap_err();
        assert!(matches!(err, ReelcutError::Execution { .. }));
        assert!(engine.requests.lock().unwrap().is_empty());
    }
}
