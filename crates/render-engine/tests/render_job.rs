//! Render jobs driven end to end against a scripted media engine.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex};

use reelcut_common::config::AppConfig;
use reelcut_common::error::{ReelcutError, ReelcutResult};
use reelcut_project_model::caption::Caption;
use reelcut_project_model::highlight::Highlight;
use reelcut_project_model::project::{NewProject, ProjectId, ProjectStatus};
use reelcut_project_model::store::ProjectStore;
use reelcut_project_model::MemoryStore;
use reelcut_render_engine::{
    MediaEngine, RenderJobController, RenderRequest, TranscodeRequest,
};

/// Source length the scripted engine pretends every input has.
const SOURCE_SECS: f64 = 120.0;

/// In-process engine: every segment file holds a text description of the
/// window it covers, and concat joins the listed files byte-wise.
#[derive(Default)]
struct ScriptedEngine {
    transcodes: Mutex<Vec<TranscodeRequest>>,
    concat_lists: Mutex<Vec<Vec<PathBuf>>>,
    fail_on_transcode: Option<usize>,
    panic_on_transcode: Option<usize>,
    gate: Option<Arc<Gate>>,
}

#[derive(Default)]
struct Gate {
    open: Mutex<bool>,
    changed: Condvar,
}

impl Gate {
    fn wait(&self) {
        let mut open = self.open.lock().unwrap();
        while !*open {
            open = self.changed.wait(open).unwrap();
        }
    }

    fn release(&self) {
        *self.open.lock().unwrap() = true;
        self.changed.notify_all();
    }
}

impl ScriptedEngine {
    fn transcodes(&self) -> Vec<TranscodeRequest> {
        self.transcodes.lock().unwrap().clone()
    }

    fn concat_lists(&self) -> Vec<Vec<PathBuf>> {
        self.concat_lists.lock().unwrap().clone()
    }
}

fn segment_body(request: &TranscodeRequest) -> String {
    let length = request.duration.unwrap_or(SOURCE_SECS - request.start);
    format!("[{:.1}+{:.1}]", request.start, length)
}

impl MediaEngine for ScriptedEngine {
    fn transcode(&self, request: &TranscodeRequest) -> ReelcutResult<()> {
        if let Some(gate) = &self.gate {
            gate.wait();
        }
        let call = {
            let mut calls = self.transcodes.lock().unwrap();
            calls.push(request.clone());
            calls.len()
        };
        if self.panic_on_transcode == Some(call) {
            panic!("engine crashed on call {call}");
        }
        if self.fail_on_transcode == Some(call) {
            return Err(ReelcutError::execution(
                "ffmpeg failed (exit status: 1): Invalid data found when processing input",
            ));
        }
        std::fs::write(&request.output, segment_body(request))?;
        Ok(())
    }

    fn concat(&self, list_file: &Path, output: &Path) -> ReelcutResult<()> {
        let list = std::fs::read_to_string(list_file)?;
        let paths: Vec<PathBuf> = list
            .lines()
            .map(|line| {
                PathBuf::from(
                    line.trim_start_matches("file '")
                        .trim_end_matches('\'')
                        .replace(r"'\''", "'"),
                )
            })
            .collect();

        let mut joined = Vec::new();
        for path in &paths {
            joined.extend(std::fs::read(path)?);
        }
        self.concat_lists.lock().unwrap().push(paths);
        std::fs::write(output, joined)?;
        Ok(())
    }

    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

struct Fixture {
    media: tempfile::TempDir,
    store: Arc<MemoryStore>,
    engine: Arc<ScriptedEngine>,
    controller: RenderJobController,
    project_id: ProjectId,
    progress: Arc<Mutex<Vec<(ProjectId, i32)>>>,
}

impl Fixture {
    fn new(engine: ScriptedEngine) -> Self {
        Self::with_config(engine, |_| {})
    }

    fn with_config(engine: ScriptedEngine, adjust: impl FnOnce(&mut AppConfig)) -> Self {
        reelcut_common::logging::init_test_logging();
        let media = tempfile::tempdir().unwrap();
        let source = media.path().join("source.mp4");
        std::fs::write(&source, b"raw source").unwrap();

        let store = Arc::new(MemoryStore::new());
        let project = store.create_project(NewProject {
            title: "Conference talk".to_string(),
            source_path: Some(source),
            status: ProjectStatus::Ready,
            ..NewProject::default()
        });

        let mut config = AppConfig {
            media_base_path: media.path().to_path_buf(),
            ..AppConfig::default()
        };
        adjust(&mut config);

        let engine = Arc::new(engine);
        let controller = RenderJobController::new(store.clone(), engine.clone(), config);

        let progress = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&progress);
        controller.tracker().subscribe(Box::new(move |id, snapshot| {
            sink.lock().unwrap().push((id, snapshot.progress));
        }));

        Self {
            media,
            store,
            engine,
            controller,
            project_id: project.id,
            progress,
        }
    }

    fn add_highlights(&self, windows: &[(u64, f64, f64, &str)]) {
        let highlights = windows
            .iter()
            .map(|(id, start, end, title)| Highlight {
                id: *id,
                project_id: self.project_id,
                title: title.to_string(),
                start_time: *start,
                end_time: *end,
                reason: None,
                order: 0,
            })
            .collect();
        self.store
            .replace_highlights(self.project_id, highlights)
            .unwrap();
    }

    fn add_captions(&self, spans: &[(f64, f64, &str)]) {
        let captions = spans
            .iter()
            .enumerate()
            .map(|(i, (start, end, text))| Caption {
                id: i as u64 + 1,
                project_id: self.project_id,
                start_time: *start,
                end_time: *end,
                text: text.to_string(),
                style: None,
            })
            .collect();
        self.store
            .replace_captions(self.project_id, captions)
            .unwrap();
    }

    fn output_dir(&self) -> PathBuf {
        self.media
            .path()
            .join("outputs")
            .join(self.project_id.to_string())
    }

    fn status(&self) -> ProjectStatus {
        self.store.get(self.project_id).unwrap().status
    }

    fn progress_values(&self, project_id: ProjectId) -> Vec<i32> {
        self.progress
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| *id == project_id)
            .map(|(_, p)| *p)
            .collect()
    }

    /// Leftover `.render-*` job directories anywhere under `dir`.
    fn work_dirs_in(dir: &Path) -> Vec<PathBuf> {
        match std::fs::read_dir(dir) {
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| {
                    p.file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|n| n.starts_with(".render-"))
                })
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}

#[tokio::test]
async fn single_highlight_output_is_the_rendered_segment() {
    let fx = Fixture::new(ScriptedEngine::default());
    fx.add_highlights(&[(1, 15.0, 45.0, "Hook")]);

    let output = fx
        .controller
        .start_render(fx.project_id, RenderRequest::highlights([1]))
        .unwrap()
        .wait()
        .await
        .unwrap();

    assert!(fx.engine.concat_lists().is_empty());
    assert_eq!(fx.engine.transcodes().len(), 1);
    assert_eq!(std::fs::read_to_string(&output).unwrap(), "[15.0+30.0]");
    assert_eq!(fx.status(), ProjectStatus::Done);
    assert!(Fixture::work_dirs_in(&fx.output_dir()).is_empty());
}

#[tokio::test]
async fn highlights_are_joined_in_start_order() {
    let fx = Fixture::new(ScriptedEngine::default());
    fx.add_highlights(&[
        (1, 60.0, 90.0, "Second"),
        (2, 10.0, 40.0, "First"),
        (3, 100.0, 110.0, "Unselected"),
    ]);
    fx.add_captions(&[
        (0.0, 50.0, "early"),
        (65.0, 70.0, "late"),
        (95.0, 99.0, "gap"),
    ]);

    let output = fx
        .controller
        .start_render(fx.project_id, RenderRequest::highlights([1, 2]))
        .unwrap()
        .wait()
        .await
        .unwrap();

    let transcodes = fx.engine.transcodes();
    let starts: Vec<f64> = transcodes.iter().map(|r| r.start).collect();
    assert_eq!(starts, vec![10.0, 60.0]);
    let (early, late) = (&transcodes[0].filter_graph, &transcodes[1].filter_graph);
    assert!(early.contains("text='early'"));
    assert!(!early.contains("text='late'"));
    assert!(late.contains("text='late'"));
    assert!(late.contains("gte(t,5.000)*lt(t,10.000)"));
    assert!(!transcodes
        .iter()
        .any(|r| r.filter_graph.contains("text='gap'")));

    let lists = fx.engine.concat_lists();
    assert_eq!(lists.len(), 1);
    let names: Vec<_> = lists[0]
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["seg_000.mp4", "seg_001.mp4"]);

    assert_eq!(
        std::fs::read_to_string(&output).unwrap(),
        "[10.0+30.0][60.0+30.0]"
    );
    assert!(Fixture::work_dirs_in(&fx.output_dir()).is_empty());
}

#[tokio::test]
async fn progress_rises_from_zero_to_complete() {
    let fx = Fixture::new(ScriptedEngine::default());
    fx.add_highlights(&[(1, 0.0, 10.0, "a"), (2, 20.0, 30.0, "b")]);

    fx.controller
        .start_render(fx.project_id, RenderRequest::highlights([1, 2]))
        .unwrap()
        .wait()
        .await
        .unwrap();

    let values = fx.progress_values(fx.project_id);
    assert_eq!(values, vec![0, 5, 43, 80, 83, 100]);
    assert!(values.windows(2).all(|w| w[0] <= w[1]));

    let report = fx.controller.progress_report(fx.project_id).unwrap();
    assert_eq!(report.status, ProjectStatus::Done);
    assert_eq!(report.progress, 100);
    assert_eq!(report.stage, "complete");
    assert!(report.output_url.is_some());
}

#[tokio::test]
async fn failure_discards_artifacts_and_reports_once() {
    let fx = Fixture::new(ScriptedEngine {
        fail_on_transcode: Some(2),
        ..ScriptedEngine::default()
    });
    fx.add_highlights(&[(1, 0.0, 10.0, "a"), (2, 20.0, 30.0, "b")]);

    let err = fx
        .controller
        .start_render(fx.project_id, RenderRequest::highlights([1, 2]))
        .unwrap()
        .wait()
        .await
        .unwrap_err();
    assert!(matches!(err, ReelcutError::Execution { .. }));

    assert_eq!(fx.status(), ProjectStatus::Error);
    let values = fx.progress_values(fx.project_id);
    assert_eq!(values, vec![0, 5, 43, -1]);
    assert_eq!(values.iter().filter(|p| **p == -1).count(), 1);

    let report = fx.controller.progress_report(fx.project_id).unwrap();
    assert_eq!(report.progress, -1);
    assert!(report.stage.starts_with("error: segment 2 failed"));
    assert!(report.stage.chars().count() <= 120);
    assert!(report.output_url.is_none());

    assert!(!fx.output_dir().join("final.mp4").exists());
    assert!(Fixture::work_dirs_in(&fx.output_dir()).is_empty());
    assert!(fx.engine.concat_lists().is_empty());
    assert!(!fx.controller.is_active(fx.project_id));
}

#[tokio::test]
async fn engine_panic_still_ends_in_error() {
    let fx = Fixture::new(ScriptedEngine {
        panic_on_transcode: Some(1),
        ..ScriptedEngine::default()
    });

    let result = fx
        .controller
        .start_render(fx.project_id, RenderRequest::whole_video())
        .unwrap()
        .wait()
        .await;

    assert!(result.is_err());
    assert_eq!(fx.status(), ProjectStatus::Error);
    assert_eq!(fx.controller.tracker().get(fx.project_id).progress, -1);
    assert!(Fixture::work_dirs_in(&fx.output_dir()).is_empty());
    assert!(!fx.controller.is_active(fx.project_id));
}

#[tokio::test]
async fn second_request_conflicts_without_disturbing_the_first() {
    let gate = Arc::new(Gate::default());
    let fx = Fixture::new(ScriptedEngine {
        gate: Some(Arc::clone(&gate)),
        ..ScriptedEngine::default()
    });
    fx.add_highlights(&[(1, 0.0, 10.0, "a"), (2, 20.0, 30.0, "b")]);

    let first = fx
        .controller
        .start_render(fx.project_id, RenderRequest::highlights([1, 2]))
        .unwrap();
    assert_eq!(fx.status(), ProjectStatus::Rendering);

    let err = fx
        .controller
        .start_render(fx.project_id, RenderRequest::whole_video())
        .unwrap_err();
    assert!(matches!(err, ReelcutError::Conflict { .. }));

    gate.release();
    first.wait().await.unwrap();

    assert_eq!(fx.status(), ProjectStatus::Done);
    assert_eq!(
        fx.progress_values(fx.project_id),
        vec![0, 5, 43, 80, 83, 100]
    );
    assert_eq!(fx.engine.transcodes().len(), 2);
}

#[tokio::test]
async fn finished_project_can_render_again() {
    let fx = Fixture::new(ScriptedEngine::default());
    fx.add_highlights(&[(1, 0.0, 10.0, "a")]);

    fx.controller
        .start_render(fx.project_id, RenderRequest::highlights([1]))
        .unwrap()
        .wait()
        .await
        .unwrap();
    let output = fx
        .controller
        .start_render(fx.project_id, RenderRequest::whole_video())
        .unwrap()
        .wait()
        .await
        .unwrap();

    assert_eq!(std::fs::read_to_string(output).unwrap(), "[0.0+120.0]");
    assert_eq!(
        fx.progress_values(fx.project_id),
        vec![0, 5, 80, 100, 0, 5, 80, 100]
    );
}

#[tokio::test]
async fn captions_can_be_left_out() {
    let fx = Fixture::new(ScriptedEngine::default());
    fx.add_captions(&[(1.0, 2.0, "hello")]);

    fx.controller
        .start_render(
            fx.project_id,
            RenderRequest::whole_video().without_captions(),
        )
        .unwrap()
        .wait()
        .await
        .unwrap();

    let transcodes = fx.engine.transcodes();
    assert_eq!(
        transcodes[0].filter_graph,
        "crop=ih*9/16:ih,scale=1080:1920"
    );
    assert_eq!(transcodes[0].duration, None);
}

#[tokio::test]
async fn unknown_highlights_fall_back_to_whole_video() {
    let fx = Fixture::new(ScriptedEngine::default());
    fx.add_highlights(&[(1, 0.0, 10.0, "a")]);

    let output = fx
        .controller
        .start_render(fx.project_id, RenderRequest::highlights([42]))
        .unwrap()
        .wait()
        .await
        .unwrap();

    assert_eq!(std::fs::read_to_string(output).unwrap(), "[0.0+120.0]");
}

#[tokio::test]
async fn configured_temp_root_is_cleaned() {
    let scratch = tempfile::tempdir().unwrap();
    let root = scratch.path().to_path_buf();
    let fx = Fixture::with_config(ScriptedEngine::default(), |config| {
        config.render.temp_root = Some(root);
    });
    fx.add_highlights(&[(1, 0.0, 10.0, "a"), (2, 20.0, 30.0, "b")]);

    fx.controller
        .start_render(fx.project_id, RenderRequest::highlights([1, 2]))
        .unwrap()
        .wait()
        .await
        .unwrap();

    let segment_dir = fx.engine.transcodes()[0]
        .output
        .parent()
        .unwrap()
        .to_path_buf();
    assert!(segment_dir.starts_with(scratch.path()));
    assert!(!segment_dir.exists());
    assert!(Fixture::work_dirs_in(scratch.path()).is_empty());
}

#[tokio::test]
async fn invalid_caption_is_rejected_before_scheduling() {
    let fx = Fixture::new(ScriptedEngine::default());
    fx.store
        .replace_captions(
            fx.project_id,
            vec![Caption {
                id: 1,
                project_id: fx.project_id,
                start_time: 5.0,
                end_time: 5.0,
                text: "zero length".to_string(),
                style: None,
            }],
        )
        .unwrap();

    let err = fx
        .controller
        .start_render(fx.project_id, RenderRequest::whole_video())
        .unwrap_err();
    assert!(matches!(err, ReelcutError::Validation { .. }));
    assert_eq!(fx.status(), ProjectStatus::Ready);
    assert!(fx.engine.transcodes().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn distinct_projects_render_concurrently() {
    let fx = Fixture::new(ScriptedEngine::default());
    let source = fx.media.path().join("other.mp4");
    std::fs::write(&source, b"other source").unwrap();
    let other = fx.store.create_project(NewProject {
        title: "Other".to_string(),
        source_path: Some(source),
        status: ProjectStatus::Ready,
        ..NewProject::default()
    });

    let a = fx
        .controller
        .start_render(fx.project_id, RenderRequest::whole_video())
        .unwrap();
    let b = fx
        .controller
        .start_render(other.id, RenderRequest::whole_video())
        .unwrap();
    let (a, b) = tokio::join!(a.wait(), b.wait());

    assert!(a.is_ok() && b.is_ok());
    assert_eq!(fx.status(), ProjectStatus::Done);
    assert_eq!(fx.store.get(other.id).unwrap().status, ProjectStatus::Done);
    assert_eq!(fx.progress_values(other.id).last(), Some(&100));
}

/// 120 s source, intro and outro highlights, no captions.
#[tokio::test]
async fn intro_and_outro_make_a_sixty_second_short() {
    let fx = Fixture::new(ScriptedEngine::default());
    fx.add_highlights(&[(1, 0.0, 30.0, "Intro"), (2, 90.0, 120.0, "Outro")]);

    let ticket = fx
        .controller
        .start_render(fx.project_id, RenderRequest::highlights([1, 2]))
        .unwrap();
    assert_eq!(ticket.output_path, fx.output_dir().join("final.mp4"));
    let output = ticket.wait().await.unwrap();

    let transcodes = fx.engine.transcodes();
    assert_eq!(transcodes.len(), 2);
    let total: f64 = transcodes.iter().filter_map(|r| r.duration).sum();
    assert!((total - 60.0).abs() < 1e-9);
    assert_eq!(fx.engine.concat_lists()[0].len(), 2);

    assert_eq!(
        std::fs::read_to_string(&output).unwrap(),
        "[0.0+30.0][90.0+30.0]"
    );
    assert_eq!(fx.status(), ProjectStatus::Done);
    assert_eq!(
        fx.store.get(fx.project_id).unwrap().output_path,
        Some(output)
    );
    assert_eq!(fx.controller.tracker().get(fx.project_id).progress, 100);
}
