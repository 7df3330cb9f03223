//! Real ffmpeg renders. Ignored by default; run with `--ignored` on a
//! machine with `ffmpeg` and `ffprobe` on `PATH`.

use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use reelcut_common::config::{AppConfig, RenderSettings};
use reelcut_project_model::caption::Caption;
use reelcut_project_model::highlight::Highlight;
use reelcut_project_model::project::{NewProject, ProjectStatus};
use reelcut_project_model::store::ProjectStore;
use reelcut_project_model::MemoryStore;
use reelcut_render_engine::{FfmpegEngine, MediaEngine, RenderJobController, RenderRequest};

fn tool_available(binary: &str) -> bool {
    Command::new(binary)
        .arg("-version")
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}

fn synthesize_source(path: &Path, secs: u32) {
    let status = Command::new("ffmpeg")
        .args(["-y", "-hide_banner", "-loglevel", "error"])
        .args(["-f", "lavfi", "-i"])
        .arg(format!("testsrc=size=640x360:rate=25:duration={secs}"))
        .args(["-f", "lavfi", "-i"])
        .arg(format!("sine=frequency=440:duration={secs}"))
        .args(["-c:v", "libx264", "-preset", "ultrafast"])
        .args(["-c:a", "aac", "-shortest"])
        .arg(path)
        .status()
        .expect("ffmpeg should start");
    assert!(status.success(), "failed to synthesize test source");
}

fn media_duration(path: &Path) -> f64 {
    let output = Command::new("ffprobe")
        .args(["-v", "error", "-show_entries", "format=duration"])
        .args(["-of", "default=noprint_wrappers=1:nokey=1"])
        .arg(path)
        .output()
        .expect("ffprobe should start");
    String::from_utf8_lossy(&output.stdout)
        .trim()
        .parse()
        .expect("ffprobe should report a duration")
}

#[tokio::test]
#[ignore = "requires ffmpeg"]
async fn intro_and_outro_render_with_ffmpeg() {
    if !tool_available("ffmpeg") || !tool_available("ffprobe") {
        eprintln!("skipping: ffmpeg/ffprobe not found");
        return;
    }

    let media = tempfile::tempdir().unwrap();
    let source = media.path().join("source.mp4");
    synthesize_source(&source, 120);

    let store = Arc::new(MemoryStore::new());
    let project = store.create_project(NewProject {
        title: "Synthetic".to_string(),
        source_path: Some(source),
        status: ProjectStatus::Ready,
        ..NewProject::default()
    });
    store
        .replace_highlights(
            project.id,
            vec![
                Highlight {
                    id: 1,
                    project_id: project.id,
                    title: "Intro".to_string(),
                    start_time: 0.0,
                    end_time: 30.0,
                    reason: None,
                    order: 0,
                },
                Highlight {
                    id: 2,
                    project_id: project.id,
                    title: "Outro".to_string(),
                    start_time: 90.0,
                    end_time: 120.0,
                    reason: None,
                    order: 1,
                },
            ],
        )
        .unwrap();

    let caption = |id: u64, start: f64, end: f64, text: &str| Caption {
        id,
        project_id: project.id,
        start_time: start,
        end_time: end,
        text: text.to_string(),
        style: None,
    };
    store
        .replace_captions(
            project.id,
            vec![
                caption(1, 1.0, 4.0, "50% off: today, [live] at Sam's"),
                caption(2, 28.0, 95.0, r"C:\clips\intro 100%"),
                caption(3, 100.0, 110.0, "%{pts} stays literal"),
            ],
        )
        .unwrap();

    // Smaller frame keeps the test fast; the 9:16 crop is unchanged.
    let settings = RenderSettings {
        width: 270,
        height: 480,
        preset: "ultrafast".to_string(),
        ..RenderSettings::default()
    };
    let engine = FfmpegEngine::new(settings.clone());
    assert!(engine.is_available());

    let config = AppConfig {
        media_base_path: media.path().to_path_buf(),
        render: settings,
        ..AppConfig::default()
    };
    let controller = RenderJobController::new(store.clone(), Arc::new(engine), config);

    let output = controller
        .start_render(project.id, RenderRequest::highlights([1, 2]))
        .unwrap()
        .wait()
        .await
        .unwrap();

    let duration = media_duration(&output);
    assert!((duration - 60.0).abs() < 1.5, "got {duration}s");
    assert_eq!(store.get(project.id).unwrap().status, ProjectStatus::Done);
    assert_eq!(controller.tracker().get(project.id).progress, 100);
}
