//! Check the render engine and media paths.

use reelcut_common::config::AppConfig;
use reelcut_render_engine::{FfmpegEngine, MediaEngine};

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("Reelcut System Check");
    println!("{}", "=".repeat(50));

    let engine = FfmpegEngine::new(config.render.clone());
    let engine_ok = engine.is_available();
    if engine_ok {
        println!(
            "[OK] Render engine: {} ({})",
            engine.name(),
            config.render.ffmpeg_binary
        );
    } else {
        println!(
            "[FAIL] Render engine: '{}' not found or not runnable",
            config.render.ffmpeg_binary
        );
    }

    println!(
        "[OK] Output: {}x{} {} crf {} preset {}, audio {}",
        config.render.width,
        config.render.height,
        config.render.video_codec,
        config.render.crf,
        config.render.preset,
        config.render.audio_codec
    );

    let media = &config.media_base_path;
    if media.is_dir() {
        println!("[OK] Media directory: {}", media.display());
    } else {
        println!(
            "[WARN] Media directory does not exist yet: {}",
            media.display()
        );
    }
    println!("[OK] Project store: {}", config.store_dir.display());

    println!();
    if engine_ok {
        println!("Reelcut is ready to render.");
        Ok(())
    } else {
        anyhow::bail!("ffmpeg is required; install it or set render.ffmpeg_binary in the config")
    }
}
