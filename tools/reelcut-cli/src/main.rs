//! Reelcut CLI — register projects, render vertical shorts, fetch outputs.
//!
//! Usage:
//!   reelcut init <TITLE> --source <PATH>   Register a project with acquired media
//!   reelcut import <ID> [OPTIONS]          Load captions/highlights from JSON
//!   reelcut info <ID>                      Show project, captions, highlights
//!   reelcut render <ID> [OPTIONS]          Render the short and wait for it
//!   reelcut progress <ID>                  Print the progress report as JSON
//!   reelcut output <ID> --dest <PATH>      Copy the final output
//!   reelcut check                          Check the render engine

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use reelcut_common::config::{AppConfig, LoggingConfig};
use reelcut_project_model::project::ProjectId;

mod commands;

#[derive(Parser)]
#[command(
    name = "reelcut",
    about = "Cut long videos into captioned vertical shorts",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (default: $XDG_CONFIG_HOME/reelcut/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a project whose source video is already on disk
    Init {
        /// Project title
        title: String,

        /// Path to the source video
        #[arg(short, long)]
        source: PathBuf,

        /// URL the source was acquired from
        #[arg(long)]
        url: Option<String>,
    },

    /// Replace a project's captions and/or highlights from JSON files
    Import {
        /// Project id
        id: ProjectId,

        /// JSON array of captions
        #[arg(long)]
        captions: Option<PathBuf>,

        /// JSON array of highlights
        #[arg(long)]
        highlights: Option<PathBuf>,
    },

    /// Show project information
    Info {
        /// Project id
        id: ProjectId,
    },

    /// Render a project and wait for it to finish
    Render {
        /// Project id
        id: ProjectId,

        /// Highlight to include (repeatable); none renders the whole video
        #[arg(long = "highlight")]
        highlights: Vec<u64>,

        /// Do not burn captions in
        #[arg(long)]
        no_captions: bool,
    },

    /// Print a project's render status and output URL as JSON
    ///
    /// Live percentages exist only inside the process running the render;
    /// `reelcut render` prints them as it goes.
    Progress {
        /// Project id
        id: ProjectId,
    },

    /// Copy a project's final output to a file
    Output {
        /// Project id
        id: ProjectId,

        /// Destination file or directory
        #[arg(short, long)]
        dest: PathBuf,
    },

    /// Check the render engine
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    };

    let log_level = if cli.verbose {
        "debug".to_string()
    } else {
        config.logging.level.clone()
    };
    reelcut_common::logging::init_logging(&LoggingConfig {
        level: log_level,
        json: config.logging.json,
    });
    tracing::debug!(
        store = %config.store_dir.display(),
        media = %config.media_base_path.display(),
        "Loaded configuration"
    );

    match cli.command {
        Commands::Init { title, source, url } => commands::init::run(&config, title, source, url),
        Commands::Import {
            id,
            captions,
            highlights,
        } => commands::import::run(&config, id, captions, highlights),
        Commands::Info { id } => commands::info::run(&config, id),
        Commands::Render {
            id,
            highlights,
            no_captions,
        } => commands::render::run(config, id, highlights, !no_captions).await,
        Commands::Progress { id } => commands::progress::run(config, id),
        Commands::Output { id, dest } => commands::output::run(config, id, dest),
        Commands::Check => commands::check::run(&config),
    }
}
