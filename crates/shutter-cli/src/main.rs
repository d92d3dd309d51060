//! Shutter CLI - render a mesh from a rig of cameras

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{render, rig, view, SceneArgs};
use shutter_core::logging::{init_logging, LoggingConfig};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "shutter")]
#[command(about = "Multi-view offscreen renderer for synthetic camera datasets", long_about = None)]
#[command(version)]
struct Cli {
    /// Log filter in env_logger syntax (e.g. "debug", "shutter_render=trace")
    #[arg(long, global = true)]
    log: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render one PNG per rig camera (headless)
    Render {
        #[command(flatten)]
        scene: SceneArgs,

        /// Output directory
        #[arg(short, long, default_value = "output")]
        output: PathBuf,

        /// File name prefix, overrides the config
        #[arg(long)]
        prefix: Option<String>,

        /// Also write OpenCV calibration JSON per camera
        #[arg(long)]
        calibration: bool,

        /// Use the recording backend: blank images, no GPU
        #[arg(long)]
        dry_run: bool,

        /// WGSL vertex stage file for the main program
        #[arg(long, requires = "fragment_wgsl")]
        vertex_wgsl: Option<PathBuf>,

        /// WGSL fragment stage file for the main program
        #[arg(long, requires = "vertex_wgsl")]
        fragment_wgsl: Option<PathBuf>,
    },

    /// Fly around the scene and its camera rig
    View {
        #[command(flatten)]
        scene: SceneArgs,

        /// Render a single frame and exit
        #[arg(long)]
        once: bool,
    },

    /// Print the poses a rig file generates, as JSON
    Rig {
        /// Rig TOML file
        rig: PathBuf,

        /// Session config TOML
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(LoggingConfig {
        env_filter: cli.log,
        ..LoggingConfig::default()
    });

    match cli.command {
        Commands::Render {
            scene,
            output,
            prefix,
            calibration,
            dry_run,
            vertex_wgsl,
            fragment_wgsl,
        } => render::run(render::RenderArgs {
            scene,
            output,
            prefix,
            calibration,
            dry_run,
            shader_files: vertex_wgsl.zip(fragment_wgsl),
        }),
        Commands::View { scene, once } => view::run(scene, once),
        Commands::Rig { rig, config } => rig::run(&rig, config.as_deref()),
    }
}
