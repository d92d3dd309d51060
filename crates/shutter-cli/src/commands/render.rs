//! Headless multi-view render command

use super::SceneArgs;
use anyhow::{Context, Result};
use shutter_render::{RecordingBackend, RenderBackend, WgpuBackend};
use std::path::PathBuf;

pub struct RenderArgs {
    pub scene: SceneArgs,
    pub output: PathBuf,
    pub prefix: Option<String>,
    pub calibration: bool,
    pub dry_run: bool,
    pub shader_files: Option<(PathBuf, PathBuf)>,
}

pub fn run(args: RenderArgs) -> Result<()> {
    let photographer = args.scene.photographer()?;
    let prefix = args
        .prefix
        .clone()
        .unwrap_or_else(|| photographer.config().prefix.clone());

    let mut backend: Box<dyn RenderBackend> = if args.dry_run {
        log::info!("Dry run: recording backend, images are blank");
        Box::new(RecordingBackend::new())
    } else {
        let backend = WgpuBackend::headless().context("Failed to create headless GPU backend")?;
        match args.shader_files {
            Some((vertex, fragment)) => Box::new(backend.with_shader_files(vertex, fragment)),
            None => Box::new(backend),
        }
    };

    let written = photographer
        .export_all(backend.as_mut(), &args.output, &prefix)
        .context("Export failed")?;
    println!(
        "Saved {} image(s) to {}",
        written.len(),
        args.output.display()
    );
    for name in &written {
        println!("  {}", name);
    }

    if args.calibration {
        let files = photographer
            .export_calibration(&args.output, &prefix)
            .context("Failed to write calibration")?;
        println!("Saved {} calibration file(s)", files.len());
    }
    Ok(())
}
