//! CLI command implementations

pub mod render;
pub mod rig;
pub mod view;

use anyhow::{bail, Context, Result};
use clap::Args;
use shutter_core::{MeshData, RigSpec, SessionConfig, ShaderPair, ShaderVariant};
use shutter_import::{ImportResult, ImportedPrimitive};
use shutter_render::Photographer;
use std::path::PathBuf;

/// Mesh, shaders, session config and camera placement shared by `render`
/// and `view`
#[derive(Args, Debug, Clone)]
pub struct SceneArgs {
    /// glTF/GLB mesh; a unit cube when omitted
    pub mesh: Option<PathBuf>,

    /// Vertex shader variant (default, notexture, textured, faceidx, flat)
    #[arg(long, default_value = "notexture")]
    pub shader: ShaderVariant,

    /// Fragment shader variant, defaults to the vertex variant
    #[arg(long)]
    pub fragment: Option<ShaderVariant>,

    /// Session config TOML (defaults to ./shutter.toml if present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Viewport size as WIDTHxHEIGHT, overrides the config
    #[arg(long, value_parser = parse_resolution)]
    pub resolution: Option<(u32, u32)>,

    /// Rig TOML with point, ring and shaker cameras
    #[arg(long)]
    pub rig: Option<PathBuf>,

    /// Add a ring of N cameras
    #[arg(long)]
    pub ring: Option<u32>,

    /// Height of the ring cameras
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub height: f32,

    /// Distance of ring cameras from the target; unit circle when omitted
    #[arg(long)]
    pub distance: Option<f32>,
}

impl SceneArgs {
    pub fn shader_pair(&self) -> ShaderPair {
        ShaderPair::new(self.shader, self.fragment.unwrap_or(self.shader))
    }

    pub fn session_config(&self) -> Result<SessionConfig> {
        let mut config = SessionConfig::load(self.config.as_deref()).context("Failed to load session config")?;
        if let Some((width, height)) = self.resolution {
            config.width = width;
            config.height = height;
        }
        config.validate()?;
        Ok(config)
    }

    /// Load everything and place the cameras
    pub fn photographer(&self) -> Result<Photographer> {
        let config = self.session_config()?;
        let pair = self.shader_pair();

        let mesh = match &self.mesh {
            Some(path) => shutter_import::import_gltf(path, pair.vertex)
                .with_context(|| format!("Failed to import {}", path.display()))?,
            None => {
                log::info!("No mesh given, using the built-in cube");
                builtin_cube(pair.vertex)?
            }
        };

        let mut photographer = Photographer::new(config, mesh, pair);

        if let Some(path) = &self.rig {
            let spec = RigSpec::load_from_file(path)
                .with_context(|| format!("Failed to load rig {}", path.display()))?;
            photographer.rig_mut().apply(&spec);
        }
        if let Some(count) = self.ring {
            photographer.add_camera_ring(count, self.height, self.distance);
        }
        log::info!("{} camera(s) registered", photographer.cameras().len());
        Ok(photographer)
    }
}

/// Unit cube carrying whatever channel `variant` samples: per-face UVs and a
/// white texture, white vertex colors, or per-face ids
pub fn builtin_cube(variant: ShaderVariant) -> Result<MeshData> {
    let cube = MeshData::unit_cube();
    let uvs = (0..cube.positions.len() / 4)
        .flat_map(|_| [[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]])
        .collect();
    let import = ImportResult {
        primitives: vec![ImportedPrimitive {
            positions: cube.positions,
            normals: cube.normals,
            uvs,
            colors: Vec::new(),
            indices: cube.indices,
            material_index: None,
        }],
        ..ImportResult::default()
    };
    Ok(import.into_mesh(variant)?)
}

fn parse_resolution(s: &str) -> Result<(u32, u32)> {
    let Some((w, h)) = s.split_once(['x', 'X']) else {
        bail!("expected WIDTHxHEIGHT, got '{}'", s);
    };
    let width: u32 = w.trim().parse().with_context(|| format!("bad width '{}'", w))?;
    let height: u32 = h.trim().parse().with_context(|| format!("bad height '{}'", h))?;
    if width == 0 || height == 0 {
        bail!("resolution must be non-zero");
    }
    Ok((width, height))
}
