//! Print the camera poses a rig file expands to

use anyhow::{Context, Result};
use shutter_core::{CameraRig, RigSpec, SessionConfig};
use std::path::Path;

pub fn run(rig_path: &Path, config_path: Option<&Path>) -> Result<()> {
    let config = SessionConfig::load(config_path).context("Failed to load session config")?;
    let spec = RigSpec::load_from_file(rig_path).with_context(|| format!("Failed to load rig {}", rig_path.display()))?;

    let mut rig = CameraRig::new(config);
    rig.apply(&spec);
    if rig.is_empty() {
        log::warn!("Rig {} produced no cameras", rig_path.display());
    }

    println!("{}", serde_json::to_string_pretty(rig.cameras())?);
    Ok(())
}
