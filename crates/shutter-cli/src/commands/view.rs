//! Interactive rig viewer command

use super::SceneArgs;
use anyhow::Result;

pub fn run(scene: SceneArgs, once: bool) -> Result<()> {
    let photographer = scene.photographer()?;
    shutter_viewer::view_scene(&photographer, !once)
}
