use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;

use crate::config::Config;
use crate::store::Store;

#[derive(Debug, Args)]
pub struct SaveArgs {
    pub project_id: String,

    pub scene_id: String,

    /// Markdown file to write
    pub output: PathBuf,
}

/// Export a scene's text to a markdown file
pub fn save(args: SaveArgs, cwd: &Path, config: &Config) -> Result<()> {
    let store = Store::new(cwd, config);
    let (state, _) = store.load()?;

    let scene = state
        .scene(&args.project_id, &args.scene_id)
        .ok_or_else(|| anyhow!("scene {}/{} not found", args.project_id, args.scene_id))?;

    let output = cwd.join(&args.output);
    store.save(&output, &scene.text)?;

    println!(
        "{} {}/{} → {} ({} mode)",
        "✓".green(),
        args.project_id,
        args.scene_id,
        output.display(),
        config.safety_mode
    );
    Ok(())
}
