use std::fs;
use std::path::Path;

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use manuscript_collab::create_empty_event_log;
use manuscript_core::create_initial_core_state;
use manuscript_io::{atomic_write_file, WriteOptions};

use crate::config::{Config, DEFAULT_CONFIG_NAME};
use crate::store::Store;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Force overwrite existing config and state
    #[arg(short, long)]
    pub force: bool,
}

pub fn init(args: InitArgs, cwd: &Path, config: &Config) -> Result<()> {
    let config_path = cwd.join(DEFAULT_CONFIG_NAME);

    // Check if config already exists
    if config_path.exists() && !args.force {
        println!(
            "{} {} already exists",
            "⚠️".yellow(),
            DEFAULT_CONFIG_NAME.bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    println!(
        "{}",
        "📝 Initializing manuscript project...".bright_blue().bold()
    );

    let write = WriteOptions::new(config.safety_mode);
    let config_json = serde_json::to_string_pretty(config)?;
    atomic_write_file(&config_path, config_json.as_bytes(), &write)?;
    println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);

    let store = Store::new(cwd, config);
    for path in [store.state_path(), store.event_log_path()] {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
    }

    store.commit(&create_initial_core_state(), &create_empty_event_log())?;
    println!("  {} Created {}", "✓".green(), config.event_log_file);
    println!("  {} Created {}", "✓".green(), config.state_file);

    println!();
    println!("{}", "✅ Project initialized!".green().bold());
    println!();
    println!("Next steps:");
    println!("  1. Write commands to a JSON file, e.g. commands.json");
    println!("  2. Run: manuscript apply commands.json --actor you");
    println!("  3. Run: manuscript view referenceOutline");

    Ok(())
}
