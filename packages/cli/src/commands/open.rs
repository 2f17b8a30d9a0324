use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use manuscript_collab::{apply_command_with_event_log, LoggedCommand};
use manuscript_core::Command;
use manuscript_io::{read_markdown_with_recovery, replay_markdown_recovery, WriteOptions};

use crate::config::Config;
use crate::store::{envelope_error, next_op_id, now_iso, Store};

#[derive(Debug, Args)]
pub struct OpenArgs {
    /// Markdown file to open
    pub input: PathBuf,

    /// Expected SHA-256 of the file content
    #[arg(long)]
    pub expect: Option<String>,

    /// Rewrite the file from its snapshot if it had to be recovered
    #[arg(long)]
    pub restore: bool,

    /// Import the content into this project's scene (requires --scene)
    #[arg(long, requires = "scene")]
    pub project: Option<String>,

    #[arg(long, requires = "project")]
    pub scene: Option<String>,

    /// Actor recorded for the import
    #[arg(short, long, default_value = "local")]
    pub actor: String,
}

pub fn open(args: OpenArgs, cwd: &Path, config: &Config) -> Result<()> {
    let path = cwd.join(&args.input);
    let mut options = config.read_options();
    options.expected_sha256 = args.expect.clone();

    let doc = if args.restore {
        replay_markdown_recovery(&path, &options, &WriteOptions::new(config.safety_mode))
    } else {
        read_markdown_with_recovery(&path, &options)
    };

    let doc = match doc {
        Ok(doc) => doc,
        Err(err) => {
            let actions: Vec<&str> = err.recovery_actions.iter().map(|a| a.as_str()).collect();
            println!("{} {}", "✗".red(), err.user_message());
            println!("  Options: {}", actions.join(", "));
            return Err(err.into());
        }
    };

    if let Some(primary) = &doc.primary_error {
        println!(
            "{} {} ({}); opened snapshot {}",
            "⚠️".yellow(),
            path.display(),
            primary.code,
            doc.source_path.display()
        );
        if doc.restored_primary {
            println!("  {} Restored {}", "✓".green(), path.display());
        }
    } else {
        println!("{} Opened {} ({} bytes)", "✓".green(), path.display(), doc.content.len());
    }

    if let (Some(project_id), Some(scene_id)) = (args.project, args.scene) {
        let store = Store::new(cwd, config);
        let (state, log) = store.load()?;

        let applied = apply_command_with_event_log(
            &state,
            &log,
            LoggedCommand {
                op_id: next_op_id(&log, &args.actor),
                actor_id: args.actor.clone(),
                ts: now_iso(),
                command: Command::apply_text_edit(&project_id, &scene_id, doc.content),
            },
        )
        .map_err(envelope_error)?;

        store.commit(&applied.state, &applied.event_log)?;
        println!(
            "  {} Imported into {}/{} → {}",
            "✓".green(),
            project_id,
            scene_id,
            applied.state_hash
        );
    } else {
        println!();
        println!("{}", doc.content);
    }

    Ok(())
}
