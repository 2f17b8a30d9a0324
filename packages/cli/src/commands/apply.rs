use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use manuscript_collab::{apply_command_with_event_log, LoggedCommand};
use manuscript_core::{hash_state, Command};
use serde::Deserialize;
use serde_json::Value;

use crate::config::Config;
use crate::store::{envelope_error, next_op_id, now_iso, Store};

#[derive(Debug, Args)]
pub struct ApplyArgs {
    /// JSON file with a command or an array of commands (`{type, payload, opId?}`)
    pub input: PathBuf,

    /// Actor recorded in the event log
    #[arg(short, long, default_value = "local")]
    pub actor: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommandInput {
    #[serde(rename = "type")]
    command_id: String,
    #[serde(default)]
    payload: Value,
    op_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Batch {
    Many(Vec<CommandInput>),
    One(CommandInput),
}

pub fn apply(args: ApplyArgs, cwd: &Path, config: &Config) -> Result<()> {
    let store = Store::new(cwd, config);
    let raw = store.read_input(&args.input)?;
    let inputs = match serde_json::from_str::<Batch>(&raw)? {
        Batch::Many(inputs) => inputs,
        Batch::One(input) => vec![input],
    };

    let (mut state, mut log) = store.load()?;
    let mut state_hash = hash_state(&state);

    println!("{} {} command(s)", "Applying".green().bold(), inputs.len());

    for (index, input) in inputs.into_iter().enumerate() {
        let command = Command::from_parts(&input.command_id, input.payload)
            .map_err(|e| envelope_error(e.to_envelope(&input.command_id)))?;
        let op_id = input
            .op_id
            .unwrap_or_else(|| next_op_id(&log, &args.actor));

        let applied = apply_command_with_event_log(
            &state,
            &log,
            LoggedCommand {
                op_id: op_id.clone(),
                actor_id: args.actor.clone(),
                ts: now_iso(),
                command,
            },
        )
        .map_err(|envelope| {
            anyhow!(
                "command {} ({}) rejected, nothing saved: {}",
                index,
                op_id,
                envelope_error(envelope)
            )
        })?;

        println!("  {} {} {}", "✓".green(), applied.entry.command_id, op_id.dimmed());
        state = applied.state;
        log = applied.event_log;
        state_hash = applied.state_hash;
    }

    store.commit(&state, &log)?;

    println!();
    println!("✨ {} state {}", "Saved".green().bold(), state_hash);
    Ok(())
}
