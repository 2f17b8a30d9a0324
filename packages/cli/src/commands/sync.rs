use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use manuscript_collab::{apply_event_log, ApplyInput, RemoteEvent};
use manuscript_core::{hash_state, reduce};

use crate::config::Config;
use crate::store::{envelope_error, Store};

#[derive(Debug, Args)]
pub struct SyncArgs {
    /// JSON array of remote events `{eventId, actorId, ts, opId, commandId, payload, prevHash?}`
    pub events: PathBuf,

    /// Report what would happen without saving
    #[arg(long)]
    pub dry_run: bool,
}

pub fn sync(args: SyncArgs, cwd: &Path, config: &Config) -> Result<()> {
    let store = Store::new(cwd, config);
    let raw = store.read_input(&args.events)?;
    let events: Vec<RemoteEvent> = serde_json::from_str(&raw)?;

    let (state, mut log) = store.load()?;
    let initial_hash = hash_state(&state);

    let report = apply_event_log(
        ApplyInput {
            core_state: &state,
            events: &events,
            initial_state_hash: &initial_hash,
            event_log: Some(&log),
        },
        reduce,
        hash_state,
    );

    println!(
        "{} {} applied, {} rejected",
        "Sync:".green().bold(),
        report.applied_count,
        report.rejected.len()
    );
    for rejection in &report.rejected {
        println!(
            "  {} {} {} {}",
            "✗".red(),
            rejection.op_id,
            rejection.code.yellow(),
            serde_json::to_string(&rejection.details)?.dimmed()
        );
    }

    if args.dry_run || report.applied_count == 0 {
        return Ok(());
    }

    for entry in report.entries {
        log.try_push(entry).map_err(envelope_error)?;
    }
    store.commit(&report.next_state, &log)?;

    println!("✨ {} state {}", "Saved".green().bold(), report.state_hash);
    Ok(())
}
