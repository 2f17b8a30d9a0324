use std::path::Path;

use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use manuscript_collab::{replay_event_log, replay_event_log_from_state};
use manuscript_core::{create_initial_core_state, hash_state};

use crate::config::Config;
use crate::store::{envelope_error, Store};

#[derive(Debug, Args)]
pub struct ReplayArgs {
    /// Re-run the reducer over every logged payload instead of only
    /// following the hash chain
    #[arg(long)]
    pub full: bool,
}

/// Check that the event log, replayed from an empty project, ends at the
/// saved state
pub fn replay(args: ReplayArgs, cwd: &Path, config: &Config) -> Result<()> {
    let store = Store::new(cwd, config);
    let state = store.load_state()?;
    let log = store.load_event_log()?;
    let expected = hash_state(&state);
    let initial = create_initial_core_state();

    let (final_hash, count) = if args.full {
        let replayed = replay_event_log_from_state(&log, &initial).map_err(envelope_error)?;
        if replayed.state != state {
            return Err(anyhow!("replayed state differs from the saved state"));
        }
        (replayed.state_hash, replayed.replayed_count)
    } else {
        let outcome = replay_event_log(&log, &hash_state(&initial));
        if let Some(error) = outcome.error {
            return Err(envelope_error(error));
        }
        (outcome.final_state_hash, outcome.replayed_count)
    };

    if final_hash != expected {
        return Err(anyhow!(
            "log replays to {} but the saved state hashes to {}",
            final_hash,
            expected
        ));
    }

    println!(
        "{} {} event(s) replay to {}",
        "✓".green(),
        count,
        final_hash.bright_white()
    );
    Ok(())
}
