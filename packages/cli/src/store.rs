//! Loading and saving the project's state and event log.
//!
//! Both files are written through `save_markdown`, so every save leaves a
//! recovery snapshot of the previous version behind.
//!
//! The two files cannot be replaced in one step. [`Store::commit`] writes the
//! log before the state, so an interrupted commit leaves the state behind the
//! log and never ahead of it. [`Store::load`] then rolls the state forward
//! through the logged payloads it has not reached yet. A state ahead of its
//! log would let a redelivered event pass the opId check a second time.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use colored::Colorize;
use manuscript_collab::{
    create_empty_event_log, parse_event_log, replay_event_log_from_state, serialize_event_log,
    EventLog,
};
use manuscript_common::ErrorEnvelope;
use manuscript_core::{hash_state, CoreState, CORE_STATE_VERSION};
use manuscript_io::{
    list_recovery_snapshots, read_markdown_with_recovery, save_markdown, FileSystemPort,
    SnapshotOptions, StdFileSystem, WriteOptions,
};

use crate::config::Config;

pub struct Store<'a> {
    cwd: &'a Path,
    config: &'a Config,
}

impl<'a> Store<'a> {
    pub fn new(cwd: &'a Path, config: &'a Config) -> Self {
        Self { cwd, config }
    }

    pub fn state_path(&self) -> PathBuf {
        self.config.state_path(self.cwd)
    }

    pub fn event_log_path(&self) -> PathBuf {
        self.config.event_log_path(self.cwd)
    }

    /// Load state and log together, replaying logged entries the saved
    /// state has not reached yet
    pub fn load(&self) -> Result<(CoreState, EventLog)> {
        let state = self.load_state()?;
        let log = self.load_event_log()?;
        let state_hash = hash_state(&state);

        if log.head_hash().map_or(true, |head| head == state_hash) {
            return Ok((state, log));
        }

        let events = log.events();
        let start = events
            .iter()
            .rposition(|e| e.post_state_hash == state_hash)
            .map(|index| index + 1)
            .or_else(|| events.iter().position(|e| e.pre_state_hash == state_hash));
        let start = match start {
            Some(start) => start,
            // unrelated to the log; `replay` reports the divergence
            None => return Ok((state, log)),
        };

        let mut pending = create_empty_event_log();
        for entry in &events[start..] {
            pending.try_push(entry.clone()).map_err(envelope_error)?;
        }
        let replayed = replay_event_log_from_state(&pending, &state).map_err(envelope_error)?;

        tracing::warn!(
            pending = replayed.replayed_count,
            state_hash = %replayed.state_hash,
            "saved state was behind the event log"
        );
        println!(
            "{} state was {} event(s) behind the log; rolled forward",
            "⚠️".yellow(),
            replayed.replayed_count
        );

        self.save_state(&replayed.state)?;
        Ok((replayed.state, log))
    }

    /// Persist a new state and the log that produced it, log first
    pub fn commit(&self, state: &CoreState, event_log: &EventLog) -> Result<()> {
        self.save_event_log(event_log)?;
        self.save_state(state)
    }

    /// Read a user-supplied input file relative to the project directory
    pub fn read_input(&self, path: &Path) -> Result<String> {
        let port = StdFileSystem::new(self.config.safety_mode);
        Ok(port.read_text(&self.cwd.join(path))?)
    }

    pub fn load_state(&self) -> Result<CoreState> {
        let path = self.state_path();
        let content = self.read_text(&path)?;
        let state: CoreState = serde_json::from_str(&content)
            .with_context(|| format!("{} is not a valid state file", path.display()))?;

        if state.version != CORE_STATE_VERSION {
            return Err(anyhow!(
                "unsupported state version {} (expected {})",
                state.version,
                CORE_STATE_VERSION
            ));
        }
        Ok(state)
    }

    pub fn load_event_log(&self) -> Result<EventLog> {
        let content = self.read_text(&self.event_log_path())?;
        parse_event_log(&content).map_err(envelope_error)
    }

    fn save_state(&self, state: &CoreState) -> Result<()> {
        let content = serde_json::to_string_pretty(&state.to_value())?;
        self.save(&self.state_path(), &content)
    }

    fn save_event_log(&self, event_log: &EventLog) -> Result<()> {
        self.save(&self.event_log_path(), &serialize_event_log(event_log))
    }

    /// Snapshot then atomically replace `path`
    pub fn save(&self, path: &Path, content: &str) -> Result<()> {
        let floor = list_recovery_snapshots(path)?
            .last()
            .map(|s| s.tick)
            .unwrap_or(0);
        let now = move || wall_clock_tick().max(floor);

        let write = WriteOptions::new(self.config.safety_mode);
        let mut snapshots = SnapshotOptions::new(self.config.max_snapshots, &now);
        snapshots.safety_mode = self.config.safety_mode;

        save_markdown(path, content, &write, &snapshots)?;
        Ok(())
    }

    fn read_text(&self, path: &Path) -> Result<String> {
        let doc = read_markdown_with_recovery(path, &self.config.read_options())?;
        if doc.recovered_from_snapshot {
            println!(
                "{} {} was damaged; loaded {}",
                "⚠️".yellow(),
                path.display(),
                doc.source_path.display()
            );
        }
        Ok(doc.content)
    }
}

/// First `{actor}-{n}` not already in the log, counting up from its length
pub fn next_op_id(event_log: &EventLog, actor: &str) -> String {
    (event_log.len() + 1..)
        .map(|n| format!("{}-{}", actor, n))
        .find(|op_id| !event_log.contains_op(op_id))
        .unwrap_or_else(|| format!("{}-{}", actor, event_log.len() + 1))
}

/// Milliseconds since the epoch; snapshot ticks never go below the newest
/// existing one, so ordering stays monotonic if the wall clock steps back
fn wall_clock_tick() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
}

/// ISO-8601 timestamp for new log entries
pub fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

pub fn envelope_error(envelope: ErrorEnvelope) -> anyhow::Error {
    let details = serde_json::to_string(&envelope.details).unwrap_or_default();
    anyhow!("{} {}", envelope, details)
}

#[cfg(test)]
mod tests {
    use super::*;
    use manuscript_collab::{apply_command_with_event_log, create_empty_event_log, LoggedCommand};
    use manuscript_core::{create_initial_core_state, Command};

    #[test]
    fn test_round_trip_with_snapshots() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        let store = Store::new(dir.path(), &config);

        let state = create_initial_core_state();
        let log = create_empty_event_log();
        store.save_state(&state).unwrap();
        store.save_event_log(&log).unwrap();

        let applied = apply_command_with_event_log(
            &state,
            &log,
            LoggedCommand {
                op_id: "op-1".to_string(),
                actor_id: "me".to_string(),
                ts: now_iso(),
                command: Command::create_project("p-1", "Book"),
            },
        )
        .unwrap();
        store.save_state(&applied.state).unwrap();
        store.save_event_log(&applied.event_log).unwrap();

        assert_eq!(store.load_state().unwrap(), applied.state);
        assert_eq!(store.load_event_log().unwrap(), applied.event_log);
        assert_eq!(list_recovery_snapshots(&store.state_path()).unwrap().len(), 1);
    }

    #[test]
    fn test_damaged_state_loads_from_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        let store = Store::new(dir.path(), &config);

        let state = create_initial_core_state();
        store.save_state(&state).unwrap();
        store.save_state(&state).unwrap();
        std::fs::write(store.state_path(), b"{\0").unwrap();

        assert_eq!(store.load_state().unwrap(), state);
    }

    #[test]
    fn test_snapshot_ticks_never_decrease() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        let store = Store::new(dir.path(), &config);
        let path = dir.path().join("scene.md");

        std::fs::write(&path, "a").unwrap();
        std::fs::write(dir.path().join(".scene.md.bak.99999999999999"), "future").unwrap();
        store.save(&path, "b").unwrap();

        let ticks: Vec<u64> = list_recovery_snapshots(&path)
            .unwrap()
            .iter()
            .map(|s| s.tick)
            .collect();
        assert_eq!(ticks, vec![99999999999999, 99999999999999]);
    }

    fn logged(op_id: &str, command: Command) -> LoggedCommand {
        LoggedCommand {
            op_id: op_id.to_string(),
            actor_id: "me".to_string(),
            ts: "2024-01-01T00:00:00.000Z".to_string(),
            command,
        }
    }

    #[test]
    fn test_next_op_id_skips_taken_ids() {
        let state = create_initial_core_state();
        let log = create_empty_event_log();
        assert_eq!(next_op_id(&log, "me"), "me-1");

        // a synced op already holds the id the log length would suggest
        let first = apply_command_with_event_log(
            &state,
            &log,
            logged("me-2", Command::create_project("p-1", "Book")),
        )
        .unwrap();
        assert_eq!(next_op_id(&first.event_log, "me"), "me-3");

        let second = apply_command_with_event_log(
            &first.state,
            &first.event_log,
            logged(&next_op_id(&first.event_log, "me"), Command::create_scene("p-1", "s-1")),
        )
        .unwrap();
        assert_eq!(second.event_log.len(), 2);
        assert_eq!(next_op_id(&second.event_log, "me"), "me-4");
    }

    #[test]
    fn test_load_rolls_state_forward_to_log() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        let store = Store::new(dir.path(), &config);

        let state = create_initial_core_state();
        let log = create_empty_event_log();
        store.commit(&state, &log).unwrap();

        let first = apply_command_with_event_log(
            &state,
            &log,
            logged("op-1", Command::create_project("p-1", "Book")),
        )
        .unwrap();
        store.commit(&first.state, &first.event_log).unwrap();

        let second = apply_command_with_event_log(
            &first.state,
            &first.event_log,
            logged("op-2", Command::create_scene("p-1", "s-1")),
        )
        .unwrap();
        // interrupted commit: only the log made it to disk
        store.save_event_log(&second.event_log).unwrap();
        assert_eq!(store.load_state().unwrap(), first.state);

        let (loaded, loaded_log) = store.load().unwrap();
        assert_eq!(loaded, second.state);
        assert_eq!(loaded_log, second.event_log);
        assert_eq!(store.load_state().unwrap(), second.state);
    }

    #[test]
    fn test_load_leaves_unrelated_state_alone() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        let store = Store::new(dir.path(), &config);

        let state = create_initial_core_state();
        let applied = apply_command_with_event_log(
            &state,
            &create_empty_event_log(),
            logged("op-1", Command::create_project("p-1", "Book")),
        )
        .unwrap();

        let mut stray = state.clone();
        stray.data.last_command_id = 7;
        store.commit(&stray, &applied.event_log).unwrap();

        let (loaded, _) = store.load().unwrap();
        assert_eq!(loaded, stray);
    }

    #[test]
    fn test_read_input_relative_to_project() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        let store = Store::new(dir.path(), &config);
        std::fs::write(dir.path().join("cmds.json"), "[]").unwrap();

        assert_eq!(store.read_input(Path::new("cmds.json")).unwrap(), "[]");
        assert!(store.read_input(Path::new("missing.json")).is_err());
    }

    #[test]
    fn test_envelope_error_mentions_code() {
        let err = envelope_error(ErrorEnvelope::new("E_X", "op", "WHY").with_detail("k", 1));
        let text = err.to_string();
        assert!(text.contains("E_X"));
        assert!(text.contains("\"k\":1"));
    }
}
