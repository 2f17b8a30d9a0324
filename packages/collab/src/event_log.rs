//! # Event Log
//!
//! Append-only, ordered record of applied commands.
//!
//! ## Laws
//!
//! - `opId` is a unique key: a second append with the same `opId` is refused
//!   and the log is left exactly as it was
//! - entries are never removed or rewritten after append
//! - each entry records the state hash before and after its command, so
//!   consecutive entries form a hash chain
//!
//! Entries written by [`apply_command_with_event_log`] also keep the command
//! payload, which lets [`replay_event_log_from_state`] rebuild the full state
//! rather than only following the hash chain.

use std::collections::BTreeSet;

use manuscript_common::{canonical_string, digest_value, ErrorEnvelope};
use manuscript_core::{hash_state, reduce, Command, CommandId, CoreState, Reduction};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::codes::*;

/// Wire shape version of a serialized log
pub const EVENT_LOG_SCHEMA_VERSION: u32 = 1;

/// One applied command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventLogEntry {
    pub op_id: String,

    /// ISO-8601 timestamp, resolved by the caller
    pub ts: String,

    pub actor_id: String,
    pub command_id: CommandId,
    pub payload_hash: String,
    pub pre_state_hash: String,
    pub post_state_hash: String,

    /// Command payload, present for locally recorded entries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl EventLogEntry {
    pub fn to_value(&self) -> Value {
        let mut value = json!({
            "opId": self.op_id,
            "ts": self.ts,
            "actorId": self.actor_id,
            "commandId": self.command_id.as_str(),
            "payloadHash": self.payload_hash,
            "preStateHash": self.pre_state_hash,
            "postStateHash": self.post_state_hash,
        });
        if let (Some(payload), Some(obj)) = (&self.payload, value.as_object_mut()) {
            obj.insert("payload".to_string(), payload.clone());
        }
        value
    }
}

/// `{schemaVersion, events}`
///
/// Fields are private so the only way to grow a log is through the
/// duplicate-checking append.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventLog {
    schema_version: u32,
    events: Vec<EventLogEntry>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEventLog {
    schema_version: u32,
    #[serde(default)]
    events: Vec<EventLogEntry>,
}

impl EventLog {
    pub fn schema_version(&self) -> u32 {
        self.schema_version
    }

    pub fn events(&self) -> &[EventLogEntry] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn contains_op(&self, op_id: &str) -> bool {
        self.events.iter().any(|e| e.op_id == op_id)
    }

    pub fn op_ids(&self) -> BTreeSet<String> {
        self.events.iter().map(|e| e.op_id.clone()).collect()
    }

    /// Hash the log would end on if its chain is intact
    pub fn head_hash(&self) -> Option<&str> {
        self.events.last().map(|e| e.post_state_hash.as_str())
    }

    /// In-place append for hosts that own the log by value
    pub fn try_push(&mut self, entry: EventLogEntry) -> Result<(), ErrorEnvelope> {
        if entry.op_id.trim().is_empty() {
            return Err(
                ErrorEnvelope::new(E_EVENTLOG_ENTRY_INVALID, OP_EVENTLOG_APPEND, "OP_ID_EMPTY")
                    .with_detail("index", self.events.len()),
            );
        }

        if self.contains_op(&entry.op_id) {
            tracing::debug!(op_id = %entry.op_id, "duplicate opId refused");
            return Err(ErrorEnvelope::new(
                E_EVENTLOG_OPID_DUPLICATE,
                OP_EVENTLOG_APPEND,
                "OP_ID_ALREADY_EXISTS",
            )
            .with_detail("opId", entry.op_id));
        }

        self.events.push(entry);
        Ok(())
    }

    pub fn to_value(&self) -> Value {
        let events: Vec<Value> = self.events.iter().map(EventLogEntry::to_value).collect();
        json!({
            "schemaVersion": self.schema_version,
            "events": events,
        })
    }
}

pub fn create_empty_event_log() -> EventLog {
    EventLog {
        schema_version: EVENT_LOG_SCHEMA_VERSION,
        events: Vec::new(),
    }
}

/// Return a new log with `entry` appended, or the duplicate-opId error.
pub fn append_event_log_entry(
    event_log: &EventLog,
    entry: EventLogEntry,
) -> Result<EventLog, ErrorEnvelope> {
    let mut next = event_log.clone();
    next.try_push(entry)?;
    Ok(next)
}

/// Canonical JSON text of the log
pub fn serialize_event_log(event_log: &EventLog) -> String {
    canonical_string(&event_log.to_value())
}

pub fn hash_event_log(event_log: &EventLog) -> String {
    digest_value(&event_log.to_value())
}

/// Decode a serialized log, re-checking opId uniqueness
pub fn parse_event_log(text: &str) -> Result<EventLog, ErrorEnvelope> {
    let raw: RawEventLog = serde_json::from_str(text).map_err(|e| {
        ErrorEnvelope::new(E_EVENTLOG_DECODE_FAILED, OP_EVENTLOG_PARSE, "DECODE_FAILED")
            .with_detail("message", e.to_string())
    })?;

    if raw.schema_version != EVENT_LOG_SCHEMA_VERSION {
        return Err(ErrorEnvelope::new(
            E_EVENTLOG_SCHEMA_UNSUPPORTED,
            OP_EVENTLOG_PARSE,
            "SCHEMA_VERSION_UNSUPPORTED",
        )
        .with_detail("schemaVersion", raw.schema_version)
        .with_detail("supported", EVENT_LOG_SCHEMA_VERSION));
    }

    let mut log = create_empty_event_log();
    for entry in raw.events {
        log.try_push(entry)?;
    }
    Ok(log)
}

/// A command plus the caller-resolved metadata it is logged with
#[derive(Debug, Clone, PartialEq)]
pub struct LoggedCommand {
    pub op_id: String,
    pub actor_id: String,
    pub ts: String,
    pub command: Command,
}

/// Result of [`apply_command_with_event_log`]
#[derive(Debug, Clone, PartialEq)]
pub struct LoggedApply {
    pub state: CoreState,
    pub state_hash: String,
    pub event_log: EventLog,
    pub entry: EventLogEntry,
}

/// Reduce `command` and record it.
///
/// A duplicate `opId` is refused before the reducer runs; a reducer failure
/// is returned as-is and nothing is appended.
pub fn apply_command_with_event_log(
    state: &CoreState,
    event_log: &EventLog,
    logged: LoggedCommand,
) -> Result<LoggedApply, ErrorEnvelope> {
    if event_log.contains_op(&logged.op_id) {
        return Err(ErrorEnvelope::new(
            E_EVENTLOG_OPID_DUPLICATE,
            OP_EVENTLOG_APPEND,
            "OP_ID_ALREADY_EXISTS",
        )
        .with_detail("opId", logged.op_id));
    }

    let pre_state_hash = hash_state(state);
    let (next, post_state_hash) = match reduce(state, &logged.command) {
        Reduction::Applied { state, state_hash } => (state, state_hash),
        Reduction::Rejected { error, .. } => return Err(error),
    };

    let payload = logged.command.payload();
    let entry = EventLogEntry {
        op_id: logged.op_id,
        ts: logged.ts,
        actor_id: logged.actor_id,
        command_id: logged.command.id(),
        payload_hash: digest_value(&payload),
        pre_state_hash,
        post_state_hash: post_state_hash.clone(),
        payload: Some(payload),
    };

    let event_log = append_event_log_entry(event_log, entry.clone())?;

    Ok(LoggedApply {
        state: next,
        state_hash: post_state_hash,
        event_log,
        entry,
    })
}

/// Result of following a log's hash chain
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayOutcome {
    pub ok: bool,

    /// Last hash reached; on failure, the hash before the broken entry
    pub final_state_hash: String,

    pub replayed_count: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorEnvelope>,
}

/// Fold the hash chain from `initial_state_hash`.
///
/// Every entry must start where the previous one ended.
pub fn replay_event_log(event_log: &EventLog, initial_state_hash: &str) -> ReplayOutcome {
    let mut running = initial_state_hash.to_string();

    for (index, entry) in event_log.events().iter().enumerate() {
        if entry.pre_state_hash != running {
            tracing::warn!(op_id = %entry.op_id, index, "event log hash chain broken");
            return ReplayOutcome {
                ok: false,
                final_state_hash: running.clone(),
                replayed_count: index,
                error: Some(chain_broken(entry, index, &running)),
            };
        }
        running = entry.post_state_hash.clone();
    }

    ReplayOutcome {
        ok: true,
        final_state_hash: running,
        replayed_count: event_log.len(),
        error: None,
    }
}

/// Result of re-running the reducer over a log
#[derive(Debug, Clone, PartialEq)]
pub struct StateReplay {
    pub state: CoreState,
    pub state_hash: String,
    pub replayed_count: usize,
}

/// Rebuild the state by reducing every entry's payload from `initial_state`.
///
/// Each step is checked against the recorded payload hash and both recorded
/// state hashes, so a log that was edited or reordered is caught at the
/// first divergent entry.
pub fn replay_event_log_from_state(
    event_log: &EventLog,
    initial_state: &CoreState,
) -> Result<StateReplay, ErrorEnvelope> {
    let mut state = initial_state.clone();
    let mut running = hash_state(&state);

    for (index, entry) in event_log.events().iter().enumerate() {
        let payload = entry.payload.as_ref().ok_or_else(|| {
            replay_error(E_EVENTLOG_PAYLOAD_MISSING, "PAYLOAD_MISSING", entry, index)
        })?;

        let payload_hash = digest_value(payload);
        if payload_hash != entry.payload_hash {
            return Err(
                replay_error(E_EVENTLOG_PAYLOAD_MISMATCH, "PAYLOAD_HASH_MISMATCH", entry, index)
                    .with_detail("expected", entry.payload_hash.clone())
                    .with_detail("actual", payload_hash),
            );
        }

        if entry.pre_state_hash != running {
            return Err(chain_broken(entry, index, &running));
        }

        let command = Command::from_parts(entry.command_id.as_str(), payload.clone()).map_err(|e| {
            replay_error(E_EVENTLOG_REPLAY_REJECTED, "COMMAND_REJECTED", entry, index)
                .with_detail("error", e.to_envelope(entry.command_id.as_str()).to_value())
        })?;

        match reduce(&state, &command) {
            Reduction::Applied { state: next, state_hash } => {
                if state_hash != entry.post_state_hash {
                    return Err(
                        replay_error(E_EVENTLOG_REPLAY_DIVERGED, "POST_STATE_HASH_MISMATCH", entry, index)
                            .with_detail("expected", entry.post_state_hash.clone())
                            .with_detail("actual", state_hash),
                    );
                }
                state = next;
                running = state_hash;
            }
            Reduction::Rejected { error, .. } => {
                return Err(
                    replay_error(E_EVENTLOG_REPLAY_REJECTED, "COMMAND_REJECTED", entry, index)
                        .with_detail("error", error.to_value()),
                );
            }
        }
    }

    Ok(StateReplay {
        state,
        state_hash: running,
        replayed_count: event_log.len(),
    })
}

fn replay_error(code: &str, reason: &str, entry: &EventLogEntry, index: usize) -> ErrorEnvelope {
    ErrorEnvelope::new(code, OP_EVENTLOG_REPLAY, reason)
        .with_detail("opId", entry.op_id.clone())
        .with_detail("index", index)
}

fn chain_broken(entry: &EventLogEntry, index: usize, running: &str) -> ErrorEnvelope {
    replay_error(E_EVENTLOG_CHAIN_BROKEN, "PRE_STATE_HASH_MISMATCH", entry, index)
        .with_detail("expected", running.to_string())
        .with_detail("actual", entry.pre_state_hash.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use manuscript_core::create_initial_core_state;

    fn entry(op_id: &str, pre: &str, post: &str) -> EventLogEntry {
        EventLogEntry {
            op_id: op_id.to_string(),
            ts: "2024-01-01T00:00:00Z".to_string(),
            actor_id: "alice".to_string(),
            command_id: CommandId::ProjectCreate,
            payload_hash: digest_value(&json!({})),
            pre_state_hash: pre.to_string(),
            post_state_hash: post.to_string(),
            payload: None,
        }
    }

    #[test]
    fn test_empty_log() {
        let log = create_empty_event_log();
        assert_eq!(log.schema_version(), EVENT_LOG_SCHEMA_VERSION);
        assert!(log.is_empty());
        assert_eq!(log.head_hash(), None);
    }

    #[test]
    fn test_duplicate_op_id_refused() {
        let log = append_event_log_entry(&create_empty_event_log(), entry("op-1", "a", "b")).unwrap();
        let err = append_event_log_entry(&log, entry("op-1", "b", "c")).unwrap_err();

        assert_eq!(err.code, "E_COLLAB_EVENTLOG_OPID_DUPLICATE");
        assert_eq!(err.op, "collab.eventlog.append");
        assert_eq!(err.reason, "OP_ID_ALREADY_EXISTS");
        assert_eq!(err.detail_str("opId"), Some("op-1"));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_empty_op_id_refused() {
        let err = append_event_log_entry(&create_empty_event_log(), entry(" ", "a", "b")).unwrap_err();
        assert_eq!(err.code, "E_COLLAB_EVENTLOG_ENTRY_INVALID");
    }

    #[test]
    fn test_to_value_matches_serde() {
        let mut log = create_empty_event_log();
        log.try_push(entry("op-1", "a", "b")).unwrap();
        let mut with_payload = entry("op-2", "b", "c");
        with_payload.payload = Some(json!({ "projectId": "p" }));
        log.try_push(with_payload).unwrap();

        assert_eq!(log.to_value(), serde_json::to_value(&log).unwrap());
    }

    #[test]
    fn test_parse_round_trip() {
        let mut log = create_empty_event_log();
        log.try_push(entry("op-1", "a", "b")).unwrap();

        let parsed = parse_event_log(&serialize_event_log(&log)).unwrap();
        assert_eq!(parsed, log);
        assert_eq!(hash_event_log(&parsed), hash_event_log(&log));
    }

    #[test]
    fn test_parse_rejects_duplicates_and_unknown_schema() {
        let dup = json!({
            "schemaVersion": 1,
            "events": [entry("x", "a", "b").to_value(), entry("x", "b", "c").to_value()],
        });
        let err = parse_event_log(&dup.to_string()).unwrap_err();
        assert_eq!(err.code, "E_COLLAB_EVENTLOG_OPID_DUPLICATE");

        let future = json!({ "schemaVersion": 9, "events": [] });
        let err = parse_event_log(&future.to_string()).unwrap_err();
        assert_eq!(err.code, "E_COLLAB_EVENTLOG_SCHEMA_UNSUPPORTED");

        let err = parse_event_log("not json").unwrap_err();
        assert_eq!(err.code, "E_COLLAB_EVENTLOG_DECODE_FAILED");
    }

    #[test]
    fn test_replay_detects_broken_chain() {
        let mut log = create_empty_event_log();
        log.try_push(entry("op-1", "h0", "h1")).unwrap();
        log.try_push(entry("op-2", "hX", "h2")).unwrap();

        let outcome = replay_event_log(&log, "h0");
        assert!(!outcome.ok);
        assert_eq!(outcome.final_state_hash, "h1");
        assert_eq!(outcome.replayed_count, 1);
        let error = outcome.error.unwrap();
        assert_eq!(error.code, "E_COLLAB_EVENTLOG_CHAIN_BROKEN");
        assert_eq!(error.detail_str("opId"), Some("op-2"));
    }

    #[test]
    fn test_apply_with_log_records_hashes() {
        let state = create_initial_core_state();
        let applied = apply_command_with_event_log(
            &state,
            &create_empty_event_log(),
            LoggedCommand {
                op_id: "op-1".into(),
                actor_id: "alice".into(),
                ts: "2024-01-01T00:00:00Z".into(),
                command: Command::create_project("p-1", "Draft"),
            },
        )
        .unwrap();

        assert_eq!(applied.entry.pre_state_hash, hash_state(&state));
        assert_eq!(applied.entry.post_state_hash, applied.state_hash);
        assert_eq!(applied.entry.command_id, CommandId::ProjectCreate);
        assert_eq!(applied.event_log.head_hash(), Some(applied.state_hash.as_str()));
    }

    #[test]
    fn test_apply_with_log_propagates_reducer_error() {
        let state = create_initial_core_state();
        let log = create_empty_event_log();
        let err = apply_command_with_event_log(
            &state,
            &log,
            LoggedCommand {
                op_id: "op-1".into(),
                actor_id: "alice".into(),
                ts: "2024-01-01T00:00:00Z".into(),
                command: Command::create_scene("missing", "s"),
            },
        )
        .unwrap_err();

        assert_eq!(err.code, "E_CORE_PROJECT_NOT_FOUND");
        assert!(log.is_empty());
    }
}
