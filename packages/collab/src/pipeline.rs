//! # Collab Apply Pipeline
//!
//! Applies an ordered batch of remote events to a local state.
//!
//! For each event, in array order:
//!
//! 1. envelope check: `eventId`, `actorId`, `ts`, `opId`, `commandId` non-empty
//! 2. idempotency: an `opId` already applied (in this batch or in the seeded
//!    log) is refused
//! 3. hash chain: a present `prevHash` must equal the running state hash
//! 4. decode and reduce through the injected `apply_command`
//!
//! A rejected event is recorded and skipped; later events are still tried
//! against the last good state. The reducer and hasher are injected so hosts
//! can wrap them (metrics, tracing) without the pipeline knowing.

use std::collections::BTreeSet;

use manuscript_common::{digest_value, Details};
use manuscript_core::{Command, CoreState, Reduction};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::codes::*;
use crate::event_log::{EventLog, EventLogEntry};

/// Event as delivered by the collaboration transport
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RemoteEvent {
    pub event_id: String,
    pub actor_id: String,
    pub ts: String,
    pub op_id: String,
    pub command_id: String,
    pub payload: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev_hash: Option<String>,
}

/// Inputs to [`apply_event_log`]
#[derive(Debug, Clone, Copy)]
pub struct ApplyInput<'a> {
    pub core_state: &'a CoreState,
    pub events: &'a [RemoteEvent],

    /// Hash of `core_state`, as the caller last computed it
    pub initial_state_hash: &'a str,

    /// Previously applied operations, treated as already seen
    pub event_log: Option<&'a EventLog>,
}

/// Per-event refusal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rejection {
    pub code: String,
    pub op_id: String,
    pub event_id: String,
    pub command_id: String,
    pub reason: String,
    pub details: Details,
}

/// Batch outcome
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyReport {
    pub applied_count: usize,
    pub rejected: Vec<Rejection>,
    pub next_state: CoreState,
    pub state_hash: String,

    /// Log records for the applied events, in application order
    pub entries: Vec<EventLogEntry>,
}

/// Apply `input.events` in order, collecting rejections.
pub fn apply_event_log<A, H>(input: ApplyInput<'_>, apply_command: A, hash_state: H) -> ApplyReport
where
    A: Fn(&CoreState, &Command) -> Reduction,
    H: Fn(&CoreState) -> String,
{
    let mut state = input.core_state.clone();
    let mut running_hash = input.initial_state_hash.to_string();
    let mut seen: BTreeSet<String> = input.event_log.map(EventLog::op_ids).unwrap_or_default();
    let mut rejected = Vec::new();
    let mut entries = Vec::new();

    for event in input.events {
        match apply_one(event, &state, &running_hash, &seen, &apply_command) {
            Ok((command, next)) => {
                let post_hash = hash_state(&next);
                let payload = command.payload();

                tracing::debug!(
                    op_id = %event.op_id,
                    event_id = %event.event_id,
                    command = %command.id(),
                    "remote event applied"
                );

                entries.push(EventLogEntry {
                    op_id: event.op_id.clone(),
                    ts: event.ts.clone(),
                    actor_id: event.actor_id.clone(),
                    command_id: command.id(),
                    payload_hash: digest_value(&payload),
                    pre_state_hash: running_hash.clone(),
                    post_state_hash: post_hash.clone(),
                    payload: Some(payload),
                });

                seen.insert(event.op_id.clone());
                state = next;
                running_hash = post_hash;
            }
            Err(rejection) => {
                tracing::warn!(
                    op_id = %rejection.op_id,
                    event_id = %rejection.event_id,
                    code = %rejection.code,
                    "remote event rejected"
                );
                rejected.push(rejection);
            }
        }
    }

    tracing::debug!(
        applied = entries.len(),
        rejected = rejected.len(),
        "event batch processed"
    );

    ApplyReport {
        applied_count: entries.len(),
        rejected,
        next_state: state,
        state_hash: running_hash,
        entries,
    }
}

fn apply_one<A>(
    event: &RemoteEvent,
    state: &CoreState,
    running_hash: &str,
    seen: &BTreeSet<String>,
    apply_command: &A,
) -> Result<(Command, CoreState), Rejection>
where
    A: Fn(&CoreState, &Command) -> Reduction,
{
    let missing = missing_fields(event);
    if !missing.is_empty() {
        return Err(reject(event, E_APPLY_EVENT_INVALID, "EVENT_ENVELOPE_INVALID")
            .detail("missing", json!(missing)));
    }

    if seen.contains(&event.op_id) {
        return Err(reject(event, E_APPLY_OPID_DUPLICATE, "OP_ID_ALREADY_APPLIED"));
    }

    if let Some(prev_hash) = &event.prev_hash {
        if prev_hash != running_hash {
            return Err(reject(event, E_APPLY_PREV_HASH_MISMATCH, "PREV_HASH_MISMATCH")
                .detail("expected", json!(running_hash))
                .detail("actual", json!(prev_hash)));
        }
    }

    let command = Command::from_parts(&event.command_id, event.payload.clone()).map_err(|e| {
        reject(event, E_APPLY_COMMAND_REJECTED, "COMMAND_REJECTED")
            .detail("error", e.to_envelope(&event.command_id).to_value())
    })?;

    match apply_command(state, &command) {
        Reduction::Applied { state: next, .. } => Ok((command, next)),
        Reduction::Rejected { error, .. } => Err(
            reject(event, E_APPLY_COMMAND_REJECTED, "COMMAND_REJECTED")
                .detail("error", error.to_value()),
        ),
    }
}

fn missing_fields(event: &RemoteEvent) -> Vec<&'static str> {
    [
        ("eventId", &event.event_id),
        ("actorId", &event.actor_id),
        ("ts", &event.ts),
        ("opId", &event.op_id),
        ("commandId", &event.command_id),
    ]
    .into_iter()
    .filter(|(_, value)| value.trim().is_empty())
    .map(|(name, _)| name)
    .collect()
}

fn reject(event: &RemoteEvent, code: &str, reason: &str) -> Rejection {
    Rejection {
        code: code.to_string(),
        op_id: event.op_id.clone(),
        event_id: event.event_id.clone(),
        command_id: event.command_id.clone(),
        reason: reason.to_string(),
        details: Details::new(),
    }
}

impl Rejection {
    fn detail(mut self, key: &str, value: Value) -> Self {
        self.details.insert(key.to_string(), value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use manuscript_core::{create_initial_core_state, hash_state, reduce};

    fn event(op_id: &str, command_id: &str, payload: Value) -> RemoteEvent {
        RemoteEvent {
            event_id: format!("evt-{}", op_id),
            actor_id: "bob".to_string(),
            ts: "2024-01-01T00:00:00Z".to_string(),
            op_id: op_id.to_string(),
            command_id: command_id.to_string(),
            payload,
            prev_hash: None,
        }
    }

    fn run(events: &[RemoteEvent]) -> ApplyReport {
        let state = create_initial_core_state();
        let initial = hash_state(&state);
        apply_event_log(
            ApplyInput {
                core_state: &state,
                events,
                initial_state_hash: &initial,
                event_log: None,
            },
            reduce,
            hash_state,
        )
    }

    #[test]
    fn test_missing_fields_listed() {
        let mut bad = event("op-1", "project.create", json!({}));
        bad.actor_id.clear();
        bad.ts = "  ".to_string();

        let report = run(&[bad]);
        assert_eq!(report.applied_count, 0);
        assert_eq!(report.rejected[0].code, "E_COLLAB_APPLY_EVENT_INVALID");
        assert_eq!(report.rejected[0].details["missing"], json!(["actorId", "ts"]));
    }

    #[test]
    fn test_duplicate_op_in_batch() {
        let create = event("op-1", "project.create", json!({ "projectId": "p", "title": "T" }));
        let report = run(&[create.clone(), create]);

        assert_eq!(report.applied_count, 1);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].code, "E_COLLAB_APPLY_OPID_DUPLICATE");
    }

    #[test]
    fn test_unknown_command_is_command_rejection() {
        let report = run(&[event("op-1", "project.teleport", json!({}))]);
        let rejection = &report.rejected[0];

        assert_eq!(rejection.code, "E_COLLAB_APPLY_COMMAND_REJECTED");
        assert_eq!(rejection.details["error"]["code"], "E_CORE_COMMAND_UNKNOWN");
    }

    #[test]
    fn test_entries_chain() {
        let report = run(&[
            event("op-1", "project.create", json!({ "projectId": "p", "title": "T" })),
            event("op-2", "project.createScene", json!({ "projectId": "p", "sceneId": "s" })),
        ]);

        assert_eq!(report.entries.len(), 2);
        assert_eq!(report.entries[0].post_state_hash, report.entries[1].pre_state_hash);
        assert_eq!(report.entries[1].post_state_hash, report.state_hash);
    }
}
