//! Operation history, newest first.
//!
//! The state itself only remembers a counter; the entries come from an
//! event log the host passes in as params.

use manuscript_collab::EventLogEntry;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::engine::{run, DeriveInput, DerivedViewResult, ViewKind};
use crate::errors::ViewError;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct HistoryParams {
    #[serde(default)]
    entries: Vec<EventLogEntry>,
    limit: Option<usize>,
    actor_id: Option<String>,
}

/// Params: `entries` (event log entries), `limit`, `actorId`.
pub fn derive_history(input: DeriveInput<'_>) -> DerivedViewResult {
    run(ViewKind::History, input, build)
}

fn build(input: &DeriveInput<'_>) -> Result<Value, ViewError> {
    let params: HistoryParams = input.params()?;

    let matching: Vec<&EventLogEntry> = params
        .entries
        .iter()
        .rev()
        .filter(|entry| match &params.actor_id {
            Some(actor) => &entry.actor_id == actor,
            None => true,
        })
        .collect();

    let items: Vec<Value> = matching
        .iter()
        .take(params.limit.unwrap_or(usize::MAX))
        .map(|entry| {
            json!({
                "opId": entry.op_id,
                "ts": entry.ts,
                "actorId": entry.actor_id,
                "commandId": entry.command_id.as_str(),
                "postStateHash": entry.post_state_hash,
            })
        })
        .collect();

    Ok(json!({
        "lastCommandId": input.core_state.data.last_command_id,
        "totalCount": matching.len(),
        "items": items,
    }))
}
