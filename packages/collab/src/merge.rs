//! # Merge Policy
//!
//! Single-event optimistic concurrency over a versioned document.
//!
//! A remote edit names the version it was made against (`baseVersion`) and
//! the version it produces (`nextVersion`). It applies only on top of exactly
//! that base; anything else is a conflict, reported as an envelope for the
//! resolution UI. Conflicts are the expected outcome of concurrent editing,
//! not failures.

use manuscript_common::{digest_value, ErrorEnvelope};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::codes::*;

/// Local side of the merge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionedDocument {
    pub version: u64,
    #[serde(default)]
    pub content: Value,
    #[serde(default)]
    pub last_op_id: Option<String>,
}

/// Incoming edit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteEdit {
    pub op_id: String,
    pub author_id: String,
    pub ts: String,
    pub command_id: String,
    pub base_version: u64,
    pub next_version: u64,
    #[serde(default)]
    pub content: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Applied,
    Conflict,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeOutcome {
    pub verdict: Verdict,
    pub state: VersionedDocument,
    pub envelope: Option<ErrorEnvelope>,
}

impl VersionedDocument {
    pub fn new(version: u64, content: Value) -> Self {
        Self {
            version,
            content,
            last_op_id: None,
        }
    }

    pub fn to_value(&self) -> Value {
        json!({
            "version": self.version,
            "content": self.content,
            "lastOpId": self.last_op_id,
        })
    }
}

/// Digest of a versioned document
pub fn hash_document(document: &VersionedDocument) -> String {
    digest_value(&document.to_value())
}

/// Decide whether `remote` applies cleanly on top of `local`.
pub fn merge_remote_event(local: &VersionedDocument, remote: &RemoteEdit) -> MergeOutcome {
    let conflict = if remote.base_version != local.version {
        Some((E_BASE_VERSION_MISMATCH, "BASE_VERSION_MISMATCH"))
    } else if remote.next_version <= remote.base_version {
        Some((E_NEXT_VERSION_INVALID, "NEXT_VERSION_NOT_GREATER"))
    } else {
        None
    };

    match conflict {
        None => MergeOutcome {
            verdict: Verdict::Applied,
            state: VersionedDocument {
                version: remote.next_version,
                content: remote.content.clone(),
                last_op_id: Some(remote.op_id.clone()),
            },
            envelope: None,
        },
        Some((code, reason)) => {
            tracing::debug!(
                op_id = %remote.op_id,
                base_version = remote.base_version,
                local_version = local.version,
                "remote edit conflicts"
            );
            MergeOutcome {
                verdict: Verdict::Conflict,
                state: local.clone(),
                envelope: Some(conflict_envelope(code, reason, local, remote)),
            }
        }
    }
}

fn conflict_envelope(
    code: &str,
    reason: &str,
    local: &VersionedDocument,
    remote: &RemoteEdit,
) -> ErrorEnvelope {
    ErrorEnvelope::new(code, OP_MERGE, reason)
        .with_detail("opId", remote.op_id.clone())
        .with_detail("authorId", remote.author_id.clone())
        .with_detail("ts", remote.ts.clone())
        .with_detail("commandId", remote.command_id.clone())
        .with_detail("baseVersion", remote.base_version)
        .with_detail("nextVersion", remote.next_version)
        .with_detail("localVersion", local.version)
}

/// Result of folding a fixture through the merge policy
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollabReplay {
    pub final_state: VersionedDocument,
    pub state_hash: String,
    pub envelopes: Vec<ErrorEnvelope>,
    pub applied_count: usize,
}

/// Fold `events` through [`merge_remote_event`] starting at `initial`
pub fn run_collab_replay(initial: &VersionedDocument, events: &[RemoteEdit]) -> CollabReplay {
    let mut state = initial.clone();
    let mut envelopes = Vec::new();
    let mut applied_count = 0;

    for event in events {
        let outcome = merge_remote_event(&state, event);
        match outcome.verdict {
            Verdict::Applied => applied_count += 1,
            Verdict::Conflict => envelopes.extend(outcome.envelope),
        }
        state = outcome.state;
    }

    CollabReplay {
        state_hash: hash_document(&state),
        final_state: state,
        envelopes,
        applied_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edit(op_id: &str, base: u64, next: u64, content: &str) -> RemoteEdit {
        RemoteEdit {
            op_id: op_id.to_string(),
            author_id: "carol".to_string(),
            ts: "2024-05-01T12:00:00Z".to_string(),
            command_id: "project.applyTextEdit".to_string(),
            base_version: base,
            next_version: next,
            content: json!({ "text": content }),
        }
    }

    #[test]
    fn test_matching_base_applies() {
        let local = VersionedDocument::new(3, json!({ "text": "old" }));
        let outcome = merge_remote_event(&local, &edit("op-1", 3, 4, "new"));

        assert_eq!(outcome.verdict, Verdict::Applied);
        assert_eq!(outcome.state.version, 4);
        assert_eq!(outcome.state.content["text"], "new");
        assert_eq!(outcome.state.last_op_id.as_deref(), Some("op-1"));
        assert!(outcome.envelope.is_none());
    }

    #[test]
    fn test_stale_base_conflicts() {
        let local = VersionedDocument::new(5, json!({ "text": "mine" }));
        let outcome = merge_remote_event(&local, &edit("op-2", 4, 5, "theirs"));

        assert_eq!(outcome.verdict, Verdict::Conflict);
        assert_eq!(outcome.state, local);

        let envelope = outcome.envelope.unwrap();
        assert_eq!(envelope.code, "E_COLLAB_BASE_VERSION_MISMATCH");
        assert_eq!(envelope.detail_str("opId"), Some("op-2"));
        assert_eq!(envelope.detail_str("authorId"), Some("carol"));
        assert_eq!(envelope.detail_str("ts"), Some("2024-05-01T12:00:00Z"));
        assert_eq!(envelope.detail_str("commandId"), Some("project.applyTextEdit"));
        assert_eq!(envelope.details["localVersion"], json!(5));
    }

    #[test]
    fn test_non_advancing_version_conflicts() {
        let local = VersionedDocument::new(2, json!(null));
        let outcome = merge_remote_event(&local, &edit("op-3", 2, 2, "same"));

        assert_eq!(outcome.verdict, Verdict::Conflict);
        assert_eq!(outcome.envelope.unwrap().code, "E_COLLAB_NEXT_VERSION_INVALID");
    }

    #[test]
    fn test_verdict_serializes_lowercase() {
        assert_eq!(serde_json::to_value(Verdict::Applied).unwrap(), "applied");
        assert_eq!(serde_json::to_value(Verdict::Conflict).unwrap(), "conflict");
    }
}
