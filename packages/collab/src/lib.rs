//! # Manuscript Collab
//!
//! Collaborative event application on top of the core reducer.
//!
//! ## Architecture
//!
//! ```text
//!  local edits                       remote transport (ordered)
//!      │                                      │
//!      ▼                                      ▼
//! apply_command_with_event_log        apply_event_log (pipeline)
//!      │  reduce + append                     │  validate → prevHash → reduce
//!      ▼                                      ▼
//! ┌─────────────────────────────────────────────┐
//! │ EventLog: append-only, opId-unique,         │
//! │ pre/post state hashes chained               │
//! └─────────────────────────────────────────────┘
//!      │
//!      ▼
//! replay_event_log / replay_event_log_from_state
//! ```
//!
//! The merge policy in [`merge`] is a separate, single-event optimistic
//! concurrency resolver over versioned documents.
//!
//! Everything here is pure: no clocks, no I/O, no randomness. Timestamps and
//! actor ids arrive already resolved from the caller.

pub mod codes;
pub mod event_log;
pub mod merge;
pub mod pipeline;

pub use event_log::{
    append_event_log_entry, apply_command_with_event_log, create_empty_event_log, hash_event_log,
    parse_event_log, replay_event_log, replay_event_log_from_state, serialize_event_log,
    EventLog, EventLogEntry, LoggedApply, LoggedCommand, ReplayOutcome, StateReplay,
    EVENT_LOG_SCHEMA_VERSION,
};
pub use merge::{
    hash_document, merge_remote_event, run_collab_replay, CollabReplay, MergeOutcome, RemoteEdit,
    Verdict, VersionedDocument,
};
pub use pipeline::{apply_event_log, ApplyInput, ApplyReport, Rejection, RemoteEvent};
