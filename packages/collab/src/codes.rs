//! Stable error codes and operation names emitted by this crate

pub const OP_EVENTLOG_APPEND: &str = "collab.eventlog.append";
pub const OP_EVENTLOG_PARSE: &str = "collab.eventlog.parse";
pub const OP_EVENTLOG_REPLAY: &str = "collab.eventlog.replay";
pub const OP_MERGE: &str = "collab.merge";

pub const E_EVENTLOG_OPID_DUPLICATE: &str = "E_COLLAB_EVENTLOG_OPID_DUPLICATE";
pub const E_EVENTLOG_ENTRY_INVALID: &str = "E_COLLAB_EVENTLOG_ENTRY_INVALID";
pub const E_EVENTLOG_DECODE_FAILED: &str = "E_COLLAB_EVENTLOG_DECODE_FAILED";
pub const E_EVENTLOG_SCHEMA_UNSUPPORTED: &str = "E_COLLAB_EVENTLOG_SCHEMA_UNSUPPORTED";
pub const E_EVENTLOG_CHAIN_BROKEN: &str = "E_COLLAB_EVENTLOG_CHAIN_BROKEN";
pub const E_EVENTLOG_PAYLOAD_MISSING: &str = "E_COLLAB_EVENTLOG_PAYLOAD_MISSING";
pub const E_EVENTLOG_PAYLOAD_MISMATCH: &str = "E_COLLAB_EVENTLOG_PAYLOAD_MISMATCH";
pub const E_EVENTLOG_REPLAY_REJECTED: &str = "E_COLLAB_EVENTLOG_REPLAY_REJECTED";
pub const E_EVENTLOG_REPLAY_DIVERGED: &str = "E_COLLAB_EVENTLOG_REPLAY_DIVERGED";

pub const E_APPLY_EVENT_INVALID: &str = "E_COLLAB_APPLY_EVENT_INVALID";
pub const E_APPLY_OPID_DUPLICATE: &str = "E_COLLAB_APPLY_OPID_DUPLICATE";
pub const E_APPLY_PREV_HASH_MISMATCH: &str = "E_COLLAB_APPLY_PREV_HASH_MISMATCH";
pub const E_APPLY_COMMAND_REJECTED: &str = "E_COLLAB_APPLY_COMMAND_REJECTED";

pub const E_BASE_VERSION_MISMATCH: &str = "E_COLLAB_BASE_VERSION_MISMATCH";
pub const E_NEXT_VERSION_INVALID: &str = "E_COLLAB_NEXT_VERSION_INVALID";
