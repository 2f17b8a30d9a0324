//! State hasher: canonical, order-independent content hash of a snapshot.

use manuscript_common::digest_value;

use crate::state::CoreState;

/// 64-hex SHA-256 of the canonical JSON encoding of `state`
pub fn hash_state(state: &CoreState) -> String {
    digest_value(&state.to_value())
}
