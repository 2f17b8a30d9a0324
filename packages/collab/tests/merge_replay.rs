//! Replay harness over a fixed fixture: identical results on every run

use manuscript_collab::{hash_document, run_collab_replay, RemoteEdit, VersionedDocument};
use serde::Deserialize;

#[derive(Deserialize)]
struct Fixture {
    initial: VersionedDocument,
    events: Vec<RemoteEdit>,
}

fn load_fixture() -> Fixture {
    let raw = include_str!("fixtures/merge_replay.json");
    serde_json::from_str(raw).expect("fixture should parse")
}

#[test]
fn test_replay_outcome() {
    let fixture = load_fixture();
    let replay = run_collab_replay(&fixture.initial, &fixture.events);

    assert_eq!(replay.applied_count, 2);
    assert_eq!(replay.final_state.version, 3);
    assert_eq!(replay.final_state.content["text"], "alice v3");
    assert_eq!(replay.final_state.last_op_id.as_deref(), Some("op-c"));
    assert_eq!(replay.state_hash, hash_document(&replay.final_state));

    let codes: Vec<&str> = replay.envelopes.iter().map(|e| e.code.as_str()).collect();
    assert_eq!(
        codes,
        vec!["E_COLLAB_BASE_VERSION_MISMATCH", "E_COLLAB_NEXT_VERSION_INVALID"]
    );
    assert_eq!(replay.envelopes[0].detail_str("authorId"), Some("bob"));
}

#[test]
fn test_replay_is_repeatable() {
    let fixture = load_fixture();
    let runs: Vec<_> = (0..5)
        .map(|_| run_collab_replay(&fixture.initial, &fixture.events))
        .collect();

    for run in &runs[1..] {
        assert_eq!(run.final_state, runs[0].final_state);
        assert_eq!(run.state_hash, runs[0].state_hash);
        assert_eq!(run.envelopes, runs[0].envelopes);
    }

    let first = serde_json::to_string(&runs[0]).unwrap();
    let last = serde_json::to_string(&runs[4]).unwrap();
    assert_eq!(first, last);
}
