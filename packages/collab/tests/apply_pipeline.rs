//! Collab apply pipeline: per-event rejection, hash chain, determinism

use manuscript_collab::{apply_event_log, create_empty_event_log, ApplyInput, ApplyReport, RemoteEvent};
use manuscript_core::{create_initial_core_state, hash_state, reduce, CoreState};
use serde_json::{json, Value};

fn event(n: u32, command_id: &str, payload: Value) -> RemoteEvent {
    RemoteEvent {
        event_id: format!("evt-{}", n),
        actor_id: "remote-1".to_string(),
        ts: format!("2024-04-01T09:00:{:02}Z", n),
        op_id: format!("op-{}", n),
        command_id: command_id.to_string(),
        payload,
        prev_hash: None,
    }
}

fn run(state: &CoreState, events: &[RemoteEvent]) -> ApplyReport {
    let initial = hash_state(state);
    apply_event_log(
        ApplyInput {
            core_state: state,
            events,
            initial_state_hash: &initial,
            event_log: None,
        },
        reduce,
        hash_state,
    )
}

fn mixed_batch() -> Vec<RemoteEvent> {
    let mut invalid = event(2, "project.createScene", json!({ "projectId": "p-1", "sceneId": "x" }));
    invalid.event_id.clear();

    vec![
        event(1, "project.create", json!({ "projectId": "p-1", "title": "Remote" })),
        invalid,
        event(3, "project.applyTextEdit", json!({ "projectId": "p-9", "sceneId": "s", "text": "x" })),
        event(4, "project.createScene", json!({ "projectId": "p-1", "sceneId": "s-1" })),
        event(5, "project.applyTextEdit", json!({ "projectId": "p-1", "sceneId": "s-1", "text": "after rejects" })),
    ]
}

#[test]
fn test_rejections_do_not_halt_batch() {
    let report = run(&create_initial_core_state(), &mixed_batch());

    assert_eq!(report.applied_count, 3);
    let codes: Vec<&str> = report.rejected.iter().map(|r| r.code.as_str()).collect();
    assert_eq!(
        codes,
        vec!["E_COLLAB_APPLY_EVENT_INVALID", "E_COLLAB_APPLY_COMMAND_REJECTED"]
    );

    let command_rejection = &report.rejected[1];
    assert_eq!(command_rejection.op_id, "op-3");
    assert_eq!(command_rejection.event_id, "evt-3");
    assert_eq!(command_rejection.command_id, "project.applyTextEdit");
    assert_eq!(command_rejection.details["error"]["code"], "E_CORE_PROJECT_NOT_FOUND");

    assert_eq!(
        report.next_state.scene("p-1", "s-1").unwrap().text,
        "after rejects"
    );
    assert_eq!(report.state_hash, hash_state(&report.next_state));
}

#[test]
fn test_determinism_across_invocations() {
    let state = create_initial_core_state();
    let a = run(&state, &mixed_batch());
    let b = run(&state, &mixed_batch());

    assert_eq!(a.rejected, b.rejected);
    assert_eq!(a.state_hash, b.state_hash);
    assert_eq!(a, b);
}

#[test]
fn test_prev_hash_chain() {
    let state = create_initial_core_state();
    let genesis = hash_state(&state);

    let mut first = event(1, "project.create", json!({ "projectId": "p-1", "title": "Chained" }));
    first.prev_hash = Some(genesis.clone());

    let after_first = run(&state, &[first.clone()]).state_hash;

    let mut good = event(2, "project.createScene", json!({ "projectId": "p-1", "sceneId": "s-1" }));
    good.prev_hash = Some(after_first);

    // claims the genesis hash again: a forked history
    let mut forked = event(3, "project.rename", json!({ "projectId": "p-1", "title": "Fork" }));
    forked.prev_hash = Some(genesis.clone());

    let report = run(&state, &[first, good, forked]);
    assert_eq!(report.applied_count, 2);
    assert_eq!(report.rejected.len(), 1);

    let rejection = &report.rejected[0];
    assert_eq!(rejection.code, "E_COLLAB_APPLY_PREV_HASH_MISMATCH");
    assert_eq!(rejection.details["actual"], json!(genesis));
    assert_eq!(rejection.details["expected"], json!(report.state_hash));
}

#[test]
fn test_seeded_log_makes_redelivery_idempotent() {
    let state = create_initial_core_state();
    let batch = vec![event(1, "project.create", json!({ "projectId": "p-1", "title": "Once" }))];

    let first = run(&state, &batch);
    let mut log = create_empty_event_log();
    for entry in first.entries.clone() {
        log.try_push(entry).unwrap();
    }

    let initial = first.state_hash.clone();
    let second = apply_event_log(
        ApplyInput {
            core_state: &first.next_state,
            events: &batch,
            initial_state_hash: &initial,
            event_log: Some(&log),
        },
        reduce,
        hash_state,
    );

    assert_eq!(second.applied_count, 0);
    assert_eq!(second.rejected[0].code, "E_COLLAB_APPLY_OPID_DUPLICATE");
    assert_eq!(second.state_hash, first.state_hash);
}

#[test]
fn test_events_decode_from_transport_json() {
    let raw = r#"[
        {"eventId": "e1", "actorId": "a", "ts": "2024-01-01T00:00:00Z", "opId": "o1",
         "commandId": "project.create", "payload": {"projectId": "p", "title": "T"}},
        {"eventId": "e2", "actorId": "a", "opId": "o2", "commandId": "project.delete",
         "payload": {"projectId": "p"}}
    ]"#;
    let events: Vec<RemoteEvent> = serde_json::from_str(raw).unwrap();

    let report = run(&create_initial_core_state(), &events);
    assert_eq!(report.applied_count, 1);
    assert_eq!(report.rejected[0].details["missing"], json!(["ts"]));
}
