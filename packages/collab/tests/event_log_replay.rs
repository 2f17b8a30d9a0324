//! Event log laws: idempotent append and replay equivalence

use manuscript_collab::{
    append_event_log_entry, apply_command_with_event_log, create_empty_event_log, hash_event_log,
    parse_event_log, replay_event_log, replay_event_log_from_state, serialize_event_log, EventLog,
    LoggedCommand,
};
use manuscript_core::{
    apply_core_sequence, create_initial_core_state, hash_state, Command, CoreState,
};

fn commands() -> Vec<Command> {
    vec![
        Command::create_project("p-1", "Shared draft"),
        Command::create_scene("p-1", "s-1"),
        Command::apply_text_edit("p-1", "s-1", "# Act One\nHello deterministic core"),
        Command::create_scene("p-1", "s-2"),
        Command::apply_text_edit("p-1", "s-2", "See [[s-1]]."),
    ]
}

fn build_log() -> (CoreState, String, EventLog) {
    let mut state = create_initial_core_state();
    let mut hash = hash_state(&state);
    let mut log = create_empty_event_log();

    for (i, command) in commands().into_iter().enumerate() {
        let applied = apply_command_with_event_log(
            &state,
            &log,
            LoggedCommand {
                op_id: format!("op-{}", i),
                actor_id: "alice".to_string(),
                ts: format!("2024-03-01T10:00:0{}Z", i),
                command,
            },
        )
        .expect("command should apply");

        state = applied.state;
        hash = applied.state_hash;
        log = applied.event_log;
    }

    (state, hash, log)
}

#[test]
fn test_idempotent_append() {
    let (_, _, log) = build_log();
    let before = log.events().to_vec();

    for entry in log.events() {
        let err = append_event_log_entry(&log, entry.clone()).unwrap_err();
        assert_eq!(err.code, "E_COLLAB_EVENTLOG_OPID_DUPLICATE");
        assert_eq!(err.detail_str("opId"), Some(entry.op_id.as_str()));
    }

    assert_eq!(log.events(), before.as_slice());
}

#[test]
fn test_duplicate_logged_command_refused_before_reducing() {
    let (state, _, log) = build_log();
    let err = apply_command_with_event_log(
        &state,
        &log,
        LoggedCommand {
            op_id: "op-0".to_string(),
            actor_id: "alice".to_string(),
            ts: "2024-03-01T11:00:00Z".to_string(),
            command: Command::create_project("p-2", "Other"),
        },
    )
    .unwrap_err();

    assert_eq!(err.code, "E_COLLAB_EVENTLOG_OPID_DUPLICATE");
}

#[test]
fn test_replay_equivalence() {
    let (_, incremental_hash, log) = build_log();
    let initial_hash = hash_state(&create_initial_core_state());

    let first = replay_event_log(&log, &initial_hash);
    let second = replay_event_log(&log, &initial_hash);
    assert!(first.ok);
    assert_eq!(first, second);
    assert_eq!(first.final_state_hash, incremental_hash);

    let direct = apply_core_sequence(&create_initial_core_state(), &commands());
    assert_eq!(first.final_state_hash, direct.state_hash());
}

#[test]
fn test_full_state_replay_rebuilds_state() {
    let (state, hash, log) = build_log();

    let replay = replay_event_log_from_state(&log, &create_initial_core_state()).unwrap();
    assert_eq!(replay.state, state);
    assert_eq!(replay.state_hash, hash);
    assert_eq!(replay.replayed_count, log.len());
}

#[test]
fn test_full_state_replay_detects_tampering() {
    let (_, _, log) = build_log();

    let mut value = log.to_value();
    value["events"][2]["payload"]["text"] = serde_json::json!("tampered");
    let tampered = parse_event_log(&value.to_string()).unwrap();

    let err = replay_event_log_from_state(&tampered, &create_initial_core_state()).unwrap_err();
    assert_eq!(err.code, "E_COLLAB_EVENTLOG_PAYLOAD_MISMATCH");
    assert_eq!(err.detail_str("opId"), Some("op-2"));
}

#[test]
fn test_replay_from_wrong_start_fails() {
    let (_, _, log) = build_log();
    let outcome = replay_event_log(&log, &"0".repeat(64));

    assert!(!outcome.ok);
    assert_eq!(outcome.replayed_count, 0);
    assert_eq!(
        outcome.error.unwrap().code,
        "E_COLLAB_EVENTLOG_CHAIN_BROKEN"
    );
}

#[test]
fn test_serialization_is_deterministic() {
    let (_, _, a) = build_log();
    let (_, _, b) = build_log();

    assert_eq!(serialize_event_log(&a), serialize_event_log(&b));
    assert_eq!(hash_event_log(&a), hash_event_log(&b));

    let parsed = parse_event_log(&serialize_event_log(&a)).unwrap();
    assert_eq!(hash_event_log(&parsed), hash_event_log(&a));
}
