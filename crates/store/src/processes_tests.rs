// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::StateStore;
use aether_core::test_support::process_info;

#[test]
fn upsert_and_get_round_trip() {
    let store = StateStore::open_in_memory().unwrap();
    let info = process_info(1, "u-alice");
    store.upsert_process(&info).unwrap();

    let loaded = store.get_process(Pid(1)).unwrap().unwrap();
    assert_eq!(loaded.uid, info.uid);
    assert_eq!(loaded.role, "Researcher");
    assert_eq!(loaded.state, ProcState::Running);
    assert!(loaded.exit_code.is_none());
}

#[test]
fn exit_code_is_set_exactly_once() {
    let store = StateStore::open_in_memory().unwrap();
    store.upsert_process(&process_info(1, "u-alice")).unwrap();

    store.record_process_exit(Pid(1), 0, 5_000).unwrap();
    // A duplicate exit (e.g. replayed event) must not win.
    store.record_process_exit(Pid(1), 137, 9_000).unwrap();

    let loaded = store.get_process(Pid(1)).unwrap().unwrap();
    assert_eq!(loaded.exit_code, Some(0));
    assert_eq!(loaded.exited_at_ms, Some(5_000));
    assert_eq!(loaded.state, ProcState::Zombie);
}

#[test]
fn history_survives_reap() {
    let store = StateStore::open_in_memory().unwrap();
    store.upsert_process(&process_info(1, "u-alice")).unwrap();
    store.record_process_exit(Pid(1), 0, 5_000).unwrap();
    store.set_process_state(Pid(1), ProcState::Dead).unwrap();

    let history = store.list_process_history(None, 10).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].exit_code, Some(0));
    assert_eq!(history[0].state, ProcState::Dead);
}

#[test]
fn history_scopes_by_owner() {
    let store = StateStore::open_in_memory().unwrap();
    store.upsert_process(&process_info(1, "u-alice")).unwrap();
    store.upsert_process(&process_info(2, "u-bob")).unwrap();
    store.upsert_process(&process_info(3, "u-alice")).unwrap();

    let alice = store
        .list_process_history(Some(&Uid::new("u-alice")), 10)
        .unwrap();
    assert_eq!(alice.len(), 2);
    // Newest first.
    assert_eq!(alice[0].pid, Pid(3));
    assert_eq!(alice[1].pid, Pid(1));
}
