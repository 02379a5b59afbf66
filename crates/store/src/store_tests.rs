// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn opens_fresh_database_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kernel.db");
    let store = StateStore::open(&path).unwrap();
    assert!(!store.persistence_disabled());
    assert!(path.exists());
}

#[test]
fn reopens_existing_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kernel.db");
    {
        let store = StateStore::open(&path).unwrap();
        store
            .kv_set("marker", &serde_json::json!("here"), 1)
            .unwrap();
    }
    let store = StateStore::open(&path).unwrap();
    let entry = store.kv_get("marker").unwrap().unwrap();
    assert_eq!(entry.value, serde_json::json!("here"));
}

#[test]
fn corrupt_database_is_recreated() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kernel.db");
    std::fs::write(&path, b"this is not a sqlite file, not even close").unwrap();

    let store = StateStore::open(&path).unwrap();
    assert!(!store.persistence_disabled());
    store
        .kv_set("after-recovery", &serde_json::json!(1), 1)
        .unwrap();
}

#[test]
fn kv_round_trip_and_delete() {
    let store = StateStore::open_in_memory().unwrap();
    store
        .kv_set("config", &serde_json::json!({"a": 1}), 100)
        .unwrap();
    store
        .kv_set("config", &serde_json::json!({"a": 2}), 200)
        .unwrap();

    let entry = store.kv_get("config").unwrap().unwrap();
    assert_eq!(entry.value, serde_json::json!({"a": 2}));
    assert_eq!(entry.updated_at_ms, 200);

    assert!(store.kv_delete("config").unwrap());
    assert!(store.kv_get("config").unwrap().is_none());
}
