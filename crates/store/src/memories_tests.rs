// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::StateStore;
use aether_core::test_support::memory_record;

#[test]
fn put_and_access_round_trip() {
    let store = StateStore::open_in_memory().unwrap();
    let mut memory = memory_record("m-1", "u-alice", MemoryLayer::Semantic, 0.8);
    memory.content = "rust borrow checker rules".to_string();
    store.put_memory(&memory, 100).unwrap();

    let loaded = store
        .access_memory(&MemoryId::new("m-1"), 2_000_000)
        .unwrap()
        .unwrap();
    assert_eq!(loaded.content, memory.content);
    assert_eq!(loaded.access_count, 1);
    assert_eq!(loaded.last_accessed_ms, 2_000_000);
}

#[test]
fn search_finds_by_content() {
    let store = StateStore::open_in_memory().unwrap();
    for (id, content) in [
        ("m-1", "the deploy pipeline failed on tuesday"),
        ("m-2", "user prefers dark mode themes"),
        ("m-3", "deploy keys rotate monthly"),
    ] {
        let mut memory = memory_record(id, "u-alice", MemoryLayer::Episodic, 0.5);
        memory.content = content.to_string();
        store.put_memory(&memory, 100).unwrap();
    }

    let hits = store
        .search_memories(&Uid::new("u-alice"), "deploy", 10)
        .unwrap();
    let ids: Vec<&str> = hits.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(hits.len(), 2);
    assert!(ids.contains(&"m-1"));
    assert!(ids.contains(&"m-3"));
}

#[test]
fn search_is_scoped_to_agent() {
    let store = StateStore::open_in_memory().unwrap();
    let mut alice = memory_record("m-a", "u-alice", MemoryLayer::Semantic, 0.5);
    alice.content = "shared secret topic".to_string();
    let mut bob = memory_record("m-b", "u-bob", MemoryLayer::Semantic, 0.5);
    bob.content = "shared secret topic".to_string();
    store.put_memory(&alice, 100).unwrap();
    store.put_memory(&bob, 100).unwrap();

    let hits = store
        .search_memories(&Uid::new("u-alice"), "shared topic", 10)
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id.as_str(), "m-a");
}

#[test]
fn punctuation_and_single_chars_are_stripped_from_queries() {
    let store = StateStore::open_in_memory().unwrap();
    let mut memory = memory_record("m-1", "u-alice", MemoryLayer::Semantic, 0.5);
    memory.content = "database connection pool".to_string();
    store.put_memory(&memory, 100).unwrap();

    let hits = store
        .search_memories(&Uid::new("u-alice"), "connection!!! a ?", 10)
        .unwrap();
    assert_eq!(hits.len(), 1);

    // A query that reduces to nothing returns nothing.
    let empty = store.search_memories(&Uid::new("u-alice"), "? !", 10).unwrap();
    assert!(empty.is_empty());
}

#[test]
fn eviction_keeps_count_at_cap() {
    let store = StateStore::open_in_memory().unwrap();
    let uid = Uid::new("u-alice");

    for i in 0..5 {
        let memory = memory_record(
            &format!("m-{i}"),
            "u-alice",
            MemoryLayer::Episodic,
            0.1 * i as f64,
        );
        let evicted = store.put_memory(&memory, 3).unwrap();
        if i < 3 {
            assert_eq!(evicted, 0);
        } else {
            assert_eq!(evicted, 1);
        }
        assert!(store.count_memories(&uid, MemoryLayer::Episodic).unwrap() <= 3);
    }

    // Lowest-importance rows were evicted first: m-0 and m-1 are gone.
    assert!(store
        .access_memory(&MemoryId::new("m-0"), 0)
        .unwrap()
        .is_none());
    assert!(store
        .access_memory(&MemoryId::new("m-4"), 0)
        .unwrap()
        .is_some());
}

#[test]
fn eviction_is_per_layer() {
    let store = StateStore::open_in_memory().unwrap();
    let uid = Uid::new("u-alice");

    for i in 0..3 {
        store
            .put_memory(
                &memory_record(&format!("e-{i}"), "u-alice", MemoryLayer::Episodic, 0.5),
                3,
            )
            .unwrap();
        store
            .put_memory(
                &memory_record(&format!("s-{i}"), "u-alice", MemoryLayer::Semantic, 0.5),
                3,
            )
            .unwrap();
    }

    assert_eq!(store.count_memories(&uid, MemoryLayer::Episodic).unwrap(), 3);
    assert_eq!(store.count_memories(&uid, MemoryLayer::Semantic).unwrap(), 3);
}

#[test]
fn delete_removes_from_search() {
    let store = StateStore::open_in_memory().unwrap();
    let mut memory = memory_record("m-1", "u-alice", MemoryLayer::Semantic, 0.5);
    memory.content = "ephemeral note".to_string();
    store.put_memory(&memory, 100).unwrap();

    assert!(store.delete_memory(&MemoryId::new("m-1")).unwrap());
    let hits = store
        .search_memories(&Uid::new("u-alice"), "ephemeral", 10)
        .unwrap();
    assert!(hits.is_empty());
}

#[test]
fn expired_memories_are_dropped() {
    let store = StateStore::open_in_memory().unwrap();
    let mut memory = memory_record("m-1", "u-alice", MemoryLayer::Social, 0.9);
    memory.expires_at_ms = Some(1_000);
    store.put_memory(&memory, 100).unwrap();

    assert_eq!(store.expire_memories(2_000).unwrap(), 1);
    assert!(store
        .access_memory(&MemoryId::new("m-1"), 0)
        .unwrap()
        .is_none());
}
