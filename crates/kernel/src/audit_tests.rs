// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::bus::EventBus;
use crate::config::BusConfig;
use aether_core::{FakeClock, Pid, Uid};
use serde_json::json;

fn fixture() -> (Arc<AuditLogger<FakeClock>>, Arc<StateStore>, FakeClock) {
    let store = Arc::new(StateStore::open_in_memory().unwrap());
    let clock = FakeClock::new();
    clock.set_epoch_ms(1_000_000);
    let logger = Arc::new(AuditLogger::new(Arc::clone(&store), clock.clone()));
    (logger, store, clock)
}

#[test]
fn fixed_topics_are_recorded_via_the_bus() {
    let (logger, store, _clock) = fixture();
    let bus = EventBus::new(&BusConfig::default());
    let _subs = logger.attach(&bus);

    bus.emit(Event::UserRegistered {
        uid: Uid::new("u-alice"),
        username: "alice".to_string(),
    });
    bus.emit(Event::ProcessExit {
        pid: Pid(3),
        code: 0,
        reason: "done".to_string(),
    });
    // Not in the fixed set.
    bus.emit(Event::AgentThought {
        pid: Pid(3),
        step: 0,
        content: "hmm".to_string(),
    });

    let entries = store.query_audit(0, u64::MAX, 10).unwrap();
    assert_eq!(entries.len(), 2);
    let types: Vec<&str> = entries.iter().map(|e| e.event_type.as_str()).collect();
    assert!(types.contains(&"user.registered"));
    assert!(types.contains(&"process.exit"));
}

#[test]
fn command_args_are_sanitized() {
    let (logger, store, _clock) = fixture();

    logger.record_command(
        Some(&Uid::new("u-alice")),
        "auth.register",
        Some("alice".to_string()),
        &json!({
            "username": "alice",
            "password": "hunter2",
            "profile": {"apiKey": "k", "bio": "hi"},
        }),
    );

    let entries = store.query_audit(0, u64::MAX, 10).unwrap();
    let args = entries[0].args_sanitized.as_ref().unwrap();
    assert_eq!(args["username"], "alice");
    assert!(args.get("password").is_none());
    assert!(args["profile"].get("apiKey").is_none());
    assert_eq!(args["profile"]["bio"], "hi");
}

#[test]
fn entries_carry_a_result_hash() {
    let (logger, store, _clock) = fixture();
    logger.record(&Event::PolicyDeleted {
        id: aether_core::PolicyId::new("pol-1"),
    });

    let entries = store.query_audit(0, u64::MAX, 10).unwrap();
    let hash = entries[0].result_hash.as_ref().unwrap();
    assert_eq!(hash.len(), 64);
}

#[test]
fn pruning_respects_the_cutoff() {
    let (logger, store, clock) = fixture();
    logger.record(&Event::UserDeleted {
        uid: Uid::new("u-old"),
    });

    clock.set_epoch_ms(5_000_000);
    logger.record(&Event::UserDeleted {
        uid: Uid::new("u-new"),
    });

    let removed = store.prune_audit_before(2_000_000).unwrap();
    assert_eq!(removed, 1);
    let entries = store.query_audit(0, u64::MAX, 10).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].target.as_deref(), Some("u-new"));
}
