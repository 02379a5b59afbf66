// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::config::BusConfig;
use crate::sched::AgentSpawner;
use aether_core::test_support::{agent_config, process_info};
use aether_core::{
    AgentConfig, ErrorCode, EventTrigger, FakeClock, KernelError, ProcessInfo, TriggerId, Uid,
};
use parking_lot::Mutex;
use std::time::Duration;

struct FakeSpawner {
    spawned: Mutex<usize>,
    fail: Mutex<bool>,
}

impl FakeSpawner {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            spawned: Mutex::new(0),
            fail: Mutex::new(false),
        })
    }

    fn count(&self) -> usize {
        *self.spawned.lock()
    }
}

impl AgentSpawner for FakeSpawner {
    fn spawn_agent(&self, owner: &Uid, _config: &AgentConfig) -> Result<ProcessInfo, KernelError> {
        if *self.fail.lock() {
            return Err(KernelError::new(ErrorCode::CapacityExceeded, "full"));
        }
        let mut spawned = self.spawned.lock();
        *spawned += 1;
        Ok(process_info(*spawned as i64, owner.as_str()))
    }
}

struct Fixture {
    driver: TriggerDriver<FakeClock>,
    store: Arc<StateStore>,
    spawner: Arc<FakeSpawner>,
    clock: FakeClock,
}

fn fixture() -> Fixture {
    let store = Arc::new(StateStore::open_in_memory().unwrap());
    let bus = EventBus::new(&BusConfig::default());
    let spawner = FakeSpawner::new();
    let clock = FakeClock::new();
    clock.set_epoch_ms(1_000_000);
    let driver = TriggerDriver::new(
        Arc::clone(&store),
        bus,
        Arc::clone(&spawner) as Arc<dyn AgentSpawner>,
        clock.clone(),
    );
    Fixture {
        driver,
        store,
        spawner,
        clock,
    }
}

fn insert_trigger(store: &StateStore, cooldown_ms: u64, filter: Option<&str>) -> TriggerId {
    let id = TriggerId::new("t-1");
    store
        .insert_trigger(&EventTrigger {
            id: id.clone(),
            name: "on-thought".to_string(),
            event_type: "agent.thought".to_string(),
            event_filter: filter.map(|f| serde_json::from_str(f).unwrap()),
            agent_config: agent_config("Watcher", "react"),
            enabled: true,
            owner_uid: Uid::new("u-alice"),
            cooldown_ms,
            last_fired_ms: None,
            fire_count: 0,
            created_at_ms: 0,
        })
        .unwrap();
    id
}

fn thought(content: &str) -> Event {
    Event::AgentThought {
        pid: aether_core::Pid(9),
        step: 0,
        content: content.to_string(),
    }
}

#[test]
fn cooldown_suppresses_rapid_refiring() {
    let f = fixture();
    let id = insert_trigger(&f.store, 500, None);

    f.driver.handle(&thought("a"));
    f.clock.advance(Duration::from_millis(100));
    f.driver.handle(&thought("b"));
    assert_eq!(f.spawner.count(), 1);

    // 700 ms after the first firing: window expired.
    f.clock.advance(Duration::from_millis(600));
    f.driver.handle(&thought("c"));
    assert_eq!(f.spawner.count(), 2);

    let trigger = f.store.get_trigger(&id).unwrap().unwrap();
    assert_eq!(trigger.fire_count, 2);
}

#[test]
fn successive_firings_are_at_least_cooldown_apart() {
    let f = fixture();
    insert_trigger(&f.store, 500, None);

    let mut fired_at = Vec::new();
    for _ in 0..20 {
        let before = f.spawner.count();
        f.driver.handle(&thought("x"));
        if f.spawner.count() > before {
            fired_at.push(f.clock.epoch_ms());
        }
        f.clock.advance(Duration::from_millis(100));
    }

    for pair in fired_at.windows(2) {
        assert!(pair[1] - pair[0] >= 500);
    }
}

#[test]
fn unrelated_topics_do_not_fire() {
    let f = fixture();
    insert_trigger(&f.store, 0, None);

    f.driver.handle(&Event::ProcessReaped {
        pid: aether_core::Pid(1),
    });
    assert_eq!(f.spawner.count(), 0);
}

#[test]
fn filters_gate_matching_events() {
    let f = fixture();
    insert_trigger(&f.store, 0, Some(r#"{"content":"deploy"}"#));

    f.driver.handle(&thought("chatter"));
    assert_eq!(f.spawner.count(), 0);

    f.driver.handle(&thought("deploy"));
    assert_eq!(f.spawner.count(), 1);
}

#[test]
fn failed_spawn_opens_a_cooldown_window() {
    let f = fixture();
    let id = insert_trigger(&f.store, 500, None);

    *f.spawner.fail.lock() = true;
    f.driver.handle(&thought("a"));
    assert_eq!(f.spawner.count(), 0);

    let trigger = f.store.get_trigger(&id).unwrap().unwrap();
    assert_eq!(trigger.fire_count, 0);
    assert_eq!(trigger.last_fired_ms, Some(f.clock.epoch_ms()));

    // Still cooling down: no tight retry loop even with capacity back.
    *f.spawner.fail.lock() = false;
    f.clock.advance(Duration::from_millis(100));
    f.driver.handle(&thought("b"));
    assert_eq!(f.spawner.count(), 0);

    f.clock.advance(Duration::from_millis(500));
    f.driver.handle(&thought("c"));
    assert_eq!(f.spawner.count(), 1);
}

#[test]
fn disabled_triggers_are_ignored() {
    let f = fixture();
    let id = insert_trigger(&f.store, 0, None);
    f.store.set_trigger_enabled(&id, false).unwrap();

    f.driver.handle(&thought("a"));
    assert_eq!(f.spawner.count(), 0);
}
