// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::StateStore;
use aether_core::test_support::agent_config;

fn sample_cron(id: &str, next_run_ms: u64) -> CronJob {
    CronJob {
        id: CronId::new(id),
        name: format!("job-{id}"),
        cron_expression: "* * * * *".to_string(),
        agent_config: agent_config("Researcher", "tick"),
        enabled: true,
        owner_uid: Uid::new("u-alice"),
        last_run_ms: None,
        next_run_ms,
        run_count: 0,
        created_at_ms: 1_000,
    }
}

fn sample_trigger(id: &str, cooldown_ms: u64) -> EventTrigger {
    EventTrigger {
        id: TriggerId::new(id),
        name: format!("trigger-{id}"),
        event_type: "agent.thought".to_string(),
        event_filter: None,
        agent_config: agent_config("Watcher", "react"),
        enabled: true,
        owner_uid: Uid::new("u-alice"),
        cooldown_ms,
        last_fired_ms: None,
        fire_count: 0,
        created_at_ms: 1_000,
    }
}

#[test]
fn cron_round_trips() {
    let store = StateStore::open_in_memory().unwrap();
    let job = sample_cron("c-1", 60_000);
    store.insert_cron_job(&job).unwrap();

    let loaded = store.get_cron_job(&CronId::new("c-1")).unwrap().unwrap();
    assert_eq!(loaded, job);
}

#[test]
fn due_jobs_are_sorted_and_filtered() {
    let store = StateStore::open_in_memory().unwrap();
    store.insert_cron_job(&sample_cron("late", 90_000)).unwrap();
    store.insert_cron_job(&sample_cron("early", 30_000)).unwrap();
    store
        .insert_cron_job(&sample_cron("future", 500_000))
        .unwrap();

    let mut disabled = sample_cron("disabled", 10_000);
    disabled.enabled = false;
    store.insert_cron_job(&disabled).unwrap();

    let due = store.due_cron_jobs(100_000).unwrap();
    let ids: Vec<&str> = due.iter().map(|j| j.id.as_str()).collect();
    assert_eq!(ids, vec!["early", "late"]);
}

#[test]
fn mark_cron_run_updates_bookkeeping() {
    let store = StateStore::open_in_memory().unwrap();
    store.insert_cron_job(&sample_cron("c-1", 60_000)).unwrap();

    store
        .mark_cron_run(&CronId::new("c-1"), 61_000, 120_000)
        .unwrap();

    let loaded = store.get_cron_job(&CronId::new("c-1")).unwrap().unwrap();
    assert_eq!(loaded.last_run_ms, Some(61_000));
    assert_eq!(loaded.next_run_ms, 120_000);
    assert_eq!(loaded.run_count, 1);
}

#[test]
fn toggle_and_delete_cron() {
    let store = StateStore::open_in_memory().unwrap();
    store.insert_cron_job(&sample_cron("c-1", 60_000)).unwrap();

    assert!(store.set_cron_enabled(&CronId::new("c-1"), false).unwrap());
    assert!(store.due_cron_jobs(100_000).unwrap().is_empty());

    assert!(store.delete_cron_job(&CronId::new("c-1")).unwrap());
    assert!(!store.delete_cron_job(&CronId::new("c-1")).unwrap());
}

#[test]
fn trigger_round_trips_with_filter() {
    let store = StateStore::open_in_memory().unwrap();
    let mut trigger = sample_trigger("t-1", 500);
    trigger.event_filter = Some(
        serde_json::from_str(r#"{"content":"deploy"}"#).unwrap(),
    );
    store.insert_trigger(&trigger).unwrap();

    let loaded = store.get_trigger(&TriggerId::new("t-1")).unwrap().unwrap();
    assert_eq!(loaded, trigger);
}

#[test]
fn triggers_lookup_by_topic() {
    let store = StateStore::open_in_memory().unwrap();
    store.insert_trigger(&sample_trigger("t-1", 0)).unwrap();
    let mut other = sample_trigger("t-2", 0);
    other.event_type = "process.exit".to_string();
    store.insert_trigger(&other).unwrap();

    let hits = store.triggers_for_event("agent.thought").unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id.as_str(), "t-1");
}

#[test]
fn failed_spawn_still_advances_cooldown_window() {
    let store = StateStore::open_in_memory().unwrap();
    store.insert_trigger(&sample_trigger("t-1", 500)).unwrap();

    store
        .mark_trigger_fired(&TriggerId::new("t-1"), 10_000, false)
        .unwrap();

    let loaded = store.get_trigger(&TriggerId::new("t-1")).unwrap().unwrap();
    assert_eq!(loaded.last_fired_ms, Some(10_000));
    // The spawn failed, so the counter did not move.
    assert_eq!(loaded.fire_count, 0);
}
