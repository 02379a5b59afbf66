// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::StateStore;
use aether_core::test_support::agent_config;
use std::collections::BTreeSet;

fn sample_webhook(id: &str, topics: &[&str]) -> Webhook {
    Webhook {
        id: WebhookId::new(id),
        url: "http://127.0.0.1:9/hook".to_string(),
        secret: Some("shh".to_string()),
        events: topics.iter().map(|t| t.to_string()).collect::<BTreeSet<_>>(),
        filter: None,
        headers: Default::default(),
        enabled: true,
        owner_uid: Uid::new("u-alice"),
        retry_count: 2,
        timeout_ms: 100,
        failure_count: 0,
        created_at_ms: 1_000,
    }
}

#[test]
fn webhook_round_trips() {
    let store = StateStore::open_in_memory().unwrap();
    let hook = sample_webhook("w-1", &["process.exit", "agent.thought"]);
    store.insert_webhook(&hook).unwrap();

    let loaded = store.get_webhook(&WebhookId::new("w-1")).unwrap().unwrap();
    assert_eq!(loaded, hook);
}

#[test]
fn event_lookup_respects_subscription_and_enabled() {
    let store = StateStore::open_in_memory().unwrap();
    store
        .insert_webhook(&sample_webhook("w-1", &["process.exit"]))
        .unwrap();
    let mut disabled = sample_webhook("w-2", &["process.exit"]);
    disabled.enabled = false;
    store.insert_webhook(&disabled).unwrap();
    store
        .insert_webhook(&sample_webhook("w-3", &["agent.thought"]))
        .unwrap();

    let hits = store.webhooks_for_event("process.exit").unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id.as_str(), "w-1");
}

#[test]
fn delivery_log_and_failure_counter() {
    let store = StateStore::open_in_memory().unwrap();
    store
        .insert_webhook(&sample_webhook("w-1", &["process.exit"]))
        .unwrap();

    for attempt in 1..=2 {
        store
            .append_webhook_log(&WebhookLogEntry {
                id: 0,
                webhook_id: WebhookId::new("w-1"),
                event_type: "process.exit".to_string(),
                success: false,
                status: None,
                error: Some("connection refused".to_string()),
                attempt,
                created_at_ms: 1_000 + attempt as u64,
            })
            .unwrap();
    }
    store
        .increment_webhook_failures(&WebhookId::new("w-1"))
        .unwrap();

    let logs = store.webhook_logs(&WebhookId::new("w-1"), 10).unwrap();
    assert_eq!(logs.len(), 2);
    assert!(logs.iter().all(|l| !l.success));

    let hook = store.get_webhook(&WebhookId::new("w-1")).unwrap().unwrap();
    assert_eq!(hook.failure_count, 1);
}

#[test]
fn dlq_insert_list_delete() {
    let store = StateStore::open_in_memory().unwrap();
    let id = store
        .insert_dlq_entry(&DlqEntry {
            id: 0,
            webhook_id: WebhookId::new("w-1"),
            event_type: "process.exit".to_string(),
            payload: serde_json::json!({"pid": 1}),
            error: "timed out".to_string(),
            attempts: 3,
            created_at_ms: 1_000,
        })
        .unwrap();

    let entries = store.list_dlq(10).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].payload, serde_json::json!({"pid": 1}));

    assert!(store.delete_dlq_entry(id).unwrap());
    assert!(store.list_dlq(10).unwrap().is_empty());
}

#[test]
fn inbound_hooks_enforce_unique_tokens() {
    let store = StateStore::open_in_memory().unwrap();
    let hook = InboundWebhook {
        token: "tok-1".to_string(),
        name: "ci".to_string(),
        agent_config: agent_config("Builder", "handle webhook"),
        transform: Some("payload.message".to_string()),
        owner_uid: Uid::new("u-alice"),
        last_triggered_ms: None,
        trigger_count: 0,
        created_at_ms: 1_000,
    };
    store.insert_inbound_webhook(&hook).unwrap();

    let duplicate = store.insert_inbound_webhook(&hook);
    assert!(matches!(duplicate, Err(crate::StoreError::Conflict(_))));

    store.mark_inbound_triggered("tok-1", 9_000).unwrap();
    let loaded = store.get_inbound_webhook("tok-1").unwrap().unwrap();
    assert_eq!(loaded.trigger_count, 1);
    assert_eq!(loaded.last_triggered_ms, Some(9_000));
}
