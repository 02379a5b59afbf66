// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::config::BusConfig;
use aether_core::{FakeClock, Pid, WebhookId};
use std::collections::BTreeSet;

fn fixture() -> (WebhookDispatcher<FakeClock>, Arc<StateStore>, EventBus) {
    let store = Arc::new(StateStore::open_in_memory().unwrap());
    let bus = EventBus::new(&BusConfig::default());
    let clock = FakeClock::new();
    clock.set_epoch_ms(1_000_000);
    let dispatcher = WebhookDispatcher::new(
        Arc::clone(&store),
        bus.clone(),
        clock,
        WebhookConfig {
            backoff_base: Duration::from_millis(1),
        },
    );
    (dispatcher, store, bus)
}

/// A webhook pointing at a port nothing listens on.
fn unreachable_hook(retry_count: u32) -> Webhook {
    Webhook {
        id: WebhookId::new("w-1"),
        url: "http://127.0.0.1:9/hook".to_string(),
        secret: Some("shh".to_string()),
        events: ["process.exit".to_string()].into_iter().collect::<BTreeSet<_>>(),
        filter: None,
        headers: Default::default(),
        enabled: true,
        owner_uid: aether_core::Uid::new("u-alice"),
        retry_count,
        timeout_ms: 100,
        failure_count: 0,
        created_at_ms: 0,
    }
}

fn exit_event() -> Event {
    Event::ProcessExit {
        pid: Pid(7),
        code: 0,
        reason: "done".to_string(),
    }
}

#[tokio::test]
async fn exhausted_retries_dead_letter_the_delivery() {
    let (dispatcher, store, bus) = fixture();
    store.insert_webhook(&unreachable_hook(2)).unwrap();
    let mut events = bus.subscribe_queue("webhook.*");

    dispatcher.handle(&exit_event()).await;

    // Two failed attempts logged.
    let logs = store.webhook_logs(&WebhookId::new("w-1"), 10).unwrap();
    assert_eq!(logs.len(), 2);
    assert!(logs.iter().all(|l| !l.success));
    assert_eq!(
        logs.iter().map(|l| l.attempt).collect::<BTreeSet<_>>(),
        [1, 2].into_iter().collect()
    );

    // One dead letter, failure counter bumped.
    let dlq = store.list_dlq(10).unwrap();
    assert_eq!(dlq.len(), 1);
    assert_eq!(dlq[0].attempts, 2);
    assert_eq!(dlq[0].event_type, "process.exit");

    let hook = store.get_webhook(&WebhookId::new("w-1")).unwrap().unwrap();
    assert_eq!(hook.failure_count, 1);

    // failed, failed, dlq on the bus.
    let seen: Vec<&'static str> = events.drain().iter().map(|e| e.topic()).collect();
    assert_eq!(seen, vec!["webhook.failed", "webhook.failed", "webhook.dlq"]);
}

#[tokio::test]
async fn unsubscribed_topics_are_ignored() {
    let (dispatcher, store, _bus) = fixture();
    store.insert_webhook(&unreachable_hook(1)).unwrap();

    dispatcher
        .handle(&Event::AgentThought {
            pid: Pid(1),
            step: 0,
            content: "x".to_string(),
        })
        .await;

    assert!(store.webhook_logs(&WebhookId::new("w-1"), 10).unwrap().is_empty());
}

#[tokio::test]
async fn delivery_bookkeeping_events_are_never_delivered() {
    let (dispatcher, store, _bus) = fixture();
    let mut hook = unreachable_hook(1);
    hook.events = ["webhook.failed".to_string()].into_iter().collect();
    store.insert_webhook(&hook).unwrap();

    dispatcher
        .handle(&Event::WebhookFailed {
            id: WebhookId::new("w-other"),
            event_type: "process.exit".to_string(),
            error: "x".to_string(),
            attempt: 1,
        })
        .await;

    assert!(store.webhook_logs(&WebhookId::new("w-1"), 10).unwrap().is_empty());
}

#[tokio::test]
async fn dlq_retry_against_dead_endpoint_keeps_the_entry() {
    let (dispatcher, store, _bus) = fixture();
    store.insert_webhook(&unreachable_hook(1)).unwrap();
    dispatcher.handle(&exit_event()).await;

    let entry_id = store.list_dlq(10).unwrap()[0].id;
    let delivered = dispatcher.retry_dlq(entry_id).await.unwrap();
    assert!(!delivered);
    assert_eq!(store.list_dlq(10).unwrap().len(), 1);
}

#[test]
fn signatures_are_hex_hmac_sha256() {
    let signature = sign("secret", r#"{"event":"process.exit"}"#);
    assert_eq!(signature.len(), 64);
    assert!(signature.chars().all(|c| c.is_ascii_hexdigit()));
    // Deterministic for fixed inputs.
    assert_eq!(signature, sign("secret", r#"{"event":"process.exit"}"#));
    assert_ne!(signature, sign("other", r#"{"event":"process.exit"}"#));
}
