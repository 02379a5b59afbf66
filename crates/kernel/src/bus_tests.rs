// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::config::BusConfig;
use aether_core::{Pid, ProcState};
use std::sync::atomic::{AtomicUsize, Ordering};

fn bus() -> EventBus {
    EventBus::new(&BusConfig::default())
}

fn small_bus(capacity: usize) -> EventBus {
    EventBus::new(&BusConfig {
        queue_capacity: capacity,
        ..BusConfig::default()
    })
}

fn thought(pid: i64, step: u32) -> Event {
    Event::AgentThought {
        pid: Pid(pid),
        step,
        content: format!("step {step}"),
    }
}

fn exit_event(pid: i64) -> Event {
    Event::ProcessExit {
        pid: Pid(pid),
        code: 0,
        reason: "done".to_string(),
    }
}

#[test]
fn handlers_fire_in_registration_order() {
    let bus = bus();
    let order = Arc::new(Mutex::new(Vec::new()));

    let o1 = Arc::clone(&order);
    let _h1 = bus.subscribe("agent.thought", move |_| o1.lock().push(1));
    let o2 = Arc::clone(&order);
    let _h2 = bus.subscribe("agent.*", move |_| o2.lock().push(2));

    bus.emit(thought(1, 0));
    assert_eq!(*order.lock(), vec![1, 2]);
}

#[test]
fn wildcard_and_exact_patterns_filter() {
    let bus = bus();
    let hits = Arc::new(AtomicUsize::new(0));

    let h = Arc::clone(&hits);
    let _sub = bus.subscribe("process.*", move |_| {
        h.fetch_add(1, Ordering::SeqCst);
    });

    bus.emit(thought(1, 0));
    bus.emit(exit_event(1));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn dropping_the_handle_unsubscribes() {
    let bus = bus();
    let hits = Arc::new(AtomicUsize::new(0));

    let h = Arc::clone(&hits);
    let handle = bus.subscribe("*", move |_| {
        h.fetch_add(1, Ordering::SeqCst);
    });
    bus.emit(thought(1, 0));
    handle.cancel();
    bus.emit(thought(1, 1));

    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn panicking_handler_does_not_stop_later_handlers() {
    let bus = bus();
    let hits = Arc::new(AtomicUsize::new(0));

    let _bad = bus.subscribe("agent.thought", |_| panic!("boom"));
    let h = Arc::clone(&hits);
    let _good = bus.subscribe("agent.thought", move |_| {
        h.fetch_add(1, Ordering::SeqCst);
    });

    let errors = Arc::new(Mutex::new(Vec::new()));
    let e = Arc::clone(&errors);
    let _watch = bus.subscribe("bus.handlerError", move |event| {
        if let Event::BusHandlerError { topic, error } = event {
            e.lock().push((topic.clone(), error.clone()));
        }
    });

    bus.emit(thought(1, 0));

    assert_eq!(hits.load(Ordering::SeqCst), 1);
    let errors = errors.lock();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].0, "agent.thought");
    assert!(errors[0].1.contains("boom"));
}

#[tokio::test]
async fn queue_delivers_in_emission_order() {
    let bus = bus();
    let mut sub = bus.subscribe_queue("agent.*");

    bus.emit(thought(1, 0));
    bus.emit(thought(1, 1));
    bus.emit(thought(1, 2));

    for expected in 0..3u32 {
        match sub.recv().await {
            Some(Event::AgentThought { step, .. }) => assert_eq!(step, expected),
            other => panic!("unexpected: {other:?}"),
        }
    }
}

#[tokio::test]
async fn overflow_drops_oldest_and_delivers_lag_sentinel() {
    let bus = small_bus(2);
    let mut sub = bus.subscribe_queue("agent.*");

    bus.emit(thought(1, 0));
    bus.emit(thought(1, 1));
    bus.emit(thought(1, 2)); // overflows, drops step 0

    match sub.recv().await {
        Some(Event::SubscriberLagged { dropped }) => assert_eq!(dropped, 1),
        other => panic!("expected lag sentinel, got {other:?}"),
    }
    match sub.recv().await {
        Some(Event::AgentThought { step, .. }) => assert_eq!(step, 1),
        other => panic!("unexpected: {other:?}"),
    }
    match sub.recv().await {
        Some(Event::AgentThought { step, .. }) => assert_eq!(step, 2),
        other => panic!("unexpected: {other:?}"),
    }
}

#[tokio::test]
async fn critical_events_evict_noncritical_on_overflow() {
    let bus = small_bus(1);
    let mut sub = bus.subscribe_queue("*");

    bus.emit(thought(1, 0));
    // Overflow: the buffered thought is sacrificed, the exit stays.
    bus.emit(exit_event(1));

    match sub.recv().await {
        Some(Event::SubscriberLagged { dropped }) => assert_eq!(dropped, 1),
        other => panic!("expected lag sentinel, got {other:?}"),
    }
    assert!(matches!(sub.recv().await, Some(Event::ProcessExit { .. })));
}

#[tokio::test]
async fn all_critical_overflow_closes_the_subscriber() {
    let bus = small_bus(1);
    let mut sub = bus.subscribe_queue("*");

    bus.emit(exit_event(1));
    // Nothing buffered is droppable and the incoming event must not
    // be dropped either: the subscriber is disconnected.
    bus.emit(Event::ProcessStateChange {
        pid: Pid(2),
        from: ProcState::Running,
        to: ProcState::Zombie,
    });

    assert!(sub.is_closed());
    assert_eq!(sub.recv().await, None);
}

#[test]
fn queue_drop_detaches_from_bus() {
    let bus = bus();
    let sub = bus.subscribe_queue("*");
    drop(sub);
    // No queue left to overflow; this simply must not panic.
    bus.emit(thought(1, 0));
}
