// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event bus for kernel communication.
//!
//! In-process handlers run synchronously on the emitting task; remote
//! subscribers (gateway connections, the schedulers, the webhook
//! dispatcher) read from bounded per-subscriber queues. Queue overflow
//! drops the oldest non-critical event and surfaces a
//! `subscriber.lagged` sentinel; critical events are never dropped,
//! the lagging subscriber is closed instead.

use aether_core::{Event, TopicPattern};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tracing::warn;

type Handler = Arc<dyn Fn(&Event) + Send + Sync>;

struct HandlerEntry {
    id: u64,
    pattern: TopicPattern,
    handler: Handler,
}

#[derive(Default)]
struct QueueState {
    buf: VecDeque<Event>,
    dropped: u64,
    closed: bool,
}

struct QueueShared {
    id: u64,
    pattern: TopicPattern,
    capacity: usize,
    state: Mutex<QueueState>,
    notify: Notify,
}

#[derive(Default)]
struct BusInner {
    next_id: u64,
    handlers: Vec<HandlerEntry>,
    queues: Vec<Arc<QueueShared>>,
}

/// Cheaply cloneable handle to the shared bus.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<Mutex<BusInner>>,
    handler_budget: Duration,
    default_capacity: usize,
}

impl EventBus {
    pub fn new(config: &crate::config::BusConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(BusInner::default())),
            handler_budget: config.handler_budget,
            default_capacity: config.queue_capacity,
        }
    }

    /// Register an in-process handler. Handlers for the same topic run
    /// in registration order; dropping the handle unsubscribes.
    pub fn subscribe(
        &self,
        pattern: impl Into<TopicPattern>,
        handler: impl Fn(&Event) + Send + Sync + 'static,
    ) -> SubscriptionHandle {
        let mut inner = self.inner.lock();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.handlers.push(HandlerEntry {
            id,
            pattern: pattern.into(),
            handler: Arc::new(handler),
        });
        SubscriptionHandle {
            inner: Arc::downgrade(&self.inner),
            id,
        }
    }

    /// Register a queue subscriber with the default capacity.
    pub fn subscribe_queue(&self, pattern: impl Into<TopicPattern>) -> QueueSubscriber {
        self.subscribe_queue_with_capacity(pattern, self.default_capacity)
    }

    pub fn subscribe_queue_with_capacity(
        &self,
        pattern: impl Into<TopicPattern>,
        capacity: usize,
    ) -> QueueSubscriber {
        let mut inner = self.inner.lock();
        inner.next_id += 1;
        let shared = Arc::new(QueueShared {
            id: inner.next_id,
            pattern: pattern.into(),
            capacity: capacity.max(1),
            state: Mutex::new(QueueState::default()),
            notify: Notify::new(),
        });
        inner.queues.push(Arc::clone(&shared));
        QueueSubscriber {
            shared,
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Publish an event to every matching subscriber.
    ///
    /// Queue pushes happen under the bus lock so all subscribers see
    /// the same emission order; handlers run after the lock is
    /// released.
    pub fn emit(&self, event: Event) {
        let topic = event.topic();

        let handlers: Vec<Handler> = {
            let inner = self.inner.lock();
            for queue in &inner.queues {
                if queue.pattern.matches(topic) {
                    push_to_queue(queue, &event);
                }
            }
            inner
                .handlers
                .iter()
                .filter(|entry| entry.pattern.matches(topic))
                .map(|entry| Arc::clone(&entry.handler))
                .collect()
        };

        for handler in handlers {
            let started = Instant::now();
            let outcome = catch_unwind(AssertUnwindSafe(|| handler(&event)));
            let elapsed = started.elapsed();

            if elapsed > self.handler_budget {
                warn!(topic, elapsed_ms = elapsed.as_millis() as u64, "slow bus handler");
            }

            if let Err(panic) = outcome {
                let description = panic_message(panic.as_ref());
                warn!(topic, error = %description, "bus handler panicked");
                // One level of error reporting only; a handler that
                // panics on bus.handlerError must not recurse.
                if !matches!(event, Event::BusHandlerError { .. }) {
                    self.emit(Event::BusHandlerError {
                        topic: topic.to_string(),
                        error: description,
                    });
                }
            }
        }
    }
}

fn push_to_queue(queue: &Arc<QueueShared>, event: &Event) {
    let mut state = queue.state.lock();
    if state.closed {
        return;
    }

    if state.buf.len() >= queue.capacity {
        // Make room by dropping the oldest non-critical event. Critical
        // events are never dropped; a subscriber that would force one
        // to be is disconnected instead.
        match state.buf.iter().position(|e| !e.critical()) {
            Some(pos) => {
                state.buf.remove(pos);
                state.dropped += 1;
            }
            None if !event.critical() => {
                // Nothing buffered is droppable; drop the incoming
                // non-critical event itself.
                state.dropped += 1;
                queue.notify.notify_one();
                return;
            }
            None => {
                state.closed = true;
                state.buf.clear();
                queue.notify.notify_one();
                return;
            }
        }
    }

    state.buf.push_back(event.clone());
    queue.notify.notify_one();
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Explicit unsubscribe handle for in-process handlers.
///
/// Unsubscribes on drop; `cancel` makes the intent visible at call
/// sites that unsubscribe early.
pub struct SubscriptionHandle {
    inner: Weak<Mutex<BusInner>>,
    id: u64,
}

impl SubscriptionHandle {
    pub fn cancel(self) {}
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.lock().handlers.retain(|entry| entry.id != self.id);
        }
    }
}

/// Bounded queue subscriber for remote delivery.
pub struct QueueSubscriber {
    shared: Arc<QueueShared>,
    inner: Weak<Mutex<BusInner>>,
}

impl QueueSubscriber {
    /// Wait for the next event.
    ///
    /// Returns a `subscriber.lagged` sentinel ahead of the next real
    /// event after any drop, and `None` once the subscriber has been
    /// closed for refusing a critical event.
    pub async fn recv(&mut self) -> Option<Event> {
        loop {
            {
                let mut state = self.shared.state.lock();
                if state.dropped > 0 {
                    let dropped = state.dropped;
                    state.dropped = 0;
                    return Some(Event::SubscriberLagged { dropped });
                }
                if let Some(event) = state.buf.pop_front() {
                    return Some(event);
                }
                if state.closed {
                    return None;
                }
            }
            self.shared.notify.notified().await;
        }
    }

    /// Non-blocking drain of everything currently queued.
    pub fn drain(&mut self) -> Vec<Event> {
        let mut state = self.shared.state.lock();
        let mut out = Vec::with_capacity(state.buf.len() + 1);
        if state.dropped > 0 {
            out.push(Event::SubscriberLagged {
                dropped: state.dropped,
            });
            state.dropped = 0;
        }
        out.extend(state.buf.drain(..));
        out
    }

    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().closed
    }
}

impl Drop for QueueSubscriber {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.lock().queues.retain(|queue| queue.id != self.shared.id);
        }
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
