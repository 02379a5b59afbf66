// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event-trigger driver with per-trigger cooldowns

use super::AgentSpawner;
use crate::bus::EventBus;
use aether_core::{Clock, Event};
use aether_store::StateStore;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub struct TriggerDriver<C: Clock> {
    store: Arc<StateStore>,
    bus: EventBus,
    spawner: Arc<dyn AgentSpawner>,
    clock: C,
}

impl<C: Clock> TriggerDriver<C> {
    pub fn new(
        store: Arc<StateStore>,
        bus: EventBus,
        spawner: Arc<dyn AgentSpawner>,
        clock: C,
    ) -> Self {
        Self {
            store,
            bus,
            spawner,
            clock,
        }
    }

    /// Evaluate one observed event against every enabled trigger.
    pub fn handle(&self, event: &Event) {
        // Sentinels are per-subscriber bookkeeping, not kernel events.
        if matches!(event, Event::SubscriberLagged { .. }) {
            return;
        }

        let topic = event.topic();
        let triggers = match self.store.triggers_for_event(topic) {
            Ok(triggers) => triggers,
            Err(e) => {
                warn!(topic, error = %e, "trigger lookup failed");
                return;
            }
        };
        if triggers.is_empty() {
            return;
        }

        let payload = serde_json::to_value(event).unwrap_or(serde_json::Value::Null);

        for trigger in triggers {
            if let Some(filter) = &trigger.event_filter {
                if !filter.matches(&payload) {
                    continue;
                }
            }

            let now = self.clock.epoch_ms();
            if let Some(last) = trigger.last_fired_ms {
                if now.saturating_sub(last) < trigger.cooldown_ms {
                    continue;
                }
            }

            let spawned = self
                .spawner
                .spawn_agent(&trigger.owner_uid, &trigger.agent_config);

            // A failed spawn still opens a new cooldown window so a
            // saturated kernel is not hammered on every event.
            if let Err(e) = self
                .store
                .mark_trigger_fired(&trigger.id, now, spawned.is_ok())
            {
                warn!(id = %trigger.id, error = %e, "trigger bookkeeping failed");
            }

            match spawned {
                Ok(process) => {
                    info!(id = %trigger.id, name = %trigger.name, pid = %process.pid, "trigger fired");
                    self.bus.emit(Event::TriggerFired {
                        id: trigger.id.clone(),
                        pid: process.pid,
                    });
                }
                Err(e) => {
                    warn!(id = %trigger.id, error = %e, "trigger spawn failed");
                }
            }
        }
    }

    pub fn spawn(self, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
        let mut subscriber = self.bus.subscribe_queue("*");
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    event = subscriber.recv() => match event {
                        Some(event) => self.handle(&event),
                        None => break,
                    },
                }
            }
        })
    }
}

#[cfg(test)]
#[path = "trigger_tests.rs"]
mod tests;
