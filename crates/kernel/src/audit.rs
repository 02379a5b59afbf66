// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Security audit trail
//!
//! Subscribes to a fixed set of security-relevant topics and writes
//! sanitized, immutable rows. A periodic pruner enforces retention.

use crate::bus::{EventBus, SubscriptionHandle};
use crate::config::RetentionConfig;
use aether_core::{sanitize_json, AuditEntry, Clock, Event};
use aether_store::StateStore;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Topics that always land in the audit log.
pub const AUDIT_TOPICS: &[&str] = &[
    "process.spawned",
    "process.exit",
    "user.*",
    "policy.*",
    "webhook.created",
    "webhook.deleted",
    "cron.created",
    "cron.deleted",
    "trigger.created",
    "trigger.deleted",
];

pub struct AuditLogger<C: Clock> {
    store: Arc<StateStore>,
    clock: C,
}

impl<C: Clock> AuditLogger<C> {
    pub fn new(store: Arc<StateStore>, clock: C) -> Self {
        Self { store, clock }
    }

    /// Subscribe to the fixed topic set. The returned handles keep the
    /// subscriptions alive.
    pub fn attach(self: Arc<Self>, bus: &EventBus) -> Vec<SubscriptionHandle> {
        AUDIT_TOPICS
            .iter()
            .map(|pattern| {
                let logger = Arc::clone(&self);
                bus.subscribe(*pattern, move |event| logger.record(event))
            })
            .collect()
    }

    /// Write one audit row for an observed event.
    pub fn record(&self, event: &Event) {
        let raw = match serde_json::to_value(event) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "unserializable audit event");
                return;
            }
        };
        let sanitized = sanitize_json(&raw);

        let entry = AuditEntry {
            id: 0,
            timestamp: self.clock.epoch_ms(),
            event_type: event.topic().to_string(),
            actor_pid: event.pid(),
            actor_uid: event.owner().cloned(),
            action: event.topic().to_string(),
            target: target_of(event),
            args_sanitized: Some(sanitized.clone()),
            result_hash: Some(content_hash(&sanitized)),
            metadata: None,
        };

        if let Err(e) = self.store.append_audit(&entry) {
            warn!(topic = event.topic(), error = %e, "audit write failed");
        }
    }

    /// Write an audit row for a client command (register, policy edits
    /// and the like). Arguments are sanitized before insertion.
    pub fn record_command(
        &self,
        actor_uid: Option<&aether_core::Uid>,
        action: &str,
        target: Option<String>,
        args: &serde_json::Value,
    ) {
        let entry = AuditEntry {
            id: 0,
            timestamp: self.clock.epoch_ms(),
            event_type: "command".to_string(),
            actor_pid: None,
            actor_uid: actor_uid.cloned(),
            action: action.to_string(),
            target,
            args_sanitized: Some(sanitize_json(args)),
            result_hash: None,
            metadata: None,
        };
        if let Err(e) = self.store.append_audit(&entry) {
            warn!(action, error = %e, "audit write failed");
        }
    }

    /// Periodic retention pruner.
    pub fn spawn_pruner(
        self: Arc<Self>,
        config: RetentionConfig,
        cancel: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(config.prune_interval);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tick.tick() => {
                        let now = self.clock.epoch_ms();
                        let audit_cutoff = now.saturating_sub(config.audit.as_millis() as u64);
                        if let Err(e) = self.store.prune_audit_before(audit_cutoff) {
                            warn!(error = %e, "audit prune failed");
                        }
                        let metric_cutoff = now.saturating_sub(config.metrics.as_millis() as u64);
                        if let Err(e) = self.store.prune_metrics_before(metric_cutoff) {
                            warn!(error = %e, "metric prune failed");
                        }
                        if let Err(e) = self.store.expire_memories(now) {
                            warn!(error = %e, "memory expiry failed");
                        }
                    }
                }
            }
        })
    }
}

fn target_of(event: &Event) -> Option<String> {
    match event {
        Event::ProcessSpawned { pid, .. } | Event::ProcessExit { pid, .. } => {
            Some(pid.to_string())
        }
        Event::UserRegistered { uid, .. }
        | Event::UserLogin { uid, .. }
        | Event::UserDeleted { uid } => Some(uid.to_string()),
        Event::UserLoginFailed { username, .. } => Some(username.clone()),
        Event::PolicyCreated { id, .. } | Event::PolicyDeleted { id } => Some(id.to_string()),
        Event::WebhookCreated { id } | Event::WebhookDeleted { id } => Some(id.to_string()),
        Event::CronCreated { id, .. } | Event::CronDeleted { id } => Some(id.to_string()),
        Event::TriggerCreated { id, .. } | Event::TriggerDeleted { id } => Some(id.to_string()),
        _ => None,
    }
}

fn content_hash(value: &serde_json::Value) -> String {
    let digest = Sha256::digest(value.to_string().as_bytes());
    format!("{digest:x}")
}

#[cfg(test)]
#[path = "audit_tests.rs"]
mod tests;
