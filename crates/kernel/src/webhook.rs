// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outbound webhook delivery with retries and a dead-letter queue

use crate::bus::EventBus;
use crate::config::WebhookConfig;
use aether_core::{Clock, DlqEntry, Event, KernelError, Webhook, WebhookLogEntry};
use aether_store::StateStore;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub struct WebhookDispatcher<C: Clock> {
    store: Arc<StateStore>,
    bus: EventBus,
    client: reqwest::Client,
    clock: C,
    config: WebhookConfig,
}

impl<C: Clock> WebhookDispatcher<C> {
    pub fn new(store: Arc<StateStore>, bus: EventBus, clock: C, config: WebhookConfig) -> Self {
        Self {
            store,
            bus,
            client: reqwest::Client::new(),
            clock,
            config,
        }
    }

    /// Deliver `event` to every subscribed webhook.
    pub async fn handle(&self, event: &Event) {
        let topic = event.topic();
        // Never deliver delivery bookkeeping; a hook subscribed to its
        // own outcome events would loop forever.
        if topic.starts_with("webhook.") || matches!(event, Event::SubscriberLagged { .. }) {
            return;
        }

        let hooks = match self.store.webhooks_for_event(topic) {
            Ok(hooks) => hooks,
            Err(e) => {
                warn!(topic, error = %e, "webhook lookup failed");
                return;
            }
        };
        if hooks.is_empty() {
            return;
        }

        let data = serde_json::to_value(event).unwrap_or(serde_json::Value::Null);
        for hook in hooks {
            if let Some(filter) = &hook.filter {
                if !filter.matches(&data) {
                    continue;
                }
            }
            self.deliver(&hook, topic, &data).await;
        }
    }

    /// POST with exponential backoff; dead-letter after `retry_count`
    /// attempts.
    async fn deliver(&self, hook: &Webhook, topic: &str, data: &serde_json::Value) {
        let payload = serde_json::json!({
            "event": topic,
            "timestamp": self.clock.epoch_ms(),
            "data": data,
        });
        let body = payload.to_string();

        let attempts = hook.retry_count.max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match self.attempt(hook, &body).await {
                Ok(status) => {
                    let _ = self.store.append_webhook_log(&WebhookLogEntry {
                        id: 0,
                        webhook_id: hook.id.clone(),
                        event_type: topic.to_string(),
                        success: true,
                        status: Some(status),
                        error: None,
                        attempt,
                        created_at_ms: self.clock.epoch_ms(),
                    });
                    debug!(id = %hook.id, topic, status, "webhook delivered");
                    self.bus.emit(Event::WebhookDelivered {
                        id: hook.id.clone(),
                        event_type: topic.to_string(),
                        status,
                    });
                    return;
                }
                Err(error) => {
                    last_error = error.clone();
                    let _ = self.store.append_webhook_log(&WebhookLogEntry {
                        id: 0,
                        webhook_id: hook.id.clone(),
                        event_type: topic.to_string(),
                        success: false,
                        status: None,
                        error: Some(error.clone()),
                        attempt,
                        created_at_ms: self.clock.epoch_ms(),
                    });
                    self.bus.emit(Event::WebhookFailed {
                        id: hook.id.clone(),
                        event_type: topic.to_string(),
                        error,
                        attempt,
                    });

                    if attempt < attempts {
                        let backoff = self.config.backoff_base * 2u32.pow(attempt - 1);
                        tokio::time::sleep(backoff).await;
                    }
                }
            }
        }

        warn!(id = %hook.id, topic, error = %last_error, "webhook exhausted retries");
        let _ = self.store.insert_dlq_entry(&DlqEntry {
            id: 0,
            webhook_id: hook.id.clone(),
            event_type: topic.to_string(),
            payload,
            error: last_error,
            attempts,
            created_at_ms: self.clock.epoch_ms(),
        });
        let _ = self.store.increment_webhook_failures(&hook.id);
        self.bus.emit(Event::WebhookDeadLettered {
            id: hook.id.clone(),
            event_type: topic.to_string(),
        });
    }

    async fn attempt(&self, hook: &Webhook, body: &str) -> Result<u16, String> {
        let mut request = self
            .client
            .post(&hook.url)
            .header("content-type", "application/json")
            .timeout(Duration::from_millis(hook.timeout_ms))
            .body(body.to_string());

        for (name, value) in &hook.headers {
            request = request.header(name, value);
        }
        if let Some(secret) = &hook.secret {
            request = request.header(
                "x-aether-signature",
                format!("sha256={}", sign(secret, body)),
            );
        }

        let response = request.send().await.map_err(|e| e.to_string())?;
        let status = response.status();
        if status.is_success() {
            Ok(status.as_u16())
        } else {
            Err(format!("status {}", status.as_u16()))
        }
    }

    /// One unlogged probe delivery, used by `webhook.test`.
    pub async fn probe(&self, hook: &Webhook) -> bool {
        let payload = serde_json::json!({
            "event": "webhook.test",
            "timestamp": self.clock.epoch_ms(),
            "data": { "probe": true },
        });
        match self.attempt(hook, &payload.to_string()).await {
            Ok(status) => {
                let _ = self.store.append_webhook_log(&WebhookLogEntry {
                    id: 0,
                    webhook_id: hook.id.clone(),
                    event_type: "webhook.test".to_string(),
                    success: true,
                    status: Some(status),
                    error: None,
                    attempt: 1,
                    created_at_ms: self.clock.epoch_ms(),
                });
                true
            }
            Err(error) => {
                let _ = self.store.append_webhook_log(&WebhookLogEntry {
                    id: 0,
                    webhook_id: hook.id.clone(),
                    event_type: "webhook.test".to_string(),
                    success: false,
                    status: None,
                    error: Some(error),
                    attempt: 1,
                    created_at_ms: self.clock.epoch_ms(),
                });
                false
            }
        }
    }

    /// Replay one dead-lettered delivery; removes the entry on success.
    pub async fn retry_dlq(&self, entry_id: i64) -> Result<bool, KernelError> {
        let entry = self
            .store
            .get_dlq_entry(entry_id)
            .map_err(KernelError::internal)?
            .ok_or_else(|| KernelError::not_found(format!("dlq entry {entry_id}")))?;

        let hook = self
            .store
            .get_webhook(&entry.webhook_id)
            .map_err(KernelError::internal)?
            .ok_or_else(|| KernelError::not_found(format!("webhook {}", entry.webhook_id)))?;

        let body = entry.payload.to_string();
        match self.attempt(&hook, &body).await {
            Ok(status) => {
                let _ = self.store.append_webhook_log(&WebhookLogEntry {
                    id: 0,
                    webhook_id: hook.id.clone(),
                    event_type: entry.event_type.clone(),
                    success: true,
                    status: Some(status),
                    error: None,
                    attempt: entry.attempts + 1,
                    created_at_ms: self.clock.epoch_ms(),
                });
                self.store
                    .delete_dlq_entry(entry_id)
                    .map_err(KernelError::internal)?;
                Ok(true)
            }
            Err(_) => Ok(false),
        }
    }

    pub fn spawn(self, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
        let mut subscriber = self.bus.subscribe_queue("*");
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    event = subscriber.recv() => match event {
                        Some(event) => self.handle(&event).await,
                        None => break,
                    },
                }
            }
        })
    }
}

/// Hex-encoded HMAC-SHA256 of `body`.
fn sign(secret: &str, body: &str) -> String {
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret.as_bytes()) else {
        return String::new();
    };
    mac.update(body.as_bytes());
    let digest = mac.finalize().into_bytes();
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        use std::fmt::Write;
        let _ = write!(out, "{byte:02x}");
    }
    out
}

#[cfg(test)]
#[path = "webhook_tests.rs"]
mod tests;
