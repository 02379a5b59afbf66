// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::filter::EventFilter;
use crate::id::{Uid, WebhookId};
use crate::process::AgentConfig;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Outbound webhook subscription.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Webhook {
    pub id: WebhookId,
    pub url: String,
    /// HMAC-SHA256 signing secret; deliveries are unsigned when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    /// Topics this hook receives. Exact topics only.
    pub events: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<EventFilter>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    pub enabled: bool,
    pub owner_uid: Uid,
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub failure_count: u64,
    pub created_at_ms: u64,
}

fn default_retry_count() -> u32 {
    3
}

fn default_timeout_ms() -> u64 {
    5_000
}

/// Inbound webhook: `POST /hook/{token}` spawns an agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InboundWebhook {
    /// URL token, unique across hooks.
    pub token: String,
    pub name: String,
    pub agent_config: AgentConfig,
    /// Optional JSON projection applied to the request body before it is
    /// appended to the agent goal: a dotted path into the payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<String>,
    pub owner_uid: Uid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_triggered_ms: Option<u64>,
    #[serde(default)]
    pub trigger_count: u64,
    pub created_at_ms: u64,
}

/// Delivery that exhausted its retries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DlqEntry {
    #[serde(default)]
    pub id: i64,
    pub webhook_id: WebhookId,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub error: String,
    pub attempts: u32,
    pub created_at_ms: u64,
}

/// One delivery attempt, success or failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookLogEntry {
    #[serde(default)]
    pub id: i64,
    pub webhook_id: WebhookId,
    pub event_type: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub attempt: u32,
    pub created_at_ms: u64,
}
