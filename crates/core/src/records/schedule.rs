// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::filter::EventFilter;
use crate::id::{CronId, TriggerId, Uid};
use crate::process::AgentConfig;
use serde::{Deserialize, Serialize};

/// A time-scheduled agent spawn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CronJob {
    pub id: CronId,
    pub name: String,
    /// Five-field cron expression or @hourly/@daily/@weekly/@monthly macro.
    pub cron_expression: String,
    pub agent_config: AgentConfig,
    pub enabled: bool,
    pub owner_uid: Uid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run_ms: Option<u64>,
    pub next_run_ms: u64,
    #[serde(default)]
    pub run_count: u64,
    pub created_at_ms: u64,
}

/// An event-conditioned agent spawn with a cooldown window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventTrigger {
    pub id: TriggerId,
    pub name: String,
    /// Topic the trigger listens on (exact, no wildcard).
    pub event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_filter: Option<EventFilter>,
    pub agent_config: AgentConfig,
    pub enabled: bool,
    pub owner_uid: Uid,
    pub cooldown_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_fired_ms: Option<u64>,
    #[serde(default)]
    pub fire_count: u64,
    pub created_at_ms: u64,
}
