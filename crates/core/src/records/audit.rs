// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::id::{Pid, Uid};
use serde::{Deserialize, Serialize};

/// Append-only security audit row. Arguments are sanitized before
/// insertion; secrets never reach the table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    #[serde(default)]
    pub id: i64,
    pub timestamp: u64,
    pub event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_pid: Option<Pid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_uid: Option<Uid>,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args_sanitized: Option<serde_json::Value>,
    /// sha256 of the result payload, kept so evidence stays redactable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}
