// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::id::Pid;
use serde::{Deserialize, Serialize};

/// Which side of the reasoning cycle produced a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogPhase {
    Thought,
    Action,
    Observation,
    System,
}

impl LogPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogPhase::Thought => "thought",
            LogPhase::Action => "action",
            LogPhase::Observation => "observation",
            LogPhase::System => "system",
        }
    }
}

/// Append-only reasoning transcript row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentLogEntry {
    #[serde(default)]
    pub id: i64,
    pub pid: Pid,
    pub step: u32,
    pub phase: LogPhase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    /// Free text or serialized JSON depending on phase.
    pub content: String,
    pub timestamp: u64,
}
