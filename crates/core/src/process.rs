// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process lifecycle types

use crate::id::{Pid, Uid};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Lifecycle state of a kernel process.
///
/// Transitions form a DAG: created -> running -> (paused <-> running)
/// -> zombie -> dead. Terminal processes reject command dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcState {
    Created,
    Running,
    Paused,
    Zombie,
    Dead,
}

impl ProcState {
    /// Whether the process has exited (zombie awaiting reap, or reaped).
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProcState::Zombie | ProcState::Dead)
    }

    /// Whether a transition to `to` is a valid edge of the lifecycle DAG.
    pub fn can_transition(&self, to: ProcState) -> bool {
        use ProcState::*;
        matches!(
            (self, to),
            (Created, Running)
                | (Created, Zombie)
                | (Running, Paused)
                | (Running, Zombie)
                | (Paused, Running)
                | (Zombie, Dead)
        )
    }
}

impl ProcState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcState::Created => "created",
            ProcState::Running => "running",
            ProcState::Paused => "paused",
            ProcState::Zombie => "zombie",
            ProcState::Dead => "dead",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "created" => Some(ProcState::Created),
            "running" => Some(ProcState::Running),
            "paused" => Some(ProcState::Paused),
            "zombie" => Some(ProcState::Zombie),
            "dead" => Some(ProcState::Dead),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProcState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where the reasoning loop currently is within its step cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AgentPhase {
    #[default]
    Idle,
    Thinking,
    Acting,
    Observing,
    Completed,
    Failed,
}

impl AgentPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentPhase::Idle => "idle",
            AgentPhase::Thinking => "thinking",
            AgentPhase::Acting => "acting",
            AgentPhase::Observing => "observing",
            AgentPhase::Completed => "completed",
            AgentPhase::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "idle" => Some(AgentPhase::Idle),
            "thinking" => Some(AgentPhase::Thinking),
            "acting" => Some(AgentPhase::Acting),
            "observing" => Some(AgentPhase::Observing),
            "completed" => Some(AgentPhase::Completed),
            "failed" => Some(AgentPhase::Failed),
            _ => None,
        }
    }
}

/// Why the reasoning loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExitReason {
    /// Chat returned a terminal marker.
    Done,
    /// Step budget exhausted.
    Limit,
    /// A tool raised a fatal error.
    Failed,
    /// Cancelled via process.kill.
    Killed,
}

impl ExitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitReason::Done => "done",
            ExitReason::Limit => "limit",
            ExitReason::Failed => "failed",
            ExitReason::Killed => "killed",
        }
    }

    /// Conventional exit code reported with `process.exit`.
    pub fn exit_code(&self) -> i32 {
        match self {
            ExitReason::Done | ExitReason::Limit => 0,
            ExitReason::Failed => 1,
            ExitReason::Killed => 137,
        }
    }
}

/// Live record of a supervised agent process.
///
/// Owned exclusively by the process table; other components observe
/// copies or events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub pid: Pid,
    pub uid: Uid,
    pub name: String,
    pub role: String,
    pub goal: String,
    pub state: ProcState,
    pub phase: AgentPhase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    pub created_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exited_at_ms: Option<u64>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    /// Sandbox terminal handle, opaque to the kernel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tty_id: Option<String>,
    /// Sandbox VNC endpoint, opaque to the kernel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vnc_ws_url: Option<String>,
}

/// Per-spawn configuration carried by commands, cron jobs, triggers and
/// inbound webhooks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentConfig {
    #[serde(default)]
    pub name: String,
    pub role: String,
    pub goal: String,
    #[serde(default = "default_max_steps", alias = "maxSteps")]
    pub max_steps: u32,
    #[serde(default)]
    pub env: HashMap<String, String>,
}

fn default_max_steps() -> u32 {
    32
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
