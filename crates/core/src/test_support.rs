// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::id::{MemoryId, Pid, Uid};
use crate::process::{AgentConfig, AgentPhase, ProcState, ProcessInfo};
use crate::records::{MemoryLayer, MemoryRecord};
use std::collections::{BTreeSet, HashMap};

// ── Record factory functions ────────────────────────────────────────────────

pub fn process_info(pid: i64, uid: &str) -> ProcessInfo {
    ProcessInfo {
        pid: Pid(pid),
        uid: Uid::new(uid),
        name: format!("agent-{pid}"),
        role: "Researcher".to_string(),
        goal: "test goal".to_string(),
        state: ProcState::Running,
        phase: AgentPhase::Idle,
        exit_code: None,
        created_at_ms: 1_000_000,
        exited_at_ms: None,
        env: HashMap::new(),
        tty_id: None,
        vnc_ws_url: None,
    }
}

pub fn agent_config(role: &str, goal: &str) -> AgentConfig {
    AgentConfig {
        name: String::new(),
        role: role.to_string(),
        goal: goal.to_string(),
        max_steps: 4,
        env: HashMap::new(),
    }
}

pub fn memory_record(id: &str, uid: &str, layer: MemoryLayer, importance: f64) -> MemoryRecord {
    MemoryRecord {
        id: MemoryId::new(id),
        agent_uid: Uid::new(uid),
        layer,
        content: format!("memory {id}"),
        tags: BTreeSet::new(),
        importance,
        access_count: 0,
        created_at_ms: 1_000_000,
        last_accessed_ms: 1_000_000,
        expires_at_ms: None,
        source_pid: None,
        related: BTreeSet::new(),
    }
}
