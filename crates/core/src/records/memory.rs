// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::id::{MemoryId, Pid, Uid};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Memory layer. Each layer carries its own cardinality cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryLayer {
    Episodic,
    Semantic,
    Procedural,
    Social,
}

impl MemoryLayer {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryLayer::Episodic => "episodic",
            MemoryLayer::Semantic => "semantic",
            MemoryLayer::Procedural => "procedural",
            MemoryLayer::Social => "social",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "episodic" => Some(MemoryLayer::Episodic),
            "semantic" => Some(MemoryLayer::Semantic),
            "procedural" => Some(MemoryLayer::Procedural),
            "social" => Some(MemoryLayer::Social),
            _ => None,
        }
    }
}

/// A stored agent memory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryRecord {
    pub id: MemoryId,
    pub agent_uid: Uid,
    pub layer: MemoryLayer,
    pub content: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Importance in [0, 1]; eviction removes lowest-importance first.
    pub importance: f64,
    #[serde(default)]
    pub access_count: u64,
    pub created_at_ms: u64,
    pub last_accessed_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_pid: Option<Pid>,
    #[serde(default)]
    pub related: BTreeSet<MemoryId>,
}
