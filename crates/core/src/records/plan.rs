// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::id::{Pid, PlanId, Uid};
use serde::{Deserialize, Serialize};

/// Plan status. Transitions are monotone: active may move to completed
/// or abandoned, terminal states never move again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
    Active,
    Completed,
    Abandoned,
}

impl PlanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanStatus::Active => "active",
            PlanStatus::Completed => "completed",
            PlanStatus::Abandoned => "abandoned",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(PlanStatus::Active),
            "completed" => Some(PlanStatus::Completed),
            "abandoned" => Some(PlanStatus::Abandoned),
            _ => None,
        }
    }

    pub fn can_transition(&self, to: PlanStatus) -> bool {
        matches!(
            (self, to),
            (PlanStatus::Active, PlanStatus::Completed) | (PlanStatus::Active, PlanStatus::Abandoned)
        )
    }
}

/// One node of a plan tree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanNode {
    pub title: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<PlanNode>,
}

/// A plan produced by an agent run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanRecord {
    pub id: PlanId,
    pub pid: Pid,
    pub agent_uid: Uid,
    pub status: PlanStatus,
    pub tree: Vec<PlanNode>,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
}

/// User feedback attached to a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRecord {
    #[serde(default)]
    pub id: i64,
    pub pid: Pid,
    pub agent_uid: Uid,
    /// Rating in [-1, 1]; negative is a complaint.
    pub rating: f64,
    #[serde(default)]
    pub comment: String,
    pub created_at_ms: u64,
}

/// Post-run self-assessment written by the loop on completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReflectionRecord {
    #[serde(default)]
    pub id: i64,
    pub pid: Pid,
    pub agent_uid: Uid,
    pub content: String,
    pub created_at_ms: u64,
}
