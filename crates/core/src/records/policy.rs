// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::id::{PolicyId, Uid};
use serde::{Deserialize, Serialize};

/// Policy effect. Deny always overrides allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    Allow,
    Deny,
}

impl Effect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Effect::Allow => "allow",
            Effect::Deny => "deny",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "allow" => Some(Effect::Allow),
            "deny" => Some(Effect::Deny),
            _ => None,
        }
    }
}

/// One access rule.
///
/// `subject` is `user:<uid>`, `role:<name>`, or `*`; `action` is a
/// command name or `*`; `resource` is a resource path or `*`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PermissionPolicy {
    pub id: PolicyId,
    pub subject: String,
    pub action: String,
    pub resource: String,
    pub effect: Effect,
    pub created_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<Uid>,
}
