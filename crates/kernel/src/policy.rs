// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subject/action/resource access decisions

use aether_core::{Effect, PermissionPolicy, Role, Uid};
use aether_store::StateStore;
use std::sync::Arc;

/// The authenticated principal a decision is made for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub uid: Uid,
    pub role: Role,
}

impl Subject {
    pub fn new(uid: impl Into<Uid>, role: Role) -> Self {
        Self {
            uid: uid.into(),
            role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Policy decision function.
///
/// Admins start allowed, everyone else denied; resource ownership
/// grants a default allow; an explicit deny always wins regardless of
/// policy order.
pub struct PolicyEngine {
    store: Arc<StateStore>,
}

impl PolicyEngine {
    pub fn new(store: Arc<StateStore>) -> Self {
        Self { store }
    }

    pub fn can(
        &self,
        subject: &Subject,
        action: &str,
        resource: &str,
        owner: Option<&Uid>,
    ) -> bool {
        let mut allowed = subject.is_admin();

        if owner == Some(&subject.uid) {
            allowed = true;
        }

        let policies = self.store.list_policies().unwrap_or_default();
        let mut denied = false;
        for policy in policies
            .iter()
            .filter(|p| matches_subject(p, subject) && matches_field(&p.action, action)
                && matches_field(&p.resource, resource))
        {
            match policy.effect {
                Effect::Deny => denied = true,
                Effect::Allow => allowed = true,
            }
        }

        allowed && !denied
    }

    /// Whether `subject` may observe an event owned by `owner`.
    ///
    /// Cross-user events only flow to admins; unowned events pass.
    pub fn can_observe(&self, subject: &Subject, owner: Option<&Uid>) -> bool {
        match owner {
            None => true,
            Some(owner) => subject.is_admin() || owner == &subject.uid,
        }
    }
}

fn matches_subject(policy: &PermissionPolicy, subject: &Subject) -> bool {
    policy.subject == "*"
        || policy.subject == format!("user:{}", subject.uid)
        || policy.subject == format!("role:{}", subject.role.as_str())
}

fn matches_field(pattern: &str, value: &str) -> bool {
    pattern == "*" || pattern == value
}

#[cfg(test)]
#[path = "policy_tests.rs"]
mod tests;
