// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use aether_core::PolicyId;
use yare::parameterized;

fn engine_with(policies: &[(&str, &str, &str, Effect)]) -> PolicyEngine {
    let store = Arc::new(aether_store::StateStore::open_in_memory().unwrap());
    for (i, (subject, action, resource, effect)) in policies.iter().enumerate() {
        store
            .insert_policy(&PermissionPolicy {
                id: PolicyId::new(format!("pol-{i}")),
                subject: subject.to_string(),
                action: action.to_string(),
                resource: resource.to_string(),
                effect: *effect,
                created_at_ms: i as u64,
                created_by: None,
            })
            .unwrap();
    }
    PolicyEngine::new(store)
}

fn admin() -> Subject {
    Subject::new("u-admin", Role::Admin)
}

fn bob() -> Subject {
    Subject::new("u-bob", Role::User)
}

#[test]
fn admins_are_allowed_by_default() {
    let engine = engine_with(&[]);
    assert!(engine.can(&admin(), "process.kill", "*", None));
    assert!(!engine.can(&bob(), "process.kill", "*", None));
}

#[test]
fn ownership_grants_default_allow() {
    let engine = engine_with(&[]);
    let owner = Uid::new("u-bob");
    assert!(engine.can(&bob(), "process.kill", "process/7", Some(&owner)));

    let other = Uid::new("u-alice");
    assert!(!engine.can(&bob(), "process.kill", "process/9", Some(&other)));
}

#[test]
fn explicit_allow_grants_access() {
    let engine = engine_with(&[("user:u-bob", "cron.create", "*", Effect::Allow)]);
    assert!(engine.can(&bob(), "cron.create", "*", None));
    assert!(!engine.can(&bob(), "cron.delete", "*", None));
}

#[parameterized(
    deny_after_allow = { &[("user:u-bob", "process.kill", "*", Effect::Allow),
                          ("user:u-bob", "process.kill", "*", Effect::Deny)] },
    deny_before_allow = { &[("user:u-bob", "process.kill", "*", Effect::Deny),
                            ("user:u-bob", "process.kill", "*", Effect::Allow)] },
)]
fn deny_overrides_allow_regardless_of_order(policies: &[(&str, &str, &str, Effect)]) {
    let engine = engine_with(policies);
    assert!(!engine.can(&bob(), "process.kill", "*", None));
}

#[test]
fn deny_overrides_ownership_default() {
    let engine = engine_with(&[("user:u-bob", "process.kill", "*", Effect::Deny)]);
    let owner = Uid::new("u-bob");
    assert!(!engine.can(&bob(), "process.kill", "process/7", Some(&owner)));
}

#[test]
fn role_and_wildcard_subjects_match() {
    let engine = engine_with(&[
        ("role:user", "mem.search", "*", Effect::Allow),
        ("*", "kv.set", "*", Effect::Deny),
    ]);
    assert!(engine.can(&bob(), "mem.search", "*", None));
    assert!(!engine.can(&bob(), "kv.set", "*", None));
    // The wildcard deny reaches admins too.
    assert!(!engine.can(&admin(), "kv.set", "*", None));
}

#[test]
fn subscription_scoping_only_admits_owner_or_admin() {
    let engine = engine_with(&[]);
    let owner = Uid::new("u-bob");

    assert!(engine.can_observe(&bob(), Some(&owner)));
    assert!(engine.can_observe(&admin(), Some(&owner)));
    assert!(!engine.can_observe(&Subject::new("u-carol", Role::User), Some(&owner)));
    assert!(engine.can_observe(&bob(), None));
}
