// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::protocol::Frame;
use aether_core::FakeClock;
use aether_kernel::{KernelConfig, ScriptedChat};
use aether_store::StateStore;
use serde_json::json;

fn build_gateway() -> (Arc<Gateway<FakeClock>>, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(StateStore::open_in_memory().unwrap());
    let clock = FakeClock::new();
    clock.set_epoch_ms(1_700_000_000_000);
    let config = KernelConfig {
        home_dir: dir.path().join("home"),
        snapshot_dir: dir.path().join("snapshots"),
        ..KernelConfig::default()
    };
    let kernel = Kernel::new(
        config,
        clock,
        store,
        Arc::new(ScriptedChat::new([ScriptedChat::finish("done")])),
    );
    (Arc::new(Gateway::new(kernel)), dir)
}

async fn call(
    gateway: &Gateway<FakeClock>,
    conn: &mut ConnState,
    kind: &str,
    payload: Value,
) -> Result<Value, KernelError> {
    dispatch(
        gateway,
        conn,
        Frame {
            kind: kind.to_string(),
            id: None,
            payload,
        },
    )
    .await
}

async fn register(
    gateway: &Gateway<FakeClock>,
    username: &str,
) -> (ConnState, Value) {
    let mut conn = ConnState::default();
    let data = call(
        gateway,
        &mut conn,
        "auth.register",
        json!({"username": username, "password": "long-enough-pw", "displayName": username}),
    )
    .await
    .unwrap();
    (conn, data)
}

#[tokio::test]
async fn unknown_commands_are_typed() {
    let (gateway, _dir) = build_gateway();
    let mut conn = ConnState::default();
    let err = call(&gateway, &mut conn, "warp.speed", json!({}))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::UnknownCommand);
}

#[tokio::test]
async fn commands_require_authentication() {
    let (gateway, _dir) = build_gateway();
    let mut conn = ConnState::default();
    let err = call(&gateway, &mut conn, "process.list", json!({}))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::Unauthenticated);
}

#[tokio::test]
async fn register_binds_the_connection_identity() {
    let (gateway, _dir) = build_gateway();
    let (mut conn, data) = register(&gateway, "alice").await;
    assert!(data["token"].is_string());
    assert_eq!(data["user"]["role"], "admin");

    let who = call(&gateway, &mut conn, "auth.whoami", json!({}))
        .await
        .unwrap();
    assert_eq!(who["role"], "admin");
}

#[tokio::test]
async fn auth_frame_restores_identity_from_token() {
    let (gateway, _dir) = build_gateway();
    let (_conn, data) = register(&gateway, "alice").await;
    let token = data["token"].as_str().unwrap();

    let mut fresh = ConnState::default();
    let restored = call(&gateway, &mut fresh, "auth", json!({"token": token}))
        .await
        .unwrap();
    assert_eq!(restored["user"]["username"], "alice");
    assert!(fresh.subject.is_some());
}

#[tokio::test]
async fn spawn_returns_a_pid_and_lists_scope_by_owner() {
    let (gateway, _dir) = build_gateway();
    let (mut alice, _) = register(&gateway, "alice").await;
    let (mut bob, _) = register(&gateway, "bob").await;

    let spawned = call(
        &gateway,
        &mut bob,
        "process.spawn",
        json!({"role": "Researcher", "goal": "say hi", "maxSteps": 1}),
    )
    .await
    .unwrap();
    assert_eq!(spawned["pid"], 1);

    // Bob sees his process; a fresh non-owner admin sees everything.
    let bobs = call(&gateway, &mut bob, "process.list", json!({}))
        .await
        .unwrap();
    assert_eq!(bobs["processes"].as_array().unwrap().len(), 1);

    let alices = call(&gateway, &mut alice, "process.list", json!({}))
        .await
        .unwrap();
    assert_eq!(alices["processes"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn history_survives_after_the_run_finishes() {
    let (gateway, _dir) = build_gateway();
    let (mut alice, _) = register(&gateway, "alice").await;

    let spawned = call(
        &gateway,
        &mut alice,
        "process.spawn",
        json!({"role": "Researcher", "goal": "say hi", "maxSteps": 1}),
    )
    .await
    .unwrap();
    let pid = spawned["pid"].as_i64().unwrap();

    // Let the scripted run complete.
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    let history = call(&gateway, &mut alice, "process.history", json!({}))
        .await
        .unwrap();
    let rows = history["processes"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["pid"].as_i64().unwrap(), pid);
    assert_eq!(rows[0]["exit_code"], 0);
}

#[tokio::test]
async fn policy_deny_blocks_even_owned_resources() {
    let (gateway, _dir) = build_gateway();
    let (mut alice, _) = register(&gateway, "alice").await; // admin
    let (mut bob, bob_data) = register(&gateway, "bob").await;
    let bob_uid = bob_data["user"]["uid"].as_str().unwrap().to_string();

    // Bob can normally kill his own process.
    let spawned = call(
        &gateway,
        &mut bob,
        "process.spawn",
        json!({"role": "Researcher", "goal": "wait", "maxSteps": 1}),
    )
    .await
    .unwrap();
    let pid = spawned["pid"].as_i64().unwrap();

    call(
        &gateway,
        &mut alice,
        "policy.create",
        json!({
            "subject": format!("user:{bob_uid}"),
            "action": "process.kill",
            "resource": "*",
            "effect": "deny",
        }),
    )
    .await
    .unwrap();

    let err = call(&gateway, &mut bob, "process.kill", json!({"pid": pid}))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::Forbidden);

    // The admin is not subject to bob's deny.
    let result = call(&gateway, &mut alice, "process.kill", json!({"pid": pid})).await;
    // The run may already have exited on its own; both outcomes are
    // legal, but never a Forbidden.
    if let Err(err) = result {
        assert_ne!(err.code, ErrorCode::Forbidden);
    }
}

#[tokio::test]
async fn non_admins_cannot_touch_admin_surfaces() {
    let (gateway, _dir) = build_gateway();
    let (_alice, _) = register(&gateway, "alice").await;
    let (mut bob, _) = register(&gateway, "bob").await;

    for (kind, payload) in [
        ("user.list", json!({})),
        ("policy.list", json!({})),
        ("audit.query", json!({})),
        ("org.create", json!({"name": "acme"})),
    ] {
        let err = call(&gateway, &mut bob, kind, payload).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden, "{kind}");
    }
}

#[tokio::test]
async fn subscriptions_are_tracked_per_connection() {
    let (gateway, _dir) = build_gateway();
    let (mut alice, _) = register(&gateway, "alice").await;

    call(&gateway, &mut alice, "sub", json!({"topic": "agent.*"}))
        .await
        .unwrap();
    call(&gateway, &mut alice, "sub", json!({"topic": "process.exit"}))
        .await
        .unwrap();
    assert_eq!(alice.patterns.len(), 2);

    call(&gateway, &mut alice, "unsub", json!({"topic": "agent.*"}))
        .await
        .unwrap();
    assert_eq!(alice.patterns.len(), 1);
}

#[tokio::test]
async fn event_forwarding_respects_ownership() {
    let (gateway, _dir) = build_gateway();
    let (mut alice, _) = register(&gateway, "alice").await; // admin
    let (mut bob, bob_data) = register(&gateway, "bob").await;
    let bob_uid = bob_data["user"]["uid"].as_str().unwrap();

    for conn in [&mut alice, &mut bob] {
        call(&gateway, conn, "sub", json!({"topic": "fs.*"}))
            .await
            .unwrap();
    }

    let event = Event::FsChanged {
        uid: aether_core::Uid::new(bob_uid),
        path: format!("{bob_uid}/a.txt"),
        change: "write".to_string(),
        size: 1,
    };
    // Bob owns the event; the admin may observe everything; a third
    // user may not.
    assert!(should_forward(&gateway, &bob, &event));
    assert!(should_forward(&gateway, &alice, &event));

    let (mut carol, _) = register(&gateway, "carol").await;
    call(&gateway, &mut carol, "sub", json!({"topic": "fs.*"}))
        .await
        .unwrap();
    assert!(!should_forward(&gateway, &carol, &event));
}

#[tokio::test]
async fn kv_round_trips_through_commands() {
    let (gateway, _dir) = build_gateway();
    let (mut alice, _) = register(&gateway, "alice").await;

    call(
        &gateway,
        &mut alice,
        "kv.set",
        json!({"key": "ui.theme", "value": {"dark": true}}),
    )
    .await
    .unwrap();

    let got = call(&gateway, &mut alice, "kv.get", json!({"key": "ui.theme"}))
        .await
        .unwrap();
    assert_eq!(got["entry"]["value"]["dark"], true);
}

#[tokio::test]
async fn mem_commands_round_trip_and_scope() {
    let (gateway, _dir) = build_gateway();
    let (mut alice, _) = register(&gateway, "alice").await;
    let (mut bob, _) = register(&gateway, "bob").await;

    let put = call(
        &gateway,
        &mut bob,
        "mem.put",
        json!({"layer": "semantic", "content": "favorite color is teal"}),
    )
    .await
    .unwrap();
    let memory_id = put["memory"]["id"].as_str().unwrap().to_string();

    let found = call(
        &gateway,
        &mut bob,
        "mem.search",
        json!({"query": "favorite color"}),
    )
    .await
    .unwrap();
    assert_eq!(found["memories"].as_array().unwrap().len(), 1);

    // Search is scoped to the caller: alice sees nothing.
    let empty = call(
        &gateway,
        &mut alice,
        "mem.search",
        json!({"query": "favorite color"}),
    )
    .await
    .unwrap();
    assert!(empty["memories"].as_array().unwrap().is_empty());

    let got = call(&gateway, &mut bob, "mem.get", json!({"id": memory_id}))
        .await
        .unwrap();
    assert_eq!(got["memory"]["content"], "favorite color is teal");

    call(&gateway, &mut bob, "mem.delete", json!({"id": memory_id}))
        .await
        .unwrap();
    let err = call(&gateway, &mut bob, "mem.get", json!({"id": memory_id}))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::NotFound);
}

#[tokio::test]
async fn browser_commands_are_acknowledged_opaquely() {
    let (gateway, _dir) = build_gateway();
    let (mut alice, _) = register(&gateway, "alice").await;
    let data = call(&gateway, &mut alice, "browser:click", json!({"x": 1, "y": 2}))
        .await
        .unwrap();
    assert_eq!(data["forwarded"], false);
}
