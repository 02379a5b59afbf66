// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::config::BusConfig;
use aether_core::{PermissionPolicy, PolicyId, Role};
use serde_json::json;

struct Fixture {
    host: ToolHost,
    ctx: ToolCtx,
    store: Arc<StateStore>,
    _home: tempfile::TempDir,
}

fn fixture() -> Fixture {
    let store = Arc::new(StateStore::open_in_memory().unwrap());
    let policy = Arc::new(PolicyEngine::new(Arc::clone(&store)));
    let host = ToolHost::new(policy, Duration::from_millis(500));
    super::register_builtins(&host);

    let home = tempfile::tempdir().unwrap();
    let bus = EventBus::new(&BusConfig::default());
    let ctx = ToolCtx {
        pid: Pid(1),
        uid: Uid::new("u-alice"),
        home: home.path().to_path_buf(),
        store: Arc::clone(&store),
        bus,
        now_ms: 1_000_000,
        memory_cap: 16,
    };
    Fixture {
        host,
        ctx,
        store,
        _home: home,
    }
}

fn subject() -> Subject {
    Subject::new("u-alice", Role::User)
}

fn call(name: &str, args: serde_json::Value) -> ToolCall {
    ToolCall {
        name: name.to_string(),
        args,
    }
}

#[tokio::test]
async fn fs_write_then_read_round_trips() {
    let f = fixture();
    let written = f
        .host
        .dispatch(
            &subject(),
            &f.ctx,
            &call("fs_write", json!({"path": "notes/a.txt", "content": "hello"})),
        )
        .await
        .unwrap();
    assert_eq!(written["size"], 5);

    let read = f
        .host
        .dispatch(
            &subject(),
            &f.ctx,
            &call("fs_read", json!({"path": "notes/a.txt"})),
        )
        .await
        .unwrap();
    assert_eq!(read["content"], "hello");
}

#[tokio::test]
async fn paths_cannot_escape_the_home() {
    let f = fixture();
    for bad in ["../outside.txt", "/etc/passwd", "a/../../b"] {
        let err = f
            .host
            .dispatch(
                &subject(),
                &f.ctx,
                &call("fs_write", json!({"path": bad, "content": "x"})),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgs(_)), "{bad}");
    }
}

#[tokio::test]
async fn unknown_tool_is_reported() {
    let f = fixture();
    let err = f
        .host
        .dispatch(&subject(), &f.ctx, &call("teleport", json!({})))
        .await
        .unwrap_err();
    assert!(matches!(err, ToolError::NotFound(_)));
}

#[tokio::test]
async fn missing_required_args_are_rejected_before_execution() {
    let f = fixture();
    let err = f
        .host
        .dispatch(&subject(), &f.ctx, &call("fs_write", json!({"path": "a"})))
        .await
        .unwrap_err();
    assert!(matches!(err, ToolError::InvalidArgs(_)));
}

#[tokio::test]
async fn policy_deny_blocks_dispatch() {
    let f = fixture();
    f.store
        .insert_policy(&PermissionPolicy {
            id: PolicyId::new("pol-1"),
            subject: "user:u-alice".to_string(),
            action: "fs.write".to_string(),
            resource: "*".to_string(),
            effect: aether_core::Effect::Deny,
            created_at_ms: 0,
            created_by: None,
        })
        .unwrap();

    let err = f
        .host
        .dispatch(
            &subject(),
            &f.ctx,
            &call("fs_write", json!({"path": "a.txt", "content": "x"})),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ToolError::Forbidden(_)));

    // Reads stay allowed.
    f.host
        .dispatch(&subject(), &f.ctx, &call("fs_list", json!({})))
        .await
        .unwrap();
}

struct SlowTool;

#[async_trait::async_trait]
impl Tool for SlowTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "slow".to_string(),
            description: "sleeps past the deadline".to_string(),
            required: vec![],
            action: "test.slow".to_string(),
        }
    }

    async fn call(
        &self,
        _ctx: &ToolCtx,
        _args: &serde_json::Value,
    ) -> Result<serde_json::Value, ToolError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(serde_json::Value::Null)
    }
}

#[tokio::test(start_paused = true)]
async fn handlers_are_cut_off_at_the_timeout() {
    let f = fixture();
    f.host.register(Arc::new(SlowTool));

    let err = f
        .host
        .dispatch(&subject(), &f.ctx, &call("slow", json!({})))
        .await
        .unwrap_err();
    assert!(matches!(err, ToolError::Timeout(500)));
}

#[tokio::test]
async fn memory_tools_round_trip() {
    let f = fixture();
    f.host
        .dispatch(
            &subject(),
            &f.ctx,
            &call(
                "memory_put",
                json!({"layer": "semantic", "content": "the sky is blue", "importance": 0.9}),
            ),
        )
        .await
        .unwrap();

    let found = f
        .host
        .dispatch(
            &subject(),
            &f.ctx,
            &call("memory_search", json!({"query": "sky"})),
        )
        .await
        .unwrap();
    let memories = found["memories"].as_array().unwrap();
    assert_eq!(memories.len(), 1);
    assert_eq!(memories[0]["content"], "the sky is blue");
}

#[tokio::test]
async fn run_command_captures_output() {
    let f = fixture();
    let out = f
        .host
        .dispatch(
            &subject(),
            &f.ctx,
            &call("run_command", json!({"command": "echo kernel"})),
        )
        .await
        .unwrap();
    assert_eq!(out["exit_code"], 0);
    assert_eq!(out["stdout"].as_str().unwrap().trim(), "kernel");
}
