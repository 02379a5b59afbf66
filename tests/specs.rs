// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace-level scenario tests
//!
//! End-to-end seeded scenarios exercising the kernel the way a client
//! would: spawn-and-exit, scheduler windows, auth with MFA, policy
//! denies, and webhook dead-lettering. Time is driven by a fake clock
//! and reasoning by a scripted chat step, so every run is
//! deterministic.

use aether_core::test_support::agent_config;
use aether_core::{
    Clock, CronId, CronJob, CronSchedule, ErrorCode, Event, EventTrigger, FakeClock, Pid,
    ProcState, TriggerId, Uid, Webhook, WebhookId,
};
use aether_kernel::{
    AgentSpawner, ChatStep, CronDriver, Kernel, KernelConfig, QueueSubscriber, ScriptedChat,
    TriggerDriver,
};
use aether_store::StateStore;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

/// 2024-01-15 10:00:05 UTC - the reference instant for cron windows.
const T0: u64 = 1_705_312_805_000;

struct Harness {
    kernel: Arc<Kernel<FakeClock>>,
    clock: FakeClock,
    _dir: tempfile::TempDir,
}

fn harness(chat: Arc<dyn ChatStep>) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(StateStore::open_in_memory().unwrap());
    let clock = FakeClock::new();
    clock.set_epoch_ms(T0);
    let config = KernelConfig {
        home_dir: dir.path().join("home"),
        snapshot_dir: dir.path().join("snapshots"),
        ..KernelConfig::default()
    };
    let kernel = Kernel::new(config, clock.clone(), store, chat);
    Harness {
        kernel,
        clock,
        _dir: dir,
    }
}

async fn await_exit(sub: &mut QueueSubscriber, pid: Pid) -> i32 {
    loop {
        let event = tokio::time::timeout(Duration::from_secs(2), sub.recv())
            .await
            .expect("timed out waiting for process.exit")
            .expect("bus closed");
        if let Event::ProcessExit { pid: got, code, .. } = event {
            if got == pid {
                return code;
            }
        }
    }
}

// ── Scenario 1: spawn-and-exit ──────────────────────────────────────────────

#[tokio::test]
async fn spawn_and_exit_lifecycle() {
    let h = harness(Arc::new(ScriptedChat::new([
        ScriptedChat::act("saying hi", "send_message", json!({"message": "hi"})),
        ScriptedChat::finish("greeted"),
    ])));

    let mut all = h.kernel.bus.subscribe_queue("*");
    let mut exits = h.kernel.bus.subscribe_queue("process.exit");

    let info = h
        .kernel
        .spawn_process(&Uid::new("u-alice"), &agent_config("Researcher", "say hi"))
        .unwrap();
    let pid = info.pid;

    assert_eq!(await_exit(&mut exits, pid).await, 0);

    // The full reasoning cycle was observable on the bus.
    let topics: Vec<&'static str> = all.drain().iter().map(|e| e.topic()).collect();
    for expected in [
        "process.spawned",
        "process.stateChange",
        "agent.thought",
        "agent.action",
        "agent.observation",
        "process.exit",
    ] {
        assert!(topics.contains(&expected), "missing {expected}");
    }

    // Zombie until the grace period, then reaped; history survives.
    assert_eq!(h.kernel.table.get(pid).unwrap().state, ProcState::Zombie);
    h.clock.advance(Duration::from_secs(61));
    let reaped = h.kernel.table.reap_once(60_000);
    assert_eq!(reaped, vec![pid]);
    assert!(h.kernel.table.get(pid).is_none());

    let history = h.kernel.store.list_process_history(None, 10).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].pid, pid);
    assert_eq!(history[0].exit_code, Some(0));
}

// ── Scenario 2: trigger cooldown ────────────────────────────────────────────

#[tokio::test]
async fn trigger_cooldown_window() {
    let h = harness(Arc::new(ScriptedChat::new([])));
    let driver = TriggerDriver::new(
        Arc::clone(&h.kernel.store),
        h.kernel.bus.clone(),
        Arc::clone(&h.kernel) as Arc<dyn AgentSpawner>,
        h.clock.clone(),
    );

    h.kernel
        .store
        .insert_trigger(&EventTrigger {
            id: TriggerId::new("t-1"),
            name: "on-thought".to_string(),
            event_type: "agent.thought".to_string(),
            event_filter: None,
            agent_config: agent_config("Watcher", "react"),
            enabled: true,
            owner_uid: Uid::new("u-alice"),
            cooldown_ms: 500,
            last_fired_ms: None,
            fire_count: 0,
            created_at_ms: T0,
        })
        .unwrap();

    let thought = |content: &str| Event::AgentThought {
        pid: Pid(999),
        step: 0,
        content: content.to_string(),
    };

    // Two thoughts 100 ms apart: exactly one spawn.
    driver.handle(&thought("a"));
    h.clock.advance(Duration::from_millis(100));
    driver.handle(&thought("b"));
    let fired = h
        .kernel
        .store
        .get_trigger(&TriggerId::new("t-1"))
        .unwrap()
        .unwrap();
    assert_eq!(fired.fire_count, 1);

    // A third at 700 ms: the second spawn happens.
    h.clock.advance(Duration::from_millis(600));
    driver.handle(&thought("c"));
    let fired = h
        .kernel
        .store
        .get_trigger(&TriggerId::new("t-1"))
        .unwrap()
        .unwrap();
    assert_eq!(fired.fire_count, 2);

    // Firings are spaced by at least the cooldown.
    assert!(fired.last_fired_ms.unwrap() - T0 >= 500);
}

// ── Scenario 3: cron tick ───────────────────────────────────────────────────

#[tokio::test]
async fn cron_tick_fires_on_the_minute() {
    let h = harness(Arc::new(ScriptedChat::new([])));
    let driver = CronDriver::new(
        Arc::clone(&h.kernel.store),
        h.kernel.bus.clone(),
        Arc::clone(&h.kernel) as Arc<dyn AgentSpawner>,
        h.clock.clone(),
        Default::default(),
    );

    // Created at 10:00:05 - nextRun lands on 10:01:00.
    let schedule = CronSchedule::parse("* * * * *").unwrap();
    let next = schedule.next_after(T0).unwrap();
    assert_eq!(next, T0 - 5_000 + 60_000);

    h.kernel
        .store
        .insert_cron_job(&CronJob {
            id: CronId::new("c-1"),
            name: "minutely".to_string(),
            cron_expression: "* * * * *".to_string(),
            agent_config: agent_config("Researcher", "tick"),
            enabled: true,
            owner_uid: Uid::new("u-alice"),
            last_run_ms: None,
            next_run_ms: next,
            run_count: 0,
            created_at_ms: T0,
        })
        .unwrap();

    // 10:00:06 - nothing due.
    h.clock.advance(Duration::from_secs(1));
    driver.tick();
    let job = h.kernel.store.get_cron_job(&CronId::new("c-1")).unwrap().unwrap();
    assert_eq!(job.run_count, 0);

    // 10:01:01 - exactly one spawn.
    h.clock.set_epoch_ms(T0 + 56_000);
    driver.tick();
    driver.tick();
    let job = h.kernel.store.get_cron_job(&CronId::new("c-1")).unwrap().unwrap();
    assert_eq!(job.run_count, 1);
    assert_eq!(job.last_run_ms, Some(T0 + 56_000));
    assert_eq!(job.next_run_ms, T0 - 5_000 + 120_000);
    assert_eq!(h.kernel.store.list_process_history(None, 10).unwrap().len(), 1);
}

// ── Scenario 4: auth flow with MFA ──────────────────────────────────────────

#[tokio::test]
async fn auth_flow_with_mfa() {
    let h = harness(Arc::new(ScriptedChat::new([])));
    let auth = &h.kernel.auth;

    let session = auth.register("alice", "pw-is-long-enough", "Alice").unwrap();
    assert!(auth.verify_token(&session.token).is_ok());

    // Wrong password.
    let err = auth.login("alice", "wrong-password", None).unwrap_err();
    assert_eq!(err.code, ErrorCode::Unauthenticated);

    // Enable MFA.
    let secret = auth.mfa_setup(&session.user.uid).unwrap();
    let code = totp_now(&secret, h.clock.epoch_ms());
    auth.mfa_verify(&session.user.uid, &code).unwrap();

    // Right password but no code: mfa_required.
    let err = auth.login("alice", "pw-is-long-enough", None).unwrap_err();
    assert_eq!(err.code, ErrorCode::Unauthenticated);
    assert_eq!(err.message, "mfa_required");

    // A bogus code is rejected.
    let err = auth
        .login("alice", "pw-is-long-enough", Some("000001"))
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::Unauthenticated);

    // Password plus a valid TOTP: token issued.
    let code = totp_now(&secret, h.clock.epoch_ms());
    let session = auth
        .login("alice", "pw-is-long-enough", Some(&code))
        .unwrap();
    assert!(auth.verify_token(&session.token).is_ok());
}

/// Compute the RFC 6238 code an authenticator app would show, using
/// the same primitives as the service.
fn totp_now(secret_base32: &str, epoch_ms: u64) -> String {
    use hmac::{Hmac, Mac};

    let secret =
        base32::decode(base32::Alphabet::Rfc4648 { padding: false }, secret_base32).unwrap();
    let counter = epoch_ms / 1000 / 30;

    let mut mac = Hmac::<sha1::Sha1>::new_from_slice(&secret).unwrap();
    mac.update(&counter.to_be_bytes());
    let digest = mac.finalize().into_bytes();
    let offset = (digest[19] & 0x0f) as usize;
    let binary = ((digest[offset] & 0x7f) as u32) << 24
        | (digest[offset + 1] as u32) << 16
        | (digest[offset + 2] as u32) << 8
        | digest[offset + 3] as u32;
    format!("{:06}", binary % 1_000_000)
}

// ── Scenario 5: policy deny overrides ownership ─────────────────────────────

#[tokio::test]
async fn policy_deny_overrides_ownership() {
    let h = harness(Arc::new(ScriptedChat::new([])));

    let alice = h.kernel.auth.register("alice", "pw-is-long-enough", "Alice").unwrap();
    let bob = h.kernel.auth.register("bob", "pw-is-long-enough", "Bob").unwrap();

    h.kernel
        .store
        .insert_policy(&aether_core::PermissionPolicy {
            id: aether_core::PolicyId::new("pol-1"),
            subject: format!("user:{}", bob.user.uid),
            action: "process.kill".to_string(),
            resource: "*".to_string(),
            effect: aether_core::Effect::Deny,
            created_at_ms: T0,
            created_by: Some(alice.user.uid.clone()),
        })
        .unwrap();

    let bob_subject = h.kernel.subject_for(&bob.user.uid);
    let alice_subject = h.kernel.subject_for(&alice.user.uid);

    // Bob is denied even on a process he owns.
    assert!(!h
        .kernel
        .policy
        .can(&bob_subject, "process.kill", "process/1", Some(&bob.user.uid)));
    // The admin still may.
    assert!(h
        .kernel
        .policy
        .can(&alice_subject, "process.kill", "process/1", Some(&bob.user.uid)));
}

// ── Scenario 6: webhook dead-lettering ──────────────────────────────────────

#[tokio::test]
async fn webhook_retries_then_dead_letters() {
    let h = harness(Arc::new(ScriptedChat::new([])));
    let dispatcher = h.kernel.webhook_dispatcher();

    h.kernel
        .store
        .insert_webhook(&Webhook {
            id: WebhookId::new("w-1"),
            url: "http://127.0.0.1:9/hook".to_string(),
            secret: Some("shh".to_string()),
            events: ["process.exit".to_string()].into_iter().collect(),
            filter: None,
            headers: Default::default(),
            enabled: true,
            owner_uid: Uid::new("u-alice"),
            retry_count: 2,
            timeout_ms: 100,
            failure_count: 0,
            created_at_ms: T0,
        })
        .unwrap();

    dispatcher
        .handle(&Event::ProcessExit {
            pid: Pid(5),
            code: 0,
            reason: "done".to_string(),
        })
        .await;

    let logs = h.kernel.store.webhook_logs(&WebhookId::new("w-1"), 10).unwrap();
    assert_eq!(logs.len(), 2);
    assert!(logs.iter().all(|l| !l.success));

    let dlq = h.kernel.store.list_dlq(10).unwrap();
    assert_eq!(dlq.len(), 1);
    assert_eq!(dlq[0].attempts, 2);
}
