// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command gateway for the admin WebSocket.
//!
//! Each connection runs as a spawned task: incoming frames dispatch to
//! command handlers, subscribed events stream back out, and the two
//! directions interleave in one select loop. Commands on a connection
//! are answered in receive order.

pub(crate) mod commands;

use crate::protocol::{render_bad_frame, render_response, Frame};
use aether_core::{Clock, ErrorCode, Event, KernelError, Pid, TopicPattern, Uid};
use aether_kernel::webhook::WebhookDispatcher;
use aether_kernel::{Kernel, Subject};
use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Shared gateway context handed to every connection task.
pub struct Gateway<C: Clock> {
    pub kernel: Arc<Kernel<C>>,
    pub dispatcher: WebhookDispatcher<C>,
}

impl<C: Clock> Gateway<C> {
    pub fn new(kernel: Arc<Kernel<C>>) -> Self {
        let dispatcher = kernel.webhook_dispatcher();
        Self { kernel, dispatcher }
    }
}

/// Per-connection mutable state.
#[derive(Default)]
pub struct ConnState {
    pub subject: Option<Subject>,
    pub token: Option<String>,
    pub patterns: Vec<TopicPattern>,
}

impl ConnState {
    pub fn require_auth(&self) -> Result<Subject, KernelError> {
        self.subject
            .clone()
            .ok_or_else(|| KernelError::unauthenticated("authenticate first"))
    }
}

/// Drive one WebSocket connection until it closes.
pub async fn handle_socket<C: Clock>(socket: WebSocket, gateway: Arc<Gateway<C>>) {
    let (mut sink, mut stream) = socket.split();
    let mut conn = ConnState::default();
    let mut events = gateway.kernel.bus.subscribe_queue("*");

    loop {
        tokio::select! {
            incoming = stream.next() => {
                let Some(Ok(message)) = incoming else { break };
                let text = match message {
                    Message::Text(text) => text.to_string(),
                    Message::Close(_) => break,
                    // Pings are answered by axum; other binary noise is ignored.
                    _ => continue,
                };

                let frame = match Frame::parse(&text) {
                    Ok(frame) => frame,
                    Err(e) => {
                        // One reply, then disconnect.
                        let _ = sink.send(Message::Text(render_bad_frame(&e.to_string()).into())).await;
                        break;
                    }
                };

                let id = frame.id.clone();
                let result = dispatch(&gateway, &mut conn, frame).await;
                let reply = render_response(id.as_deref(), result);
                if sink.send(Message::Text(reply.into())).await.is_err() {
                    break;
                }
            }

            event = events.recv() => {
                match event {
                    Some(event) => {
                        if !should_forward(&gateway, &conn, &event) {
                            continue;
                        }
                        let Ok(text) = serde_json::to_string(&event) else { continue };
                        if sink.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    // Closed for refusing a critical event: the client
                    // must reconnect and re-subscribe.
                    None => {
                        warn!("subscriber queue closed, disconnecting client");
                        break;
                    }
                }
            }
        }
    }

    debug!("connection closed");
}

/// Whether this connection subscribed to (and may observe) an event.
fn should_forward<C: Clock>(gateway: &Gateway<C>, conn: &ConnState, event: &Event) -> bool {
    // Lag sentinels bypass topic filters: the subscriber must learn it
    // missed something no matter what it asked for.
    if matches!(event, Event::SubscriberLagged { .. }) {
        return !conn.patterns.is_empty();
    }

    let topic = event.topic();
    if !conn.patterns.iter().any(|p| p.matches(topic)) {
        return false;
    }

    let Some(subject) = &conn.subject else {
        return false;
    };
    let owner = event_owner(gateway, event);
    gateway.kernel.policy.can_observe(subject, owner.as_ref())
}

/// Resolve an event's owning user, consulting the process table for
/// pid-only events.
fn event_owner<C: Clock>(gateway: &Gateway<C>, event: &Event) -> Option<Uid> {
    if let Some(uid) = event.owner() {
        return Some(uid.clone());
    }
    let pid = event.pid()?;
    process_owner(&gateway.kernel, pid).ok()
}

/// Owner lookup that works for live and reaped processes.
pub(crate) fn process_owner<C: Clock>(kernel: &Kernel<C>, pid: Pid) -> Result<Uid, KernelError> {
    if let Some(info) = kernel.table.get(pid) {
        return Ok(info.uid);
    }
    kernel
        .store
        .get_process(pid)
        .map_err(KernelError::internal)?
        .map(|info| info.uid)
        .ok_or_else(|| KernelError::not_found(format!("process {pid}")))
}

/// Route one parsed frame to its handler.
pub async fn dispatch<C: Clock>(
    gateway: &Gateway<C>,
    conn: &mut ConnState,
    frame: Frame,
) -> Result<Value, KernelError> {
    let kind = frame.kind.as_str();
    let payload = &frame.payload;

    match kind {
        // -- connection management --
        "auth" => commands::auth::handle_auth_frame(gateway, conn, payload),
        "sub" => {
            conn.require_auth()?;
            let topic = req_str(payload, "topic")?;
            let pattern = TopicPattern::new(topic);
            if !conn.patterns.contains(&pattern) {
                conn.patterns.push(pattern);
            }
            Ok(Value::Null)
        }
        "unsub" => {
            let topic = req_str(payload, "topic")?;
            conn.patterns.retain(|p| p.as_str() != topic);
            Ok(Value::Null)
        }

        // -- auth --
        "auth.register" => commands::auth::register(gateway, conn, payload),
        "auth.login" => commands::auth::login(gateway, conn, payload),
        "auth.logout" => commands::auth::logout(gateway, conn),
        "auth.whoami" => commands::auth::whoami(conn),
        "auth.mfa.setup" => commands::auth::mfa_setup(gateway, conn),
        "auth.mfa.verify" => commands::auth::mfa_verify(gateway, conn, payload),

        // -- process / agent --
        "process.spawn" => commands::process::spawn(gateway, conn, payload),
        "process.kill" => commands::process::kill(gateway, conn, payload),
        "process.list" => commands::process::list(gateway, conn),
        "process.get" => commands::process::get(gateway, conn, payload),
        "process.history" => commands::process::history(gateway, conn, payload),
        "agent.pause" => commands::process::pause(gateway, conn, payload),
        "agent.resume" => commands::process::resume(gateway, conn, payload),
        "agent.message" => commands::process::message(gateway, conn, payload),
        "agent.history" => commands::process::agent_history(gateway, conn, payload),
        "agent.prune" => commands::process::agent_prune(gateway, conn, payload),
        "agent.feedback" => commands::process::feedback(gateway, conn, payload),
        "agent.reflections" => commands::process::reflections(gateway, conn, payload),

        // -- filesystem --
        "fs.ls" => commands::fs::ls(gateway, conn, payload),
        "fs.read" => commands::fs::read(gateway, conn, payload),
        "fs.write" => commands::fs::write(gateway, conn, payload),

        // -- memory / plan / kv / snapshot --
        "mem.put" => commands::resources::mem_put(gateway, conn, payload),
        "mem.get" => commands::resources::mem_get(gateway, conn, payload),
        "mem.search" => commands::resources::mem_search(gateway, conn, payload),
        "mem.delete" => commands::resources::mem_delete(gateway, conn, payload),
        "plan.get" => commands::resources::plan_get(gateway, conn, payload),
        "plan.update" => commands::resources::plan_update(gateway, conn, payload),
        "kv.get" => commands::resources::kv_get(gateway, conn, payload),
        "kv.set" => commands::resources::kv_set(gateway, conn, payload),
        "kv.delete" => commands::resources::kv_delete(gateway, conn, payload),
        "snapshot.create" => commands::resources::snapshot_create(gateway, conn, payload),
        "snapshot.list" => commands::resources::snapshot_list(gateway, conn, payload),
        "snapshot.delete" => commands::resources::snapshot_delete(gateway, conn, payload),

        // -- schedulers --
        "cron.create" => commands::schedules::cron_create(gateway, conn, payload),
        "cron.list" => commands::schedules::cron_list(gateway, conn),
        "cron.toggle" => commands::schedules::cron_toggle(gateway, conn, payload),
        "cron.delete" => commands::schedules::cron_delete(gateway, conn, payload),
        "trigger.create" => commands::schedules::trigger_create(gateway, conn, payload),
        "trigger.list" => commands::schedules::trigger_list(gateway, conn),
        "trigger.toggle" => commands::schedules::trigger_toggle(gateway, conn, payload),
        "trigger.delete" => commands::schedules::trigger_delete(gateway, conn, payload),

        // -- webhooks --
        "webhook.create" => commands::webhooks::create(gateway, conn, payload),
        "webhook.list" => commands::webhooks::list(gateway, conn),
        "webhook.delete" => commands::webhooks::delete(gateway, conn, payload),
        "webhook.test" => commands::webhooks::test(gateway, conn, payload).await,
        "dlq.list" => commands::webhooks::dlq_list(gateway, conn),
        "dlq.retry" => commands::webhooks::dlq_retry(gateway, conn, payload).await,
        "dlq.delete" => commands::webhooks::dlq_delete(gateway, conn, payload),
        "hook.create" => commands::webhooks::hook_create(gateway, conn, payload),
        "hook.list" => commands::webhooks::hook_list(gateway, conn),
        "hook.delete" => commands::webhooks::hook_delete(gateway, conn, payload),

        // -- admin --
        "metrics.query" => commands::admin::metrics_query(gateway, conn, payload),
        "user.list" => commands::admin::user_list(gateway, conn),
        "user.delete" => commands::admin::user_delete(gateway, conn, payload),
        "org.create" => commands::admin::org_create(gateway, conn, payload),
        "org.list" => commands::admin::org_list(gateway, conn),
        "org.delete" => commands::admin::org_delete(gateway, conn, payload),
        "org.addMember" => commands::admin::org_add_member(gateway, conn, payload),
        "team.create" => commands::admin::team_create(gateway, conn, payload),
        "team.list" => commands::admin::team_list(gateway, conn, payload),
        "team.addMember" => commands::admin::team_add_member(gateway, conn, payload),
        "policy.create" => commands::admin::policy_create(gateway, conn, payload),
        "policy.list" => commands::admin::policy_list(gateway, conn),
        "policy.delete" => commands::admin::policy_delete(gateway, conn, payload),
        "audit.query" => commands::admin::audit_query(gateway, conn, payload),
        "cluster.info" => commands::admin::cluster_info(gateway, conn),

        // -- sandbox passthrough --
        // The sandbox broker is an external collaborator; input events
        // are acknowledged and forwarded fire-and-forget when present.
        kind if kind.starts_with("browser:") => {
            conn.require_auth()?;
            debug!(command = kind, "sandbox passthrough (no broker attached)");
            Ok(serde_json::json!({ "forwarded": false }))
        }

        _ => Err(KernelError::new(
            ErrorCode::UnknownCommand,
            format!("unknown command '{kind}'"),
        )),
    }
}

// -- payload extraction helpers --

pub(crate) fn req_str<'a>(payload: &'a Value, key: &str) -> Result<&'a str, KernelError> {
    payload
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| KernelError::invalid_args(format!("'{key}' must be a string")))
}

pub(crate) fn opt_str<'a>(payload: &'a Value, key: &str) -> Option<&'a str> {
    payload.get(key).and_then(Value::as_str)
}

pub(crate) fn req_pid(payload: &Value) -> Result<Pid, KernelError> {
    payload
        .get("pid")
        .and_then(Value::as_i64)
        .map(Pid)
        .ok_or_else(|| KernelError::invalid_args("'pid' must be an integer"))
}

pub(crate) fn opt_u64(payload: &Value, key: &str) -> Option<u64> {
    payload.get(key).and_then(Value::as_u64)
}

pub(crate) fn limit_arg(payload: &Value, default: usize) -> usize {
    opt_u64(payload, "limit").map(|v| v as usize).unwrap_or(default)
}

/// Authorize `action` on `resource` for this connection's subject.
pub(crate) fn authorize<C: Clock>(
    gateway: &Gateway<C>,
    subject: &Subject,
    action: &str,
    resource: &str,
    owner: Option<&Uid>,
) -> Result<(), KernelError> {
    if gateway.kernel.policy.can(subject, action, resource, owner) {
        Ok(())
    } else {
        Err(KernelError::forbidden(action.to_string()))
    }
}

#[cfg(test)]
#[path = "gateway_tests.rs"]
mod tests;
