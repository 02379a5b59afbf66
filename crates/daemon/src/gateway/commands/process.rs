// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process and agent control commands

use crate::gateway::{
    authorize, limit_arg, process_owner, req_pid, req_str, ConnState, Gateway,
};
use aether_core::{AgentConfig, Clock, KernelError};
use serde_json::{json, Value};

pub fn spawn<C: Clock>(
    gateway: &Gateway<C>,
    conn: &ConnState,
    payload: &Value,
) -> Result<Value, KernelError> {
    let subject = conn.require_auth()?;
    authorize(gateway, &subject, "process.spawn", "process", Some(&subject.uid))?;

    let config: AgentConfig = serde_json::from_value(payload.clone())
        .map_err(|e| KernelError::invalid_args(format!("bad agent config: {e}")))?;
    if config.role.is_empty() || config.goal.is_empty() {
        return Err(KernelError::invalid_args("role and goal are required"));
    }

    let info = gateway.kernel.spawn_process(&subject.uid, &config)?;
    Ok(json!({ "pid": info.pid, "name": info.name }))
}

pub fn kill<C: Clock>(
    gateway: &Gateway<C>,
    conn: &ConnState,
    payload: &Value,
) -> Result<Value, KernelError> {
    let subject = conn.require_auth()?;
    let pid = req_pid(payload)?;
    let owner = process_owner(&gateway.kernel, pid)?;
    authorize(gateway, &subject, "process.kill", &format!("process/{pid}"), Some(&owner))?;

    gateway.kernel.kill_process(pid)?;
    Ok(json!({ "pid": pid, "killed": true }))
}

pub fn list<C: Clock>(gateway: &Gateway<C>, conn: &ConnState) -> Result<Value, KernelError> {
    let subject = conn.require_auth()?;
    let mut processes = gateway.kernel.table.list();
    if !subject.is_admin() {
        processes.retain(|p| p.uid == subject.uid);
    }
    processes.sort_by_key(|p| p.pid);
    Ok(json!({ "processes": processes }))
}

pub fn get<C: Clock>(
    gateway: &Gateway<C>,
    conn: &ConnState,
    payload: &Value,
) -> Result<Value, KernelError> {
    let subject = conn.require_auth()?;
    let pid = req_pid(payload)?;
    let owner = process_owner(&gateway.kernel, pid)?;
    authorize(gateway, &subject, "process.get", &format!("process/{pid}"), Some(&owner))?;

    let info = gateway
        .kernel
        .table
        .get(pid)
        .map(Ok)
        .unwrap_or_else(|| {
            gateway
                .kernel
                .store
                .get_process(pid)
                .map_err(KernelError::internal)?
                .ok_or_else(|| KernelError::not_found(format!("process {pid}")))
        })?;
    Ok(json!({ "process": info }))
}

/// Durable history, including reaped processes.
pub fn history<C: Clock>(
    gateway: &Gateway<C>,
    conn: &ConnState,
    payload: &Value,
) -> Result<Value, KernelError> {
    let subject = conn.require_auth()?;
    let limit = limit_arg(payload, 100);
    let owner = if subject.is_admin() {
        None
    } else {
        Some(&subject.uid)
    };
    let processes = gateway
        .kernel
        .store
        .list_process_history(owner, limit)
        .map_err(KernelError::internal)?;
    Ok(json!({ "processes": processes }))
}

pub fn pause<C: Clock>(
    gateway: &Gateway<C>,
    conn: &ConnState,
    payload: &Value,
) -> Result<Value, KernelError> {
    let subject = conn.require_auth()?;
    let pid = req_pid(payload)?;
    let owner = process_owner(&gateway.kernel, pid)?;
    authorize(gateway, &subject, "agent.pause", &format!("process/{pid}"), Some(&owner))?;

    gateway.kernel.pause_agent(pid)?;
    Ok(json!({ "pid": pid, "paused": true }))
}

pub fn resume<C: Clock>(
    gateway: &Gateway<C>,
    conn: &ConnState,
    payload: &Value,
) -> Result<Value, KernelError> {
    let subject = conn.require_auth()?;
    let pid = req_pid(payload)?;
    let owner = process_owner(&gateway.kernel, pid)?;
    authorize(gateway, &subject, "agent.resume", &format!("process/{pid}"), Some(&owner))?;

    gateway.kernel.resume_agent(pid)?;
    Ok(json!({ "pid": pid, "paused": false }))
}

pub fn message<C: Clock>(
    gateway: &Gateway<C>,
    conn: &ConnState,
    payload: &Value,
) -> Result<Value, KernelError> {
    let subject = conn.require_auth()?;
    let pid = req_pid(payload)?;
    let text = req_str(payload, "text")?;
    let owner = process_owner(&gateway.kernel, pid)?;
    authorize(gateway, &subject, "agent.message", &format!("process/{pid}"), Some(&owner))?;

    gateway.kernel.message_agent(pid, text.to_string())?;
    Ok(json!({ "pid": pid, "queued": true }))
}

/// Drop transcript rows older than a cutoff.
pub fn agent_prune<C: Clock>(
    gateway: &Gateway<C>,
    conn: &ConnState,
    payload: &Value,
) -> Result<Value, KernelError> {
    let subject = conn.require_auth()?;
    authorize(gateway, &subject, "agent.prune", "agent_logs", None)?;
    let before_ms = payload
        .get("beforeMs")
        .and_then(Value::as_u64)
        .ok_or_else(|| KernelError::invalid_args("'beforeMs' must be a timestamp"))?;
    let pruned = gateway
        .kernel
        .store
        .prune_agent_logs_before(before_ms)
        .map_err(KernelError::internal)?;
    Ok(json!({ "pruned": pruned }))
}

/// Attach user feedback to a finished run.
pub fn feedback<C: Clock>(
    gateway: &Gateway<C>,
    conn: &ConnState,
    payload: &Value,
) -> Result<Value, KernelError> {
    let subject = conn.require_auth()?;
    let pid = req_pid(payload)?;
    let owner = process_owner(&gateway.kernel, pid)?;
    authorize(gateway, &subject, "agent.feedback", &format!("process/{pid}"), Some(&owner))?;

    let rating = payload
        .get("rating")
        .and_then(Value::as_f64)
        .ok_or_else(|| KernelError::invalid_args("'rating' must be a number"))?
        .clamp(-1.0, 1.0);
    let id = gateway
        .kernel
        .store
        .insert_feedback(&aether_core::FeedbackRecord {
            id: 0,
            pid,
            agent_uid: owner,
            rating,
            comment: payload
                .get("comment")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string(),
            created_at_ms: gateway.kernel.clock.epoch_ms(),
        })
        .map_err(KernelError::internal)?;
    Ok(json!({ "id": id }))
}

/// Post-run self-assessments for an agent.
pub fn reflections<C: Clock>(
    gateway: &Gateway<C>,
    conn: &ConnState,
    payload: &Value,
) -> Result<Value, KernelError> {
    let subject = conn.require_auth()?;
    let reflections = gateway
        .kernel
        .store
        .reflections_for_agent(&subject.uid, limit_arg(payload, 50))
        .map_err(KernelError::internal)?;
    Ok(json!({ "reflections": reflections }))
}

/// The persisted reasoning transcript for one process.
pub fn agent_history<C: Clock>(
    gateway: &Gateway<C>,
    conn: &ConnState,
    payload: &Value,
) -> Result<Value, KernelError> {
    let subject = conn.require_auth()?;
    let pid = req_pid(payload)?;
    let owner = process_owner(&gateway.kernel, pid)?;
    authorize(gateway, &subject, "agent.history", &format!("process/{pid}"), Some(&owner))?;

    let logs = gateway
        .kernel
        .store
        .agent_logs(pid, limit_arg(payload, 500))
        .map_err(KernelError::internal)?;
    Ok(json!({ "logs": logs }))
}
