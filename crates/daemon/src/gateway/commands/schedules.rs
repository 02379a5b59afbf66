// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cron job and event trigger commands

use crate::gateway::{authorize, opt_u64, req_str, ConnState, Gateway};
use aether_core::{
    AgentConfig, Clock, CronId, CronJob, CronSchedule, Event, EventFilter, EventTrigger,
    KernelError, TriggerId,
};
use serde_json::{json, Value};

fn agent_config_arg(payload: &Value) -> Result<AgentConfig, KernelError> {
    let config = payload
        .get("agentConfig")
        .ok_or_else(|| KernelError::invalid_args("'agentConfig' is required"))?;
    serde_json::from_value(config.clone())
        .map_err(|e| KernelError::invalid_args(format!("bad agent config: {e}")))
}

// -- cron --

pub fn cron_create<C: Clock>(
    gateway: &Gateway<C>,
    conn: &ConnState,
    payload: &Value,
) -> Result<Value, KernelError> {
    let subject = conn.require_auth()?;
    authorize(gateway, &subject, "cron.create", "cron", Some(&subject.uid))?;

    let name = req_str(payload, "name")?;
    let expression = req_str(payload, "cronExpression")?;
    let schedule = CronSchedule::parse(expression)
        .map_err(|e| KernelError::invalid_args(e.to_string()))?;
    let now = gateway.kernel.clock.epoch_ms();
    let next_run_ms = schedule
        .next_after(now)
        .ok_or_else(|| KernelError::invalid_args("expression never fires"))?;

    let job = CronJob {
        id: CronId::new(format!("cron-{}", uuid::Uuid::new_v4())),
        name: name.to_string(),
        cron_expression: expression.to_string(),
        agent_config: agent_config_arg(payload)?,
        enabled: true,
        owner_uid: subject.uid.clone(),
        last_run_ms: None,
        next_run_ms,
        run_count: 0,
        created_at_ms: now,
    };
    gateway
        .kernel
        .store
        .insert_cron_job(&job)
        .map_err(KernelError::internal)?;

    gateway.kernel.bus.emit(Event::CronCreated {
        id: job.id.clone(),
        name: job.name.clone(),
    });
    Ok(json!({ "job": job }))
}

pub fn cron_list<C: Clock>(gateway: &Gateway<C>, conn: &ConnState) -> Result<Value, KernelError> {
    let subject = conn.require_auth()?;
    let owner = if subject.is_admin() {
        None
    } else {
        Some(&subject.uid)
    };
    let jobs = gateway
        .kernel
        .store
        .list_cron_jobs(owner)
        .map_err(KernelError::internal)?;
    Ok(json!({ "jobs": jobs }))
}

fn owned_cron<C: Clock>(
    gateway: &Gateway<C>,
    conn: &ConnState,
    payload: &Value,
    action: &str,
) -> Result<CronJob, KernelError> {
    let subject = conn.require_auth()?;
    let id = CronId::new(req_str(payload, "id")?);
    let job = gateway
        .kernel
        .store
        .get_cron_job(&id)
        .map_err(KernelError::internal)?
        .ok_or_else(|| KernelError::not_found(format!("cron job {id}")))?;
    authorize(gateway, &subject, action, &format!("cron/{id}"), Some(&job.owner_uid))?;
    Ok(job)
}

pub fn cron_toggle<C: Clock>(
    gateway: &Gateway<C>,
    conn: &ConnState,
    payload: &Value,
) -> Result<Value, KernelError> {
    let job = owned_cron(gateway, conn, payload, "cron.toggle")?;
    let enabled = payload
        .get("enabled")
        .and_then(Value::as_bool)
        .unwrap_or(!job.enabled);
    gateway
        .kernel
        .store
        .set_cron_enabled(&job.id, enabled)
        .map_err(KernelError::internal)?;
    Ok(json!({ "id": job.id, "enabled": enabled }))
}

pub fn cron_delete<C: Clock>(
    gateway: &Gateway<C>,
    conn: &ConnState,
    payload: &Value,
) -> Result<Value, KernelError> {
    let job = owned_cron(gateway, conn, payload, "cron.delete")?;
    gateway
        .kernel
        .store
        .delete_cron_job(&job.id)
        .map_err(KernelError::internal)?;
    gateway.kernel.bus.emit(Event::CronDeleted { id: job.id.clone() });
    Ok(json!({ "deleted": true }))
}

// -- triggers --

pub fn trigger_create<C: Clock>(
    gateway: &Gateway<C>,
    conn: &ConnState,
    payload: &Value,
) -> Result<Value, KernelError> {
    let subject = conn.require_auth()?;
    authorize(gateway, &subject, "trigger.create", "trigger", Some(&subject.uid))?;

    let name = req_str(payload, "name")?;
    let event_type = req_str(payload, "eventType")?;
    let event_filter: Option<EventFilter> = payload
        .get("eventFilter")
        .map(|f| serde_json::from_value(f.clone()))
        .transpose()
        .map_err(|e| KernelError::invalid_args(format!("bad filter: {e}")))?;

    let trigger = EventTrigger {
        id: TriggerId::new(format!("trig-{}", uuid::Uuid::new_v4())),
        name: name.to_string(),
        event_type: event_type.to_string(),
        event_filter,
        agent_config: agent_config_arg(payload)?,
        enabled: true,
        owner_uid: subject.uid.clone(),
        cooldown_ms: opt_u64(payload, "cooldownMs").unwrap_or(0),
        last_fired_ms: None,
        fire_count: 0,
        created_at_ms: gateway.kernel.clock.epoch_ms(),
    };
    gateway
        .kernel
        .store
        .insert_trigger(&trigger)
        .map_err(KernelError::internal)?;

    gateway.kernel.bus.emit(Event::TriggerCreated {
        id: trigger.id.clone(),
        name: trigger.name.clone(),
    });
    Ok(json!({ "trigger": trigger }))
}

pub fn trigger_list<C: Clock>(gateway: &Gateway<C>, conn: &ConnState) -> Result<Value, KernelError> {
    let subject = conn.require_auth()?;
    let owner = if subject.is_admin() {
        None
    } else {
        Some(&subject.uid)
    };
    let triggers = gateway
        .kernel
        .store
        .list_triggers(owner)
        .map_err(KernelError::internal)?;
    Ok(json!({ "triggers": triggers }))
}

fn owned_trigger<C: Clock>(
    gateway: &Gateway<C>,
    conn: &ConnState,
    payload: &Value,
    action: &str,
) -> Result<EventTrigger, KernelError> {
    let subject = conn.require_auth()?;
    let id = TriggerId::new(req_str(payload, "id")?);
    let trigger = gateway
        .kernel
        .store
        .get_trigger(&id)
        .map_err(KernelError::internal)?
        .ok_or_else(|| KernelError::not_found(format!("trigger {id}")))?;
    authorize(gateway, &subject, action, &format!("trigger/{id}"), Some(&trigger.owner_uid))?;
    Ok(trigger)
}

pub fn trigger_toggle<C: Clock>(
    gateway: &Gateway<C>,
    conn: &ConnState,
    payload: &Value,
) -> Result<Value, KernelError> {
    let trigger = owned_trigger(gateway, conn, payload, "trigger.toggle")?;
    let enabled = payload
        .get("enabled")
        .and_then(Value::as_bool)
        .unwrap_or(!trigger.enabled);
    gateway
        .kernel
        .store
        .set_trigger_enabled(&trigger.id, enabled)
        .map_err(KernelError::internal)?;
    Ok(json!({ "id": trigger.id, "enabled": enabled }))
}

pub fn trigger_delete<C: Clock>(
    gateway: &Gateway<C>,
    conn: &ConnState,
    payload: &Value,
) -> Result<Value, KernelError> {
    let trigger = owned_trigger(gateway, conn, payload, "trigger.delete")?;
    gateway
        .kernel
        .store
        .delete_trigger(&trigger.id)
        .map_err(KernelError::internal)?;
    gateway.kernel.bus.emit(Event::TriggerDeleted {
        id: trigger.id.clone(),
    });
    Ok(json!({ "deleted": true }))
}
