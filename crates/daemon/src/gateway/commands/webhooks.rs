// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outbound webhook, DLQ and inbound hook commands

use crate::gateway::{authorize, opt_str, opt_u64, req_str, ConnState, Gateway};
use aether_core::{Clock, Event, InboundWebhook, KernelError, Webhook, WebhookId};
use serde_json::{json, Value};

pub fn create<C: Clock>(
    gateway: &Gateway<C>,
    conn: &ConnState,
    payload: &Value,
) -> Result<Value, KernelError> {
    let subject = conn.require_auth()?;
    authorize(gateway, &subject, "webhook.create", "webhook", Some(&subject.uid))?;

    let url = req_str(payload, "url")?;
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(KernelError::invalid_args("'url' must be http(s)"));
    }
    let events = payload
        .get("events")
        .and_then(Value::as_array)
        .ok_or_else(|| KernelError::invalid_args("'events' must be an array of topics"))?
        .iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect();

    let hook = Webhook {
        id: WebhookId::new(format!("wh-{}", uuid::Uuid::new_v4())),
        url: url.to_string(),
        secret: opt_str(payload, "secret").map(str::to_string),
        events,
        filter: payload
            .get("filter")
            .map(|f| serde_json::from_value(f.clone()))
            .transpose()
            .map_err(|e| KernelError::invalid_args(format!("bad filter: {e}")))?,
        headers: payload
            .get("headers")
            .map(|h| serde_json::from_value(h.clone()))
            .transpose()
            .map_err(|e| KernelError::invalid_args(format!("bad headers: {e}")))?
            .unwrap_or_default(),
        enabled: true,
        owner_uid: subject.uid.clone(),
        retry_count: opt_u64(payload, "retryCount").unwrap_or(3) as u32,
        timeout_ms: opt_u64(payload, "timeoutMs").unwrap_or(5_000),
        failure_count: 0,
        created_at_ms: gateway.kernel.clock.epoch_ms(),
    };
    gateway
        .kernel
        .store
        .insert_webhook(&hook)
        .map_err(KernelError::internal)?;

    gateway.kernel.bus.emit(Event::WebhookCreated { id: hook.id.clone() });
    Ok(json!({ "webhook": hook }))
}

pub fn list<C: Clock>(gateway: &Gateway<C>, conn: &ConnState) -> Result<Value, KernelError> {
    let subject = conn.require_auth()?;
    let owner = if subject.is_admin() {
        None
    } else {
        Some(&subject.uid)
    };
    let webhooks = gateway
        .kernel
        .store
        .list_webhooks(owner)
        .map_err(KernelError::internal)?;
    Ok(json!({ "webhooks": webhooks }))
}

fn owned_webhook<C: Clock>(
    gateway: &Gateway<C>,
    conn: &ConnState,
    payload: &Value,
    action: &str,
) -> Result<Webhook, KernelError> {
    let subject = conn.require_auth()?;
    let id = WebhookId::new(req_str(payload, "id")?);
    let hook = gateway
        .kernel
        .store
        .get_webhook(&id)
        .map_err(KernelError::internal)?
        .ok_or_else(|| KernelError::not_found(format!("webhook {id}")))?;
    authorize(gateway, &subject, action, &format!("webhook/{id}"), Some(&hook.owner_uid))?;
    Ok(hook)
}

pub fn delete<C: Clock>(
    gateway: &Gateway<C>,
    conn: &ConnState,
    payload: &Value,
) -> Result<Value, KernelError> {
    let hook = owned_webhook(gateway, conn, payload, "webhook.delete")?;
    gateway
        .kernel
        .store
        .delete_webhook(&hook.id)
        .map_err(KernelError::internal)?;
    gateway.kernel.bus.emit(Event::WebhookDeleted { id: hook.id.clone() });
    Ok(json!({ "deleted": true }))
}

/// Fire a probe delivery at one webhook to validate its endpoint.
pub async fn test<C: Clock>(
    gateway: &Gateway<C>,
    conn: &ConnState,
    payload: &Value,
) -> Result<Value, KernelError> {
    let hook = owned_webhook(gateway, conn, payload, "webhook.test")?;
    let delivered = gateway.dispatcher.probe(&hook).await;
    Ok(json!({ "delivered": delivered }))
}

pub fn dlq_list<C: Clock>(gateway: &Gateway<C>, conn: &ConnState) -> Result<Value, KernelError> {
    let subject = conn.require_auth()?;
    authorize(gateway, &subject, "dlq.list", "dlq", None)?;
    let entries = gateway
        .kernel
        .store
        .list_dlq(200)
        .map_err(KernelError::internal)?;
    Ok(json!({ "entries": entries }))
}

pub async fn dlq_retry<C: Clock>(
    gateway: &Gateway<C>,
    conn: &ConnState,
    payload: &Value,
) -> Result<Value, KernelError> {
    let subject = conn.require_auth()?;
    authorize(gateway, &subject, "dlq.retry", "dlq", None)?;
    let id = payload
        .get("id")
        .and_then(Value::as_i64)
        .ok_or_else(|| KernelError::invalid_args("'id' must be an integer"))?;
    let delivered = gateway.dispatcher.retry_dlq(id).await?;
    Ok(json!({ "delivered": delivered }))
}

pub fn dlq_delete<C: Clock>(
    gateway: &Gateway<C>,
    conn: &ConnState,
    payload: &Value,
) -> Result<Value, KernelError> {
    let subject = conn.require_auth()?;
    authorize(gateway, &subject, "dlq.delete", "dlq", None)?;
    let id = payload
        .get("id")
        .and_then(Value::as_i64)
        .ok_or_else(|| KernelError::invalid_args("'id' must be an integer"))?;
    let deleted = gateway
        .kernel
        .store
        .delete_dlq_entry(id)
        .map_err(KernelError::internal)?;
    Ok(json!({ "deleted": deleted }))
}

// -- inbound hooks --

pub fn hook_create<C: Clock>(
    gateway: &Gateway<C>,
    conn: &ConnState,
    payload: &Value,
) -> Result<Value, KernelError> {
    let subject = conn.require_auth()?;
    authorize(gateway, &subject, "hook.create", "hook", Some(&subject.uid))?;

    let name = req_str(payload, "name")?;
    let agent_config = payload
        .get("agentConfig")
        .ok_or_else(|| KernelError::invalid_args("'agentConfig' is required"))?;
    let hook = InboundWebhook {
        token: uuid::Uuid::new_v4().simple().to_string(),
        name: name.to_string(),
        agent_config: serde_json::from_value(agent_config.clone())
            .map_err(|e| KernelError::invalid_args(format!("bad agent config: {e}")))?,
        transform: opt_str(payload, "transform").map(str::to_string),
        owner_uid: subject.uid.clone(),
        last_triggered_ms: None,
        trigger_count: 0,
        created_at_ms: gateway.kernel.clock.epoch_ms(),
    };
    gateway
        .kernel
        .store
        .insert_inbound_webhook(&hook)
        .map_err(|e| match e {
            aether_store::StoreError::Conflict(message) => KernelError::conflict(message),
            other => KernelError::internal(other),
        })?;
    Ok(json!({ "hook": hook }))
}

pub fn hook_list<C: Clock>(gateway: &Gateway<C>, conn: &ConnState) -> Result<Value, KernelError> {
    let subject = conn.require_auth()?;
    let owner = if subject.is_admin() {
        None
    } else {
        Some(&subject.uid)
    };
    let hooks = gateway
        .kernel
        .store
        .list_inbound_webhooks(owner)
        .map_err(KernelError::internal)?;
    Ok(json!({ "hooks": hooks }))
}

pub fn hook_delete<C: Clock>(
    gateway: &Gateway<C>,
    conn: &ConnState,
    payload: &Value,
) -> Result<Value, KernelError> {
    let subject = conn.require_auth()?;
    let token = req_str(payload, "token")?;
    let hook = gateway
        .kernel
        .store
        .get_inbound_webhook(token)
        .map_err(KernelError::internal)?
        .ok_or_else(|| KernelError::not_found("inbound webhook"))?;
    authorize(gateway, &subject, "hook.delete", "hook", Some(&hook.owner_uid))?;

    let deleted = gateway
        .kernel
        .store
        .delete_inbound_webhook(token)
        .map_err(KernelError::internal)?;
    Ok(json!({ "deleted": deleted }))
}
