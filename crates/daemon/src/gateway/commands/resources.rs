// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Memory, plan, key-value and snapshot commands

use crate::gateway::{authorize, limit_arg, process_owner, req_pid, req_str, ConnState, Gateway};
use aether_core::{
    Clock, Event, KernelError, MemoryId, MemoryLayer, MemoryRecord, Pid, PlanId, PlanStatus,
    SnapshotId,
};
use serde_json::{json, Value};

// -- memory --

pub fn mem_put<C: Clock>(
    gateway: &Gateway<C>,
    conn: &ConnState,
    payload: &Value,
) -> Result<Value, KernelError> {
    let subject = conn.require_auth()?;
    let layer = req_str(payload, "layer")?;
    let layer = MemoryLayer::parse(layer)
        .ok_or_else(|| KernelError::invalid_args(format!("unknown layer '{layer}'")))?;
    let content = req_str(payload, "content")?;
    let now = gateway.kernel.clock.epoch_ms();

    let memory = MemoryRecord {
        id: MemoryId::new(format!("m-{}", uuid::Uuid::new_v4())),
        agent_uid: subject.uid.clone(),
        layer,
        content: content.to_string(),
        tags: payload
            .get("tags")
            .and_then(Value::as_array)
            .map(|tags| {
                tags.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
        importance: payload
            .get("importance")
            .and_then(Value::as_f64)
            .unwrap_or(0.5)
            .clamp(0.0, 1.0),
        access_count: 0,
        created_at_ms: now,
        last_accessed_ms: now,
        expires_at_ms: payload.get("expiresAtMs").and_then(Value::as_u64),
        source_pid: payload.get("sourcePid").and_then(Value::as_i64).map(Pid),
        related: Default::default(),
    };

    let evicted = gateway
        .kernel
        .store
        .put_memory(&memory, gateway.kernel.config.memory.layer_cap)
        .map_err(KernelError::internal)?;

    gateway.kernel.bus.emit(Event::MemoryStored {
        uid: subject.uid.clone(),
        memory_id: memory.id.clone(),
        layer,
    });
    if evicted > 0 {
        gateway.kernel.bus.emit(Event::MemoryEvicted {
            uid: subject.uid.clone(),
            layer,
            count: evicted,
        });
    }
    Ok(json!({ "memory": memory, "evicted": evicted }))
}

fn owned_memory<C: Clock>(
    gateway: &Gateway<C>,
    conn: &ConnState,
    id: &MemoryId,
) -> Result<MemoryRecord, KernelError> {
    let subject = conn.require_auth()?;
    let memory = gateway
        .kernel
        .store
        .access_memory(id, gateway.kernel.clock.epoch_ms())
        .map_err(KernelError::internal)?
        .ok_or_else(|| KernelError::not_found(format!("memory {id}")))?;
    authorize(
        gateway,
        &subject,
        "mem.get",
        &format!("memory/{id}"),
        Some(&memory.agent_uid),
    )?;
    Ok(memory)
}

pub fn mem_get<C: Clock>(
    gateway: &Gateway<C>,
    conn: &ConnState,
    payload: &Value,
) -> Result<Value, KernelError> {
    let id = MemoryId::new(req_str(payload, "id")?);
    let memory = owned_memory(gateway, conn, &id)?;
    Ok(json!({ "memory": memory }))
}

pub fn mem_search<C: Clock>(
    gateway: &Gateway<C>,
    conn: &ConnState,
    payload: &Value,
) -> Result<Value, KernelError> {
    let subject = conn.require_auth()?;
    let query = req_str(payload, "query")?;
    let memories = gateway
        .kernel
        .store
        .search_memories(&subject.uid, query, limit_arg(payload, 16))
        .map_err(KernelError::internal)?;
    Ok(json!({ "memories": memories }))
}

pub fn mem_delete<C: Clock>(
    gateway: &Gateway<C>,
    conn: &ConnState,
    payload: &Value,
) -> Result<Value, KernelError> {
    let id = MemoryId::new(req_str(payload, "id")?);
    // Ownership check via lookup before deleting.
    owned_memory(gateway, conn, &id)?;
    let deleted = gateway
        .kernel
        .store
        .delete_memory(&id)
        .map_err(KernelError::internal)?;
    Ok(json!({ "deleted": deleted }))
}

// -- plans --

pub fn plan_get<C: Clock>(
    gateway: &Gateway<C>,
    conn: &ConnState,
    payload: &Value,
) -> Result<Value, KernelError> {
    let subject = conn.require_auth()?;
    let pid = req_pid(payload)?;
    let owner = process_owner(&gateway.kernel, pid)?;
    authorize(gateway, &subject, "plan.get", &format!("process/{pid}"), Some(&owner))?;

    let plan = gateway
        .kernel
        .store
        .plan_for_pid(pid)
        .map_err(KernelError::internal)?
        .ok_or_else(|| KernelError::not_found(format!("plan for process {pid}")))?;
    Ok(json!({ "plan": plan }))
}

pub fn plan_update<C: Clock>(
    gateway: &Gateway<C>,
    conn: &ConnState,
    payload: &Value,
) -> Result<Value, KernelError> {
    let subject = conn.require_auth()?;
    let id = PlanId::new(req_str(payload, "id")?);
    let status = req_str(payload, "status")?;
    let status = PlanStatus::parse(status)
        .ok_or_else(|| KernelError::invalid_args(format!("unknown status '{status}'")))?;

    let current = gateway
        .kernel
        .store
        .get_plan(&id)
        .map_err(KernelError::internal)?
        .ok_or_else(|| KernelError::not_found(format!("plan {id}")))?;
    authorize(
        gateway,
        &subject,
        "plan.update",
        &format!("plan/{id}"),
        Some(&current.agent_uid),
    )?;

    let updated = gateway
        .kernel
        .store
        .update_plan_status(&id, status, gateway.kernel.clock.epoch_ms())
        .map_err(|e| match e {
            aether_store::StoreError::Invalid(message) => KernelError::invalid_state(message),
            other => KernelError::internal(other),
        })?;

    gateway.kernel.bus.emit(Event::PlanUpdated {
        plan_id: updated.id.clone(),
        status: updated.status,
    });
    Ok(json!({ "plan": updated }))
}

// -- key/value --

pub fn kv_get<C: Clock>(
    gateway: &Gateway<C>,
    conn: &ConnState,
    payload: &Value,
) -> Result<Value, KernelError> {
    conn.require_auth()?;
    let key = req_str(payload, "key")?;
    let entry = gateway
        .kernel
        .store
        .kv_get(key)
        .map_err(KernelError::internal)?;
    Ok(json!({ "entry": entry }))
}

pub fn kv_set<C: Clock>(
    gateway: &Gateway<C>,
    conn: &ConnState,
    payload: &Value,
) -> Result<Value, KernelError> {
    let subject = conn.require_auth()?;
    authorize(gateway, &subject, "kv.set", "kv", Some(&subject.uid))?;
    let key = req_str(payload, "key")?;
    let value = payload
        .get("value")
        .ok_or_else(|| KernelError::invalid_args("'value' is required"))?;
    gateway
        .kernel
        .store
        .kv_set(key, value, gateway.kernel.clock.epoch_ms())
        .map_err(KernelError::internal)?;
    Ok(Value::Null)
}

pub fn kv_delete<C: Clock>(
    gateway: &Gateway<C>,
    conn: &ConnState,
    payload: &Value,
) -> Result<Value, KernelError> {
    let subject = conn.require_auth()?;
    authorize(gateway, &subject, "kv.delete", "kv", Some(&subject.uid))?;
    let key = req_str(payload, "key")?;
    let deleted = gateway
        .kernel
        .store
        .kv_delete(key)
        .map_err(KernelError::internal)?;
    Ok(json!({ "deleted": deleted }))
}

// -- snapshots --

pub fn snapshot_create<C: Clock>(
    gateway: &Gateway<C>,
    conn: &ConnState,
    payload: &Value,
) -> Result<Value, KernelError> {
    let subject = conn.require_auth()?;
    let pid = req_pid(payload)?;
    let owner = process_owner(&gateway.kernel, pid)?;
    authorize(gateway, &subject, "snapshot.create", &format!("process/{pid}"), Some(&owner))?;

    let info = gateway
        .kernel
        .table
        .get(pid)
        .ok_or_else(|| KernelError::invalid_state(format!("process {pid} is gone")))?;
    let home = gateway.kernel.home_for(&info.uid);
    let record = aether_kernel::snapshot::create_snapshot(
        &gateway.kernel.store,
        &gateway.kernel.clock,
        &info,
        &home,
        &gateway.kernel.config.snapshot_dir,
        payload.get("description").and_then(Value::as_str).unwrap_or(""),
    )?;
    Ok(json!({ "snapshot": record }))
}

pub fn snapshot_list<C: Clock>(
    gateway: &Gateway<C>,
    conn: &ConnState,
    payload: &Value,
) -> Result<Value, KernelError> {
    conn.require_auth()?;
    let pid = payload.get("pid").and_then(Value::as_i64).map(Pid);
    let snapshots = aether_kernel::snapshot::list_snapshots(&gateway.kernel.store, pid)?;
    Ok(json!({ "snapshots": snapshots }))
}

pub fn snapshot_delete<C: Clock>(
    gateway: &Gateway<C>,
    conn: &ConnState,
    payload: &Value,
) -> Result<Value, KernelError> {
    let subject = conn.require_auth()?;
    let id = SnapshotId::new(req_str(payload, "id")?);
    authorize(gateway, &subject, "snapshot.delete", &format!("snapshot/{id}"), None)?;
    let deleted = aether_kernel::snapshot::delete_snapshot(&gateway.kernel.store, &id)?;
    Ok(json!({ "deleted": deleted }))
}
