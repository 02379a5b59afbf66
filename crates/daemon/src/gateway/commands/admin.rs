// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Administrative commands: users, orgs, teams, policies, audit

use crate::gateway::{authorize, limit_arg, opt_u64, req_str, ConnState, Gateway};
use aether_core::{
    Clock, Effect, Event, KernelError, OrgId, OrgMember, OrgRole, Organization, PermissionPolicy,
    PolicyId, Team, TeamId, TeamMember, Uid,
};
use serde_json::{json, Value};

pub fn user_list<C: Clock>(gateway: &Gateway<C>, conn: &ConnState) -> Result<Value, KernelError> {
    let subject = conn.require_auth()?;
    authorize(gateway, &subject, "user.list", "users", None)?;
    let users = gateway
        .kernel
        .store
        .list_users()
        .map_err(KernelError::internal)?;
    Ok(json!({ "users": users }))
}

pub fn user_delete<C: Clock>(
    gateway: &Gateway<C>,
    conn: &ConnState,
    payload: &Value,
) -> Result<Value, KernelError> {
    let subject = conn.require_auth()?;
    authorize(gateway, &subject, "user.delete", "users", None)?;
    let uid = Uid::new(req_str(payload, "uid")?);
    if uid == subject.uid {
        return Err(KernelError::invalid_args("cannot delete yourself"));
    }

    let deleted = gateway
        .kernel
        .store
        .delete_user(&uid)
        .map_err(KernelError::internal)?;
    if deleted {
        gateway.kernel.bus.emit(Event::UserDeleted { uid });
    }
    Ok(json!({ "deleted": deleted }))
}

// -- organizations / teams --

pub fn org_create<C: Clock>(
    gateway: &Gateway<C>,
    conn: &ConnState,
    payload: &Value,
) -> Result<Value, KernelError> {
    let subject = conn.require_auth()?;
    authorize(gateway, &subject, "org.create", "orgs", None)?;

    let org = Organization {
        id: OrgId::new(format!("org-{}", uuid::Uuid::new_v4())),
        name: req_str(payload, "name")?.to_string(),
        created_at_ms: gateway.kernel.clock.epoch_ms(),
    };
    gateway.kernel.store.insert_org(&org).map_err(|e| match e {
        aether_store::StoreError::Conflict(message) => KernelError::conflict(message),
        other => KernelError::internal(other),
    })?;

    // The creator is the founding owner.
    gateway
        .kernel
        .store
        .add_org_member(&OrgMember {
            org_id: org.id.clone(),
            uid: subject.uid.clone(),
            role: OrgRole::Owner,
        })
        .map_err(KernelError::internal)?;
    Ok(json!({ "org": org }))
}

pub fn org_list<C: Clock>(gateway: &Gateway<C>, conn: &ConnState) -> Result<Value, KernelError> {
    conn.require_auth()?;
    let orgs = gateway
        .kernel
        .store
        .list_orgs()
        .map_err(KernelError::internal)?;
    Ok(json!({ "orgs": orgs }))
}

pub fn org_delete<C: Clock>(
    gateway: &Gateway<C>,
    conn: &ConnState,
    payload: &Value,
) -> Result<Value, KernelError> {
    let subject = conn.require_auth()?;
    authorize(gateway, &subject, "org.delete", "orgs", None)?;
    let id = OrgId::new(req_str(payload, "id")?);
    let deleted = gateway
        .kernel
        .store
        .delete_org(&id)
        .map_err(KernelError::internal)?;
    Ok(json!({ "deleted": deleted }))
}

fn parse_org_role(payload: &Value) -> OrgRole {
    payload
        .get("role")
        .and_then(Value::as_str)
        .and_then(OrgRole::parse)
        .unwrap_or(OrgRole::Member)
}

pub fn org_add_member<C: Clock>(
    gateway: &Gateway<C>,
    conn: &ConnState,
    payload: &Value,
) -> Result<Value, KernelError> {
    let subject = conn.require_auth()?;
    authorize(gateway, &subject, "org.addMember", "orgs", None)?;

    let member = OrgMember {
        org_id: OrgId::new(req_str(payload, "orgId")?),
        uid: Uid::new(req_str(payload, "uid")?),
        role: parse_org_role(payload),
    };
    gateway
        .kernel
        .store
        .get_org(&member.org_id)
        .map_err(KernelError::internal)?
        .ok_or_else(|| KernelError::not_found(format!("org {}", member.org_id)))?;
    gateway
        .kernel
        .store
        .add_org_member(&member)
        .map_err(KernelError::internal)?;
    Ok(json!({ "member": member }))
}

pub fn team_create<C: Clock>(
    gateway: &Gateway<C>,
    conn: &ConnState,
    payload: &Value,
) -> Result<Value, KernelError> {
    let subject = conn.require_auth()?;
    authorize(gateway, &subject, "team.create", "teams", None)?;

    let org_id = OrgId::new(req_str(payload, "orgId")?);
    gateway
        .kernel
        .store
        .get_org(&org_id)
        .map_err(KernelError::internal)?
        .ok_or_else(|| KernelError::not_found(format!("org {org_id}")))?;

    let team = Team {
        id: TeamId::new(format!("team-{}", uuid::Uuid::new_v4())),
        org_id,
        name: req_str(payload, "name")?.to_string(),
        created_at_ms: gateway.kernel.clock.epoch_ms(),
    };
    gateway.kernel.store.insert_team(&team).map_err(|e| match e {
        aether_store::StoreError::Conflict(message) => KernelError::conflict(message),
        other => KernelError::internal(other),
    })?;
    Ok(json!({ "team": team }))
}

pub fn team_list<C: Clock>(
    gateway: &Gateway<C>,
    conn: &ConnState,
    payload: &Value,
) -> Result<Value, KernelError> {
    conn.require_auth()?;
    let org_id = OrgId::new(req_str(payload, "orgId")?);
    let teams = gateway
        .kernel
        .store
        .list_teams(&org_id)
        .map_err(KernelError::internal)?;
    Ok(json!({ "teams": teams }))
}

pub fn team_add_member<C: Clock>(
    gateway: &Gateway<C>,
    conn: &ConnState,
    payload: &Value,
) -> Result<Value, KernelError> {
    let subject = conn.require_auth()?;
    authorize(gateway, &subject, "team.addMember", "teams", None)?;

    let member = TeamMember {
        team_id: TeamId::new(req_str(payload, "teamId")?),
        uid: Uid::new(req_str(payload, "uid")?),
        role: parse_org_role(payload),
    };
    gateway
        .kernel
        .store
        .add_team_member(&member)
        .map_err(KernelError::internal)?;
    Ok(json!({ "member": member }))
}

// -- policies --

pub fn policy_create<C: Clock>(
    gateway: &Gateway<C>,
    conn: &ConnState,
    payload: &Value,
) -> Result<Value, KernelError> {
    let subject = conn.require_auth()?;
    authorize(gateway, &subject, "policy.create", "policies", None)?;

    let effect = req_str(payload, "effect")?;
    let effect = Effect::parse(effect)
        .ok_or_else(|| KernelError::invalid_args(format!("unknown effect '{effect}'")))?;

    let policy = PermissionPolicy {
        id: PolicyId::new(format!("pol-{}", uuid::Uuid::new_v4())),
        subject: req_str(payload, "subject")?.to_string(),
        action: req_str(payload, "action")?.to_string(),
        resource: req_str(payload, "resource")?.to_string(),
        effect,
        created_at_ms: gateway.kernel.clock.epoch_ms(),
        created_by: Some(subject.uid.clone()),
    };
    gateway
        .kernel
        .store
        .insert_policy(&policy)
        .map_err(KernelError::internal)?;

    gateway.kernel.audit_command(
        Some(&subject.uid),
        "policy.create",
        Some(policy.id.to_string()),
        payload,
    );
    gateway.kernel.bus.emit(Event::PolicyCreated {
        id: policy.id.clone(),
        subject: policy.subject.clone(),
        action: policy.action.clone(),
        effect: policy.effect.as_str().to_string(),
    });
    Ok(json!({ "policy": policy }))
}

pub fn policy_list<C: Clock>(gateway: &Gateway<C>, conn: &ConnState) -> Result<Value, KernelError> {
    let subject = conn.require_auth()?;
    authorize(gateway, &subject, "policy.list", "policies", None)?;
    let policies = gateway
        .kernel
        .store
        .list_policies()
        .map_err(KernelError::internal)?;
    Ok(json!({ "policies": policies }))
}

pub fn policy_delete<C: Clock>(
    gateway: &Gateway<C>,
    conn: &ConnState,
    payload: &Value,
) -> Result<Value, KernelError> {
    let subject = conn.require_auth()?;
    authorize(gateway, &subject, "policy.delete", "policies", None)?;
    let id = PolicyId::new(req_str(payload, "id")?);
    let deleted = gateway
        .kernel
        .store
        .delete_policy(&id)
        .map_err(KernelError::internal)?;
    if deleted {
        gateway.kernel.bus.emit(Event::PolicyDeleted { id });
    }
    Ok(json!({ "deleted": deleted }))
}

// -- audit / cluster --

pub fn audit_query<C: Clock>(
    gateway: &Gateway<C>,
    conn: &ConnState,
    payload: &Value,
) -> Result<Value, KernelError> {
    let subject = conn.require_auth()?;
    authorize(gateway, &subject, "audit.query", "audit", None)?;

    let since = opt_u64(payload, "since").unwrap_or(0);
    let until = opt_u64(payload, "until").unwrap_or(u64::MAX);
    let entries = gateway
        .kernel
        .store
        .query_audit(since, until, limit_arg(payload, 200))
        .map_err(KernelError::internal)?;
    Ok(json!({ "entries": entries }))
}

pub fn metrics_query<C: Clock>(
    gateway: &Gateway<C>,
    conn: &ConnState,
    payload: &Value,
) -> Result<Value, KernelError> {
    conn.require_auth()?;
    let since = opt_u64(payload, "since").unwrap_or(0);
    let metrics = gateway
        .kernel
        .store
        .metrics_since(since, limit_arg(payload, 500))
        .map_err(KernelError::internal)?;
    Ok(json!({ "metrics": metrics }))
}

pub fn cluster_info<C: Clock>(gateway: &Gateway<C>, conn: &ConnState) -> Result<Value, KernelError> {
    conn.require_auth()?;
    Ok(json!({ "cluster": gateway.kernel.cluster_info() }))
}
