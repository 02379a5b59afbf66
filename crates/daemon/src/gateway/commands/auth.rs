// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Authentication commands

use crate::gateway::{opt_str, req_str, ConnState, Gateway};
use aether_core::{Clock, KernelError};
use aether_kernel::Subject;
use serde_json::{json, Value};

/// `{ type: "auth", token }`: bind a verified identity to the
/// connection.
pub fn handle_auth_frame<C: Clock>(
    gateway: &Gateway<C>,
    conn: &mut ConnState,
    payload: &Value,
) -> Result<Value, KernelError> {
    let token = req_str(payload, "token")?;
    let user = gateway.kernel.auth.verify_token(token)?;
    conn.subject = Some(Subject::new(user.uid.clone(), user.role));
    conn.token = Some(token.to_string());
    Ok(json!({ "user": user }))
}

pub fn register<C: Clock>(
    gateway: &Gateway<C>,
    conn: &mut ConnState,
    payload: &Value,
) -> Result<Value, KernelError> {
    let username = req_str(payload, "username")?;
    let password = req_str(payload, "password")?;
    let display_name = opt_str(payload, "displayName").unwrap_or(username);

    let session = gateway.kernel.auth.register(username, password, display_name)?;
    gateway.kernel.audit_command(
        Some(&session.user.uid),
        "auth.register",
        Some(username.to_string()),
        payload,
    );

    conn.subject = Some(Subject::new(session.user.uid.clone(), session.user.role));
    conn.token = Some(session.token.clone());
    Ok(json!({ "user": session.user, "token": session.token }))
}

pub fn login<C: Clock>(
    gateway: &Gateway<C>,
    conn: &mut ConnState,
    payload: &Value,
) -> Result<Value, KernelError> {
    let username = req_str(payload, "username")?;
    let password = req_str(payload, "password")?;
    let totp = opt_str(payload, "totp");

    let session = gateway.kernel.auth.login(username, password, totp)?;
    conn.subject = Some(Subject::new(session.user.uid.clone(), session.user.role));
    conn.token = Some(session.token.clone());
    Ok(json!({ "user": session.user, "token": session.token }))
}

pub fn logout<C: Clock>(gateway: &Gateway<C>, conn: &mut ConnState) -> Result<Value, KernelError> {
    conn.require_auth()?;
    if let Some(token) = conn.token.take() {
        gateway.kernel.auth.logout(&token);
    }
    conn.subject = None;
    Ok(Value::Null)
}

pub fn whoami(conn: &ConnState) -> Result<Value, KernelError> {
    let subject = conn.require_auth()?;
    Ok(json!({ "uid": subject.uid, "role": subject.role.as_str() }))
}

pub fn mfa_setup<C: Clock>(gateway: &Gateway<C>, conn: &ConnState) -> Result<Value, KernelError> {
    let subject = conn.require_auth()?;
    let secret = gateway.kernel.auth.mfa_setup(&subject.uid)?;
    Ok(json!({ "secret": secret }))
}

pub fn mfa_verify<C: Clock>(
    gateway: &Gateway<C>,
    conn: &ConnState,
    payload: &Value,
) -> Result<Value, KernelError> {
    let subject = conn.require_auth()?;
    let code = req_str(payload, "code")?;
    gateway.kernel.auth.mfa_verify(&subject.uid, code)?;
    Ok(json!({ "enabled": true }))
}
