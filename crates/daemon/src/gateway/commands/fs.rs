// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filesystem commands over the caller's sandboxed home

use crate::gateway::{opt_str, req_str, ConnState, Gateway};
use aether_core::{Clock, Event, KernelError};
use serde_json::{json, Value};
use std::path::{Component, Path, PathBuf};

/// Resolve a client path inside the subject's home directory.
fn resolve(home: &Path, raw: &str) -> Result<PathBuf, KernelError> {
    let rel = Path::new(raw);
    if rel.is_absolute()
        || rel
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
    {
        return Err(KernelError::invalid_args(format!(
            "path '{raw}' escapes the home directory"
        )));
    }
    Ok(home.join(rel))
}

pub fn ls<C: Clock>(
    gateway: &Gateway<C>,
    conn: &ConnState,
    payload: &Value,
) -> Result<Value, KernelError> {
    let subject = conn.require_auth()?;
    let raw = opt_str(payload, "path").unwrap_or("");
    let home = gateway.kernel.home_for(&subject.uid);
    let dir = if raw.is_empty() {
        home
    } else {
        resolve(&home, raw)?
    };

    let mut entries = Vec::new();
    if let Ok(read_dir) = std::fs::read_dir(&dir) {
        for entry in read_dir.flatten() {
            let meta = entry.metadata().ok();
            entries.push(json!({
                "name": entry.file_name().to_string_lossy(),
                "dir": meta.as_ref().map(|m| m.is_dir()).unwrap_or(false),
                "size": meta.map(|m| m.len()).unwrap_or(0),
            }));
        }
    }
    Ok(json!({ "path": raw, "entries": entries }))
}

pub fn read<C: Clock>(
    gateway: &Gateway<C>,
    conn: &ConnState,
    payload: &Value,
) -> Result<Value, KernelError> {
    let subject = conn.require_auth()?;
    let raw = req_str(payload, "path")?;
    let path = resolve(&gateway.kernel.home_for(&subject.uid), raw)?;

    let content = std::fs::read_to_string(&path)
        .map_err(|_| KernelError::not_found(format!("file '{raw}'")))?;
    Ok(json!({ "path": raw, "content": content }))
}

pub fn write<C: Clock>(
    gateway: &Gateway<C>,
    conn: &ConnState,
    payload: &Value,
) -> Result<Value, KernelError> {
    let subject = conn.require_auth()?;
    let raw = req_str(payload, "path")?;
    let content = req_str(payload, "content")?;
    let path = resolve(&gateway.kernel.home_for(&subject.uid), raw)?;

    let existed = path.exists();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(KernelError::internal)?;
    }
    std::fs::write(&path, content).map_err(KernelError::internal)?;

    gateway.kernel.bus.emit(Event::FsChanged {
        uid: subject.uid.clone(),
        path: format!("{}/{raw}", subject.uid),
        change: if existed { "write" } else { "create" }.to_string(),
        size: content.len() as u64,
    });
    Ok(json!({ "path": raw, "size": content.len() }))
}
