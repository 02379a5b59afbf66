// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Built-in tools
//!
//! Filesystem tools operate strictly inside the caller's home
//! directory; everything an agent writes is indexed through
//! `fs.changed` events.

use super::{Tool, ToolCtx, ToolError, ToolHost, ToolSpec};
use aether_core::{Event, MemoryId, MemoryLayer, MemoryRecord, PlanId, PlanRecord, PlanStatus};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

pub fn register_builtins(host: &ToolHost) {
    host.register(Arc::new(FsRead));
    host.register(Arc::new(FsWrite));
    host.register(Arc::new(FsList));
    host.register(Arc::new(RunCommand));
    host.register(Arc::new(SendMessage));
    host.register(Arc::new(MemoryPut));
    host.register(Arc::new(MemorySearch));
    host.register(Arc::new(PlanUpdate));
    host.register(Arc::new(Done));
}

/// Resolve a user-supplied path inside the home sandbox.
fn resolve_path(home: &Path, raw: &str) -> Result<PathBuf, ToolError> {
    let rel = Path::new(raw);
    if rel.is_absolute()
        || rel
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
    {
        return Err(ToolError::InvalidArgs(format!(
            "path '{raw}' escapes the home directory"
        )));
    }
    Ok(home.join(rel))
}

fn str_arg<'a>(args: &'a Value, key: &str) -> Result<&'a str, ToolError> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::InvalidArgs(format!("'{key}' must be a string")))
}

struct FsRead;

#[async_trait]
impl Tool for FsRead {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "fs_read".to_string(),
            description: "Read a file from the agent home".to_string(),
            required: vec!["path".to_string()],
            action: "fs.read".to_string(),
        }
    }

    async fn call(&self, ctx: &ToolCtx, args: &Value) -> Result<Value, ToolError> {
        let raw = str_arg(args, "path")?;
        let path = resolve_path(&ctx.home, raw)?;
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| ToolError::Execution(format!("read {raw}: {e}")))?;
        Ok(json!({ "path": raw, "content": content }))
    }
}

struct FsWrite;

#[async_trait]
impl Tool for FsWrite {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "fs_write".to_string(),
            description: "Write a file in the agent home".to_string(),
            required: vec!["path".to_string(), "content".to_string()],
            action: "fs.write".to_string(),
        }
    }

    async fn call(&self, ctx: &ToolCtx, args: &Value) -> Result<Value, ToolError> {
        let raw = str_arg(args, "path")?;
        let content = str_arg(args, "content")?;
        let path = resolve_path(&ctx.home, raw)?;

        let existed = path.exists();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ToolError::Execution(format!("mkdir for {raw}: {e}")))?;
        }
        tokio::fs::write(&path, content)
            .await
            .map_err(|e| ToolError::Execution(format!("write {raw}: {e}")))?;

        let size = content.len() as u64;
        ctx.bus.emit(Event::FsChanged {
            uid: ctx.uid.clone(),
            path: format!("{}/{raw}", ctx.uid),
            change: if existed { "write" } else { "create" }.to_string(),
            size,
        });
        Ok(json!({ "path": raw, "size": size }))
    }
}

struct FsList;

#[async_trait]
impl Tool for FsList {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "fs_list".to_string(),
            description: "List a directory in the agent home".to_string(),
            required: vec![],
            action: "fs.read".to_string(),
        }
    }

    async fn call(&self, ctx: &ToolCtx, args: &Value) -> Result<Value, ToolError> {
        let raw = args.get("path").and_then(Value::as_str).unwrap_or("");
        let path = if raw.is_empty() {
            ctx.home.clone()
        } else {
            resolve_path(&ctx.home, raw)?
        };

        let mut entries = Vec::new();
        let mut dir = match tokio::fs::read_dir(&path).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(json!({ "path": raw, "entries": [] }))
            }
            Err(e) => return Err(ToolError::Execution(format!("list {raw}: {e}"))),
        };
        while let Ok(Some(entry)) = dir.next_entry().await {
            let meta = entry.metadata().await.ok();
            entries.push(json!({
                "name": entry.file_name().to_string_lossy(),
                "dir": meta.as_ref().map(|m| m.is_dir()).unwrap_or(false),
                "size": meta.map(|m| m.len()).unwrap_or(0),
            }));
        }
        Ok(json!({ "path": raw, "entries": entries }))
    }
}

struct RunCommand;

#[async_trait]
impl Tool for RunCommand {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "run_command".to_string(),
            description: "Run a shell command in the agent home".to_string(),
            required: vec!["command".to_string()],
            action: "process.exec".to_string(),
        }
    }

    async fn call(&self, ctx: &ToolCtx, args: &Value) -> Result<Value, ToolError> {
        let command = str_arg(args, "command")?;
        tokio::fs::create_dir_all(&ctx.home)
            .await
            .map_err(|e| ToolError::Execution(format!("prepare home: {e}")))?;

        let output = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(&ctx.home)
            .output()
            .await
            .map_err(|e| ToolError::Execution(format!("spawn: {e}")))?;

        Ok(json!({
            "exit_code": output.status.code().unwrap_or(-1),
            "stdout": truncate(&String::from_utf8_lossy(&output.stdout)),
            "stderr": truncate(&String::from_utf8_lossy(&output.stderr)),
        }))
    }
}

fn truncate(s: &str) -> String {
    const MAX: usize = 16 * 1024;
    if s.len() <= MAX {
        s.to_string()
    } else {
        let mut end = MAX;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}…[truncated]", &s[..end])
    }
}

struct SendMessage;

#[async_trait]
impl Tool for SendMessage {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "send_message".to_string(),
            description: "Emit a log message visible to subscribers".to_string(),
            required: vec!["message".to_string()],
            action: "agent.message".to_string(),
        }
    }

    async fn call(&self, ctx: &ToolCtx, args: &Value) -> Result<Value, ToolError> {
        let message = str_arg(args, "message")?;
        let level = args
            .get("level")
            .and_then(Value::as_str)
            .unwrap_or("info")
            .to_string();
        ctx.bus.emit(Event::AgentLog {
            pid: ctx.pid,
            level,
            message: message.to_string(),
        });
        Ok(json!({ "sent": true }))
    }
}

struct MemoryPut;

#[async_trait]
impl Tool for MemoryPut {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "memory_put".to_string(),
            description: "Store a memory in a layer".to_string(),
            required: vec!["layer".to_string(), "content".to_string()],
            action: "mem.put".to_string(),
        }
    }

    async fn call(&self, ctx: &ToolCtx, args: &Value) -> Result<Value, ToolError> {
        let layer = str_arg(args, "layer")?;
        let layer = MemoryLayer::parse(layer)
            .ok_or_else(|| ToolError::InvalidArgs(format!("unknown layer '{layer}'")))?;
        let content = str_arg(args, "content")?;
        let importance = args
            .get("importance")
            .and_then(Value::as_f64)
            .unwrap_or(0.5)
            .clamp(0.0, 1.0);

        let memory = MemoryRecord {
            id: MemoryId::new(format!("m-{}", uuid::Uuid::new_v4())),
            agent_uid: ctx.uid.clone(),
            layer,
            content: content.to_string(),
            tags: args
                .get("tags")
                .and_then(Value::as_array)
                .map(|tags| {
                    tags.iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            importance,
            access_count: 0,
            created_at_ms: ctx.now_ms,
            last_accessed_ms: ctx.now_ms,
            expires_at_ms: None,
            source_pid: Some(ctx.pid),
            related: Default::default(),
        };

        let evicted = ctx
            .store
            .put_memory(&memory, ctx.memory_cap)
            .map_err(|e| ToolError::Execution(e.to_string()))?;

        ctx.bus.emit(Event::MemoryStored {
            uid: ctx.uid.clone(),
            memory_id: memory.id.clone(),
            layer,
        });
        if evicted > 0 {
            ctx.bus.emit(Event::MemoryEvicted {
                uid: ctx.uid.clone(),
                layer,
                count: evicted,
            });
        }
        Ok(json!({ "id": memory.id.as_str(), "evicted": evicted }))
    }
}

struct MemorySearch;

#[async_trait]
impl Tool for MemorySearch {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "memory_search".to_string(),
            description: "Search stored memories by content".to_string(),
            required: vec!["query".to_string()],
            action: "mem.search".to_string(),
        }
    }

    async fn call(&self, ctx: &ToolCtx, args: &Value) -> Result<Value, ToolError> {
        let query = str_arg(args, "query")?;
        let limit = args.get("limit").and_then(Value::as_u64).unwrap_or(8) as usize;
        let hits = ctx
            .store
            .search_memories(&ctx.uid, query, limit)
            .map_err(|e| ToolError::Execution(e.to_string()))?;

        Ok(json!({
            "memories": hits
                .iter()
                .map(|m| json!({
                    "id": m.id.as_str(),
                    "layer": m.layer.as_str(),
                    "content": m.content,
                    "importance": m.importance,
                }))
                .collect::<Vec<_>>()
        }))
    }
}

struct PlanUpdate;

#[async_trait]
impl Tool for PlanUpdate {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "plan_update".to_string(),
            description: "Create or update the run's plan".to_string(),
            required: vec![],
            action: "plan.update".to_string(),
        }
    }

    async fn call(&self, ctx: &ToolCtx, args: &Value) -> Result<Value, ToolError> {
        let tree = args
            .get("tree")
            .map(|t| serde_json::from_value(t.clone()))
            .transpose()
            .map_err(|e| ToolError::InvalidArgs(format!("malformed tree: {e}")))?;
        let status = args
            .get("status")
            .and_then(Value::as_str)
            .map(|s| {
                PlanStatus::parse(s)
                    .ok_or_else(|| ToolError::InvalidArgs(format!("unknown status '{s}'")))
            })
            .transpose()?;

        let existing = ctx
            .store
            .plan_for_pid(ctx.pid)
            .map_err(|e| ToolError::Execution(e.to_string()))?;

        let plan = match existing {
            Some(mut plan) => {
                if let Some(tree) = tree {
                    plan.tree = tree;
                }
                if let Some(status) = status {
                    if plan.status != status && !plan.status.can_transition(status) {
                        return Err(ToolError::InvalidArgs(format!(
                            "plan is {} and cannot become {}",
                            plan.status.as_str(),
                            status.as_str()
                        )));
                    }
                    plan.status = status;
                }
                plan.updated_at_ms = ctx.now_ms;
                ctx.store
                    .upsert_plan(&plan)
                    .map_err(|e| ToolError::Execution(e.to_string()))?;
                ctx.bus.emit(Event::PlanUpdated {
                    plan_id: plan.id.clone(),
                    status: plan.status,
                });
                plan
            }
            None => {
                let plan = PlanRecord {
                    id: PlanId::new(format!("plan-{}", uuid::Uuid::new_v4())),
                    pid: ctx.pid,
                    agent_uid: ctx.uid.clone(),
                    status: status.unwrap_or(PlanStatus::Active),
                    tree: tree.unwrap_or_default(),
                    created_at_ms: ctx.now_ms,
                    updated_at_ms: ctx.now_ms,
                };
                ctx.store
                    .upsert_plan(&plan)
                    .map_err(|e| ToolError::Execution(e.to_string()))?;
                ctx.bus.emit(Event::PlanCreated {
                    pid: ctx.pid,
                    plan_id: plan.id.clone(),
                });
                plan
            }
        };

        Ok(json!({ "id": plan.id.as_str(), "status": plan.status.as_str() }))
    }
}

/// Explicit terminal marker. The loop completes after observing it.
struct Done;

#[async_trait]
impl Tool for Done {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "done".to_string(),
            description: "Finish the run with a summary".to_string(),
            required: vec![],
            action: "agent.done".to_string(),
        }
    }

    async fn call(&self, _ctx: &ToolCtx, args: &Value) -> Result<Value, ToolError> {
        let summary = args.get("summary").and_then(Value::as_str).unwrap_or("");
        Ok(json!({ "done": true, "summary": summary }))
    }
}
