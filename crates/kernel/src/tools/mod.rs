// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tool registry and dispatch
//!
//! Tools are named handlers with a declared argument schema and an ACL
//! action. Dispatch validates arguments, consults the policy engine
//! for the calling subject, and runs the handler under a timeout.

mod builtin;

pub use builtin::register_builtins;

use crate::bus::EventBus;
use crate::chat::ToolCall;
use crate::policy::{PolicyEngine, Subject};
use aether_store::StateStore;
use aether_core::{Pid, Uid};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Declared surface of a tool, shown to the LLM and used for argument
/// validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// Required top-level argument keys.
    pub required: Vec<String>,
    /// ACL action checked before the handler runs.
    pub action: String,
}

/// Per-call context handed to tool handlers.
pub struct ToolCtx {
    pub pid: Pid,
    pub uid: Uid,
    /// The caller's sandboxed home directory.
    pub home: PathBuf,
    pub store: Arc<StateStore>,
    pub bus: EventBus,
    pub now_ms: u64,
    pub memory_cap: usize,
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("tool not found: {0}")]
    NotFound(String),

    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("tool timed out after {0} ms")]
    Timeout(u64),

    #[error("tool execution failed: {0}")]
    Execution(String),

    /// Aborts the agent loop instead of becoming an observation.
    #[error("fatal tool error: {0}")]
    Fatal(String),
}

impl ToolError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, ToolError::Fatal(_))
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn spec(&self) -> ToolSpec;
    async fn call(&self, ctx: &ToolCtx, args: &serde_json::Value)
        -> Result<serde_json::Value, ToolError>;
}

pub struct ToolHost {
    tools: RwLock<BTreeMap<String, Arc<dyn Tool>>>,
    policy: Arc<PolicyEngine>,
    timeout: Duration,
}

impl ToolHost {
    pub fn new(policy: Arc<PolicyEngine>, timeout: Duration) -> Self {
        Self {
            tools: RwLock::new(BTreeMap::new()),
            policy,
            timeout,
        }
    }

    pub fn register(&self, tool: Arc<dyn Tool>) {
        let name = tool.spec().name;
        self.tools.write().insert(name, tool);
    }

    /// Specs of every registered tool, name order.
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.read().values().map(|t| t.spec()).collect()
    }

    /// Validate, authorize and run one tool call.
    pub async fn dispatch(
        &self,
        subject: &Subject,
        ctx: &ToolCtx,
        call: &ToolCall,
    ) -> Result<serde_json::Value, ToolError> {
        let tool = self
            .tools
            .read()
            .get(&call.name)
            .cloned()
            .ok_or_else(|| ToolError::NotFound(call.name.clone()))?;

        let spec = tool.spec();
        validate_args(&spec, &call.args)?;

        if !self
            .policy
            .can(subject, &spec.action, &call.name, Some(&ctx.uid))
        {
            return Err(ToolError::Forbidden(format!(
                "{} may not {}",
                subject.uid, spec.action
            )));
        }

        let timeout_ms = self.timeout.as_millis() as u64;
        match tokio::time::timeout(self.timeout, tool.call(ctx, &call.args)).await {
            Ok(result) => result,
            Err(_) => Err(ToolError::Timeout(timeout_ms)),
        }
    }
}

fn validate_args(spec: &ToolSpec, args: &serde_json::Value) -> Result<(), ToolError> {
    let object = match args {
        serde_json::Value::Object(map) => map,
        serde_json::Value::Null if spec.required.is_empty() => return Ok(()),
        _ => {
            return Err(ToolError::InvalidArgs(format!(
                "{} expects an object argument",
                spec.name
            )))
        }
    };

    for key in &spec.required {
        if !object.contains_key(key) {
            return Err(ToolError::InvalidArgs(format!(
                "{} requires '{key}'",
                spec.name
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "tools_tests.rs"]
mod tests;
