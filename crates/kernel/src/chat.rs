// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pluggable reasoning step
//!
//! The kernel never talks to an LLM provider directly; it drives a
//! [`ChatStep`] implementation one think-step at a time. Provider
//! adapters live outside the kernel, behind this trait.

use crate::tools::ToolSpec;
use aether_core::KernelError;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }

    pub fn tool(content: impl Into<String>) -> Self {
        Self {
            role: "tool".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub name: String,
    #[serde(default)]
    pub args: serde_json::Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

/// One think-step result.
///
/// An outcome with no tool calls is the terminal marker: the agent has
/// nothing left to do.
#[derive(Debug, Clone, Default)]
pub struct ChatOutcome {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub usage: Option<ChatUsage>,
}

/// A single reasoning step against an LLM.
#[async_trait]
pub trait ChatStep: Send + Sync {
    async fn step(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
    ) -> Result<ChatOutcome, KernelError>;
}

/// Deterministic `ChatStep` fed from a fixed script.
///
/// Returns outcomes in order and a terminal (empty) outcome once the
/// script is exhausted.
pub struct ScriptedChat {
    script: Mutex<VecDeque<ChatOutcome>>,
}

impl ScriptedChat {
    pub fn new(outcomes: impl IntoIterator<Item = ChatOutcome>) -> Self {
        Self {
            script: Mutex::new(outcomes.into_iter().collect()),
        }
    }

    /// An outcome that thinks aloud and calls one tool.
    pub fn act(thought: &str, tool: &str, args: serde_json::Value) -> ChatOutcome {
        ChatOutcome {
            content: Some(thought.to_string()),
            tool_calls: vec![ToolCall {
                name: tool.to_string(),
                args,
            }],
            usage: None,
        }
    }

    /// A terminal outcome: thought only, no tool call.
    pub fn finish(thought: &str) -> ChatOutcome {
        ChatOutcome {
            content: Some(thought.to_string()),
            tool_calls: Vec::new(),
            usage: None,
        }
    }
}

#[async_trait]
impl ChatStep for ScriptedChat {
    async fn step(
        &self,
        _messages: &[ChatMessage],
        _tools: &[ToolSpec],
    ) -> Result<ChatOutcome, KernelError> {
        Ok(self.script.lock().pop_front().unwrap_or_default())
    }
}
