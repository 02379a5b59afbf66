// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Offline reasoning step
//!
//! Used when no LLM provider adapter is plugged in: every agent takes
//! one visible step acknowledging its goal, then finishes. This keeps
//! the whole kernel surface (spawning, events, history, schedulers)
//! exercisable without provider credentials.

use aether_kernel::{ChatMessage, ChatOutcome, ChatStep, ToolCall, ToolSpec};
use aether_core::KernelError;
use async_trait::async_trait;

pub struct OfflineChat;

#[async_trait]
impl ChatStep for OfflineChat {
    async fn step(
        &self,
        messages: &[ChatMessage],
        _tools: &[ToolSpec],
    ) -> Result<ChatOutcome, KernelError> {
        // Second call: the transcript already holds our summary; stop.
        if messages.iter().any(|m| m.role == "tool") {
            return Ok(ChatOutcome::default());
        }

        let goal = messages
            .iter()
            .find(|m| m.role == "user")
            .map(|m| m.content.as_str())
            .unwrap_or("(no goal)");

        Ok(ChatOutcome {
            content: Some(format!(
                "No provider adapter is configured; acknowledging goal: {goal}"
            )),
            tool_calls: vec![ToolCall {
                name: "done".to_string(),
                args: serde_json::json!({ "summary": "offline mode, no provider configured" }),
            }],
            usage: None,
        })
    }
}
