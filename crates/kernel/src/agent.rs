// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The per-process reasoning loop
//!
//! One task per spawned process drives think → act → observe until a
//! terminal condition. Pause and cancellation are cooperative and only
//! observed at step boundaries.

use crate::chat::{ChatMessage, ChatOutcome};
use crate::tools::{ToolCtx, ToolError};
use crate::Kernel;
use aether_core::{
    AgentConfig, AgentPhase, Clock, Event, ExitReason, ProcessInfo, ReflectionRecord,
};
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Control handle for a running loop, owned by the kernel's agent map.
#[derive(Clone)]
pub struct AgentHandle {
    pub cancel: CancellationToken,
    paused: Arc<Mutex<bool>>,
    unpause: Arc<Notify>,
    inbox: Arc<Mutex<Vec<String>>>,
}

impl AgentHandle {
    pub fn new() -> Self {
        Self {
            cancel: CancellationToken::new(),
            paused: Arc::new(Mutex::new(false)),
            unpause: Arc::new(Notify::new()),
            inbox: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn pause(&self) {
        *self.paused.lock() = true;
    }

    pub fn resume(&self) {
        *self.paused.lock() = false;
        self.unpause.notify_waiters();
    }

    /// Queue a user message for the next think.
    pub fn inject(&self, text: String) {
        self.inbox.lock().push(text);
    }

    fn drain_inbox(&self) -> Vec<String> {
        std::mem::take(&mut *self.inbox.lock())
    }

    /// Block while paused; returns false if cancelled while waiting.
    async fn wait_if_paused(&self) -> bool {
        loop {
            if self.cancel.is_cancelled() {
                return false;
            }
            if !*self.paused.lock() {
                return true;
            }
            tokio::select! {
                _ = self.unpause.notified() => {}
                _ = self.cancel.cancelled() => return false,
            }
        }
    }
}

impl Default for AgentHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Drive one process to completion. Runs as its own tokio task.
pub(crate) async fn run_agent_loop<C: Clock>(
    kernel: Arc<Kernel<C>>,
    info: ProcessInfo,
    config: AgentConfig,
    handle: AgentHandle,
) {
    let pid = info.pid;
    let subject = kernel.subject_for(&info.uid);
    let specs = kernel.tools.specs();

    let mut transcript = vec![
        ChatMessage::system(format!(
            "You are {}, an autonomous agent. Work toward the goal step by step, \
             using tools; call `done` when finished.",
            info.role
        )),
        ChatMessage::user(config.goal.clone()),
    ];

    let mut steps_taken = 0u32;
    let mut reason = ExitReason::Limit;

    'steps: for step in 0..config.max_steps {
        if !handle.wait_if_paused().await {
            reason = ExitReason::Killed;
            break 'steps;
        }

        for injected in handle.drain_inbox() {
            transcript.push(ChatMessage::user(injected));
        }

        steps_taken = step + 1;
        kernel.table.set_phase(pid, AgentPhase::Thinking);

        let outcome = tokio::time::timeout(
            kernel.config.agent.chat_timeout,
            kernel.chat.step(&transcript, &specs),
        )
        .await;

        let ChatOutcome {
            content,
            tool_calls,
            usage: _,
        } = match outcome {
            Err(_) => {
                warn!(pid = %pid, "chat step timed out");
                kernel.bus.emit(Event::AgentLog {
                    pid,
                    level: "error".to_string(),
                    message: "llm call timed out".to_string(),
                });
                reason = ExitReason::Failed;
                break 'steps;
            }
            Ok(Err(e)) => {
                warn!(pid = %pid, error = %e, "chat step failed");
                kernel.bus.emit(Event::AgentLog {
                    pid,
                    level: "error".to_string(),
                    message: format!("llm unavailable: {e}"),
                });
                reason = ExitReason::Failed;
                break 'steps;
            }
            Ok(Ok(outcome)) => outcome,
        };

        let thought = content.unwrap_or_default();
        kernel.bus.emit(Event::AgentThought {
            pid,
            step,
            content: thought.clone(),
        });
        if !thought.is_empty() {
            transcript.push(ChatMessage::assistant(thought));
        }

        // No tool call is the terminal marker.
        let Some(call) = tool_calls.into_iter().next() else {
            reason = ExitReason::Done;
            break 'steps;
        };

        kernel.table.set_phase(pid, AgentPhase::Acting);
        kernel.bus.emit(Event::AgentAction {
            pid,
            step,
            tool: call.name.clone(),
            args: call.args.clone(),
        });

        let ctx = ToolCtx {
            pid,
            uid: info.uid.clone(),
            home: kernel.home_for(&info.uid),
            store: Arc::clone(&kernel.store),
            bus: kernel.bus.clone(),
            now_ms: kernel.clock.epoch_ms(),
            memory_cap: kernel.config.memory.layer_cap,
        };

        let result = kernel.tools.dispatch(&subject, &ctx, &call).await;
        kernel.table.set_phase(pid, AgentPhase::Observing);

        let observation = match result {
            Ok(value) => {
                kernel.bus.emit(Event::AgentObservation {
                    pid,
                    step,
                    result: value.clone(),
                });
                transcript.push(ChatMessage::tool(value.to_string()));
                if call.name == "done" {
                    reason = ExitReason::Done;
                    break 'steps;
                }
                continue 'steps;
            }
            Err(err) => err,
        };

        if observation.is_fatal() {
            kernel.bus.emit(Event::AgentObservation {
                pid,
                step,
                result: json!({ "error": observation.to_string(), "fatal": true }),
            });
            reason = ExitReason::Failed;
            break 'steps;
        }

        // Non-fatal tool errors become observations; the loop goes on.
        let error_value = json!({
            "error": error_kind(&observation),
            "message": observation.to_string(),
        });
        kernel.bus.emit(Event::AgentObservation {
            pid,
            step,
            result: error_value.clone(),
        });
        transcript.push(ChatMessage::tool(error_value.to_string()));
    }

    let final_phase = match reason {
        ExitReason::Done | ExitReason::Limit => AgentPhase::Completed,
        ExitReason::Failed | ExitReason::Killed => AgentPhase::Failed,
    };
    kernel.table.set_phase(pid, final_phase);

    if matches!(reason, ExitReason::Done | ExitReason::Limit) {
        let reflection = ReflectionRecord {
            id: 0,
            pid,
            agent_uid: info.uid.clone(),
            content: format!("finished after {steps_taken} step(s): {}", reason.as_str()),
            created_at_ms: kernel.clock.epoch_ms(),
        };
        if let Err(e) = kernel.store.insert_reflection(&reflection) {
            debug!(pid = %pid, error = %e, "reflection write failed");
        }
    }

    if let Err(e) = kernel.table.exit(pid, reason) {
        debug!(pid = %pid, error = %e, "loop exit raced another transition");
    }
    kernel.forget_agent(pid);
}

fn error_kind(err: &ToolError) -> &'static str {
    match err {
        ToolError::NotFound(_) => "tool_not_found",
        ToolError::InvalidArgs(_) => "arg_validation",
        ToolError::Forbidden(_) => "forbidden",
        ToolError::Timeout(_) => "tool_timeout",
        ToolError::Execution(_) => "tool_execution",
        ToolError::Fatal(_) => "fatal",
    }
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
