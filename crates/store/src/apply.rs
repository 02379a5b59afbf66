// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event-driven writes
//!
//! The kernel subscribes the store to its bus and feeds every event
//! through [`StateStore::apply_event`]. Failures here are logged and
//! swallowed: a degraded database must never stall the event loop.

use crate::{StateStore, StoreError};
use aether_core::{AgentLogEntry, Event, FileMetadata, FileType, LogPhase};
use tracing::warn;

impl StateStore {
    /// Apply one kernel event to the durable tables.
    pub fn apply_event(&self, event: &Event, now_ms: u64) {
        if let Err(e) = self.apply_event_inner(event, now_ms) {
            warn!(topic = event.topic(), error = %e, "event-driven write failed");
        }
    }

    fn apply_event_inner(&self, event: &Event, now_ms: u64) -> Result<(), StoreError> {
        match event {
            Event::ProcessStateChange { pid, to, .. } => {
                self.set_process_state(*pid, *to)?;
            }

            Event::ProcessExit { pid, code, .. } => {
                self.record_process_exit(*pid, *code, now_ms)?;
            }

            Event::ProcessReaped { pid } => {
                self.set_process_state(*pid, aether_core::ProcState::Dead)?;
            }

            Event::AgentPhaseChange { pid, phase } => {
                self.set_process_phase(*pid, *phase)?;
            }

            Event::AgentThought { pid, step, content } => {
                self.append_agent_log(&AgentLogEntry {
                    id: 0,
                    pid: *pid,
                    step: *step,
                    phase: LogPhase::Thought,
                    tool: None,
                    content: content.clone(),
                    timestamp: now_ms,
                })?;
            }

            Event::AgentAction {
                pid,
                step,
                tool,
                args,
            } => {
                self.append_agent_log(&AgentLogEntry {
                    id: 0,
                    pid: *pid,
                    step: *step,
                    phase: LogPhase::Action,
                    tool: Some(tool.clone()),
                    content: args.to_string(),
                    timestamp: now_ms,
                })?;
            }

            Event::AgentObservation { pid, step, result } => {
                self.append_agent_log(&AgentLogEntry {
                    id: 0,
                    pid: *pid,
                    step: *step,
                    phase: LogPhase::Observation,
                    tool: None,
                    content: result.to_string(),
                    timestamp: now_ms,
                })?;
            }

            Event::AgentLog { pid, level, message } => {
                self.append_agent_log(&AgentLogEntry {
                    id: 0,
                    pid: *pid,
                    step: 0,
                    phase: LogPhase::System,
                    tool: None,
                    content: format!("[{level}] {message}"),
                    timestamp: now_ms,
                })?;
            }

            Event::FsChanged {
                uid,
                path,
                change,
                size,
            } => {
                if change == "delete" {
                    self.delete_file(path)?;
                } else {
                    let existing = self.get_file(path)?;
                    self.upsert_file(&FileMetadata {
                        path: path.clone(),
                        owner_uid: uid.clone(),
                        size: *size,
                        file_type: FileType::File,
                        created_at_ms: existing.map(|f| f.created_at_ms).unwrap_or(now_ms),
                        modified_at_ms: now_ms,
                    })?;
                }
            }

            Event::KernelMetrics {
                timestamp,
                process_count,
                cpu_percent,
                memory_mb,
                container_count,
            } => {
                self.append_metric(&aether_core::KernelMetric {
                    timestamp: *timestamp,
                    process_count: *process_count,
                    cpu_percent: *cpu_percent,
                    memory_mb: *memory_mb,
                    container_count: *container_count,
                })?;
            }

            // Everything else is either written through an explicit API
            // call or not persisted at all.
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "apply_tests.rs"]
mod tests;
