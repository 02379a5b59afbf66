// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The process table: pid allocation, lifecycle transitions, reaping
//!
//! The table is the single owner of live `ProcessInfo`. Every mutation
//! goes through a method here and is announced on the bus; other
//! components only ever see copies.

use crate::bus::EventBus;
use crate::config::ReaperConfig;
use aether_core::{
    AgentConfig, AgentPhase, Clock, ErrorCode, Event, ExitReason, KernelError, Pid, ProcState,
    ProcessInfo, Uid,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub struct ProcessTable<C: Clock> {
    procs: Mutex<HashMap<Pid, ProcessInfo>>,
    next_pid: AtomicI64,
    bus: EventBus,
    clock: C,
    max_processes: usize,
}

impl<C: Clock> ProcessTable<C> {
    pub fn new(bus: EventBus, clock: C, max_processes: usize) -> Self {
        Self {
            procs: Mutex::new(HashMap::new()),
            next_pid: AtomicI64::new(1),
            bus,
            clock,
            max_processes,
        }
    }

    /// Allocate a pid and register a new process in `running` state.
    ///
    /// Emits `process.spawned` followed by the created→running state
    /// change. Pids are monotonic and never reused.
    pub fn spawn(&self, uid: &Uid, config: &AgentConfig) -> Result<ProcessInfo, KernelError> {
        let info = {
            let mut procs = self.procs.lock();
            let live = procs.values().filter(|p| !p.state.is_terminal()).count();
            if live >= self.max_processes {
                return Err(KernelError::new(
                    ErrorCode::CapacityExceeded,
                    format!("process table full ({live}/{})", self.max_processes),
                ));
            }

            let pid = Pid(self.next_pid.fetch_add(1, Ordering::SeqCst));
            let name = if config.name.is_empty() {
                format!("agent-{pid}")
            } else {
                config.name.clone()
            };
            let info = ProcessInfo {
                pid,
                uid: uid.clone(),
                name,
                role: config.role.clone(),
                goal: config.goal.clone(),
                state: ProcState::Created,
                phase: AgentPhase::Idle,
                exit_code: None,
                created_at_ms: self.clock.epoch_ms(),
                exited_at_ms: None,
                env: config.env.clone(),
                tty_id: None,
                vnc_ws_url: None,
            };
            procs.insert(pid, info.clone());
            info
        };

        info!(pid = %info.pid, uid = %info.uid, role = %info.role, "process spawned");
        self.bus.emit(Event::ProcessSpawned {
            pid: info.pid,
            uid: info.uid.clone(),
            name: info.name.clone(),
            role: info.role.clone(),
            goal: info.goal.clone(),
        });

        // Spawn lands in `running` immediately; `created` exists only
        // as the announced starting point of the lifecycle.
        let running = self.transition(info.pid, ProcState::Running)?;
        Ok(running)
    }

    pub fn get(&self, pid: Pid) -> Option<ProcessInfo> {
        self.procs.lock().get(&pid).cloned()
    }

    /// Live processes, unordered.
    pub fn list(&self) -> Vec<ProcessInfo> {
        self.procs.lock().values().cloned().collect()
    }

    pub fn live_count(&self) -> usize {
        self.procs
            .lock()
            .values()
            .filter(|p| !p.state.is_terminal())
            .count()
    }

    /// Apply a lifecycle transition, validating it against the DAG.
    pub fn transition(&self, pid: Pid, to: ProcState) -> Result<ProcessInfo, KernelError> {
        let (from, info) = {
            let mut procs = self.procs.lock();
            let info = procs
                .get_mut(&pid)
                .ok_or_else(|| KernelError::not_found(format!("process {pid}")))?;

            let from = info.state;
            if !from.can_transition(to) {
                return Err(KernelError::invalid_state(format!(
                    "process {pid} is {from} and cannot become {to}"
                )));
            }
            info.state = to;
            if to.is_terminal() && info.exited_at_ms.is_none() {
                info.exited_at_ms = Some(self.clock.epoch_ms());
            }
            (from, info.clone())
        };

        debug!(pid = %pid, %from, %to, "state change");
        self.bus.emit(Event::ProcessStateChange { pid, from, to });
        Ok(info)
    }

    /// Record the reasoning phase (not part of the lifecycle DAG).
    pub fn set_phase(&self, pid: Pid, phase: AgentPhase) {
        let changed = {
            let mut procs = self.procs.lock();
            match procs.get_mut(&pid) {
                Some(info) if info.phase != phase => {
                    info.phase = phase;
                    true
                }
                _ => false,
            }
        };
        if changed {
            self.bus.emit(Event::AgentPhaseChange { pid, phase });
        }
    }

    pub fn set_sandbox_handles(&self, pid: Pid, tty_id: Option<String>, vnc_ws_url: Option<String>) {
        let mut procs = self.procs.lock();
        if let Some(info) = procs.get_mut(&pid) {
            if tty_id.is_some() {
                info.tty_id = tty_id;
            }
            if vnc_ws_url.is_some() {
                info.vnc_ws_url = vnc_ws_url;
            }
        }
    }

    /// Pause a running process.
    pub fn pause(&self, pid: Pid) -> Result<(), KernelError> {
        self.transition(pid, ProcState::Paused)?;
        self.bus.emit(Event::AgentPaused { pid });
        Ok(())
    }

    /// Resume a paused process.
    pub fn resume(&self, pid: Pid) -> Result<(), KernelError> {
        self.transition(pid, ProcState::Running)?;
        self.bus.emit(Event::AgentResumed { pid });
        Ok(())
    }

    /// Move a process to zombie with its exit code set exactly once.
    ///
    /// A paused process passes through `running` first so the emitted
    /// state sequence stays a path in the lifecycle DAG.
    pub fn exit(&self, pid: Pid, reason: ExitReason) -> Result<ProcessInfo, KernelError> {
        let current = self
            .get(pid)
            .ok_or_else(|| KernelError::not_found(format!("process {pid}")))?;

        if current.state.is_terminal() {
            return Err(KernelError::invalid_state(format!(
                "process {pid} already exited"
            )));
        }

        if current.state == ProcState::Paused {
            self.transition(pid, ProcState::Running)?;
        }

        let code = reason.exit_code();
        {
            let mut procs = self.procs.lock();
            if let Some(info) = procs.get_mut(&pid) {
                if info.exit_code.is_none() {
                    info.exit_code = Some(code);
                }
            }
        }
        let info = self.transition(pid, ProcState::Zombie)?;

        self.bus.emit(Event::ProcessExit {
            pid,
            code,
            reason: reason.as_str().to_string(),
        });
        Ok(info)
    }

    /// Collect zombies older than the grace period.
    ///
    /// Reaping removes the live entry; the store's history row remains.
    pub fn reap_once(&self, grace_ms: u64) -> Vec<Pid> {
        let now = self.clock.epoch_ms();
        let reaped: Vec<Pid> = {
            let mut procs = self.procs.lock();
            let expired: Vec<Pid> = procs
                .values()
                .filter(|info| {
                    info.state == ProcState::Zombie
                        && info
                            .exited_at_ms
                            .map(|at| now.saturating_sub(at) >= grace_ms)
                            .unwrap_or(false)
                })
                .map(|info| info.pid)
                .collect();

            for pid in &expired {
                if let Some(info) = procs.get_mut(pid) {
                    info.state = ProcState::Dead;
                }
                procs.remove(pid);
            }
            expired
        };

        for pid in &reaped {
            debug!(pid = %pid, "reaped");
            self.bus.emit(Event::ProcessReaped { pid: *pid });
        }
        reaped
    }

    /// Periodic reaper task.
    pub fn spawn_reaper(
        self: &Arc<Self>,
        config: ReaperConfig,
        cancel: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        let table = Arc::clone(self);
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(config.scan_interval);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tick.tick() => {
                        table.reap_once(config.zombie_grace.as_millis() as u64);
                    }
                }
            }
        })
    }
}

#[cfg(test)]
#[path = "table_tests.rs"]
mod tests;
