// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! aether-kernel: process supervision, events, scheduling, policy
//!
//! Components are constructed in dependency order (bus, store
//! wiring, process table, policy, tools, auth) and the [`Kernel`]
//! value is the single composition root handed to the gateway.

pub mod agent;
pub mod audit;
pub mod auth;
pub mod bus;
pub mod chat;
pub mod config;
pub mod metrics;
pub mod policy;
pub mod sched;
pub mod snapshot;
pub mod table;
pub mod tools;
pub mod webhook;

pub use auth::{AuthService, AuthSession};
pub use bus::{EventBus, QueueSubscriber, SubscriptionHandle};
pub use chat::{ChatMessage, ChatOutcome, ChatStep, ChatUsage, ScriptedChat, ToolCall};
pub use config::KernelConfig;
pub use policy::{PolicyEngine, Subject};
pub use sched::{AgentSpawner, CronDriver, TriggerDriver};
pub use table::ProcessTable;
pub use tools::{Tool, ToolCtx, ToolError, ToolHost, ToolSpec};

use crate::agent::{run_agent_loop, AgentHandle};
use crate::audit::AuditLogger;
use crate::metrics::MetricsSampler;
use crate::webhook::WebhookDispatcher;
use aether_core::{
    AgentConfig, Clock, ErrorCode, KernelError, Pid, ProcessInfo, Role, Uid,
};
use aether_store::StateStore;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Weak};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Degenerate hub-and-spoke cluster summary: this node plus capacity
/// counters. There is no consensus and no peer discovery.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterInfo {
    pub node_id: String,
    pub capacity: usize,
    pub running: usize,
    pub persistence_disabled: bool,
    pub peers: Vec<String>,
}

/// The composition root. Owns every kernel component and the map of
/// live agent loop handles.
pub struct Kernel<C: Clock> {
    pub config: KernelConfig,
    pub clock: C,
    pub bus: EventBus,
    pub store: Arc<StateStore>,
    pub table: Arc<ProcessTable<C>>,
    pub policy: Arc<PolicyEngine>,
    pub tools: Arc<ToolHost>,
    pub auth: AuthService<C>,
    pub(crate) chat: Arc<dyn ChatStep>,
    audit: Arc<AuditLogger<C>>,
    agents: Mutex<HashMap<Pid, AgentHandle>>,
    self_weak: Weak<Kernel<C>>,
    node_id: String,
    _store_subscription: SubscriptionHandle,
    _audit_subscriptions: Vec<SubscriptionHandle>,
}

impl<C: Clock> Kernel<C> {
    /// Build the kernel in dependency order.
    pub fn new(
        config: KernelConfig,
        clock: C,
        store: Arc<StateStore>,
        chat: Arc<dyn ChatStep>,
    ) -> Arc<Self> {
        let bus = EventBus::new(&config.bus);

        // Hot event-derived rows flow through this subscription.
        let store_subscription = {
            let store = Arc::clone(&store);
            let clock = clock.clone();
            bus.subscribe("*", move |event| {
                store.apply_event(event, clock.epoch_ms());
            })
        };

        let table = Arc::new(ProcessTable::new(
            bus.clone(),
            clock.clone(),
            config.max_processes,
        ));
        let policy = Arc::new(PolicyEngine::new(Arc::clone(&store)));
        let tools = Arc::new(ToolHost::new(
            Arc::clone(&policy),
            config.agent.tool_timeout,
        ));
        tools::register_builtins(&tools);

        let auth = AuthService::new(
            Arc::clone(&store),
            bus.clone(),
            clock.clone(),
            config.auth.clone(),
        );

        let audit = Arc::new(AuditLogger::new(Arc::clone(&store), clock.clone()));
        let audit_subscriptions = Arc::clone(&audit).attach(&bus);

        Arc::new_cyclic(|self_weak| Self {
            node_id: format!("node-{}", uuid::Uuid::new_v4()),
            config,
            clock,
            bus,
            store,
            table,
            policy,
            tools,
            auth,
            chat,
            audit,
            agents: Mutex::new(HashMap::new()),
            self_weak: self_weak.clone(),
            _store_subscription: store_subscription,
            _audit_subscriptions: audit_subscriptions,
        })
    }

    /// Launch the periodic drivers. Tasks stop when `cancel` fires.
    pub fn start(self: &Arc<Self>, cancel: CancellationToken) -> Vec<tokio::task::JoinHandle<()>> {
        let spawner: Arc<dyn AgentSpawner> = Arc::clone(self) as Arc<dyn AgentSpawner>;

        let cron = CronDriver::new(
            Arc::clone(&self.store),
            self.bus.clone(),
            Arc::clone(&spawner),
            self.clock.clone(),
            self.config.cron.clone(),
        );
        let trigger = TriggerDriver::new(
            Arc::clone(&self.store),
            self.bus.clone(),
            Arc::clone(&spawner),
            self.clock.clone(),
        );
        let webhooks = WebhookDispatcher::new(
            Arc::clone(&self.store),
            self.bus.clone(),
            self.clock.clone(),
            self.config.webhook.clone(),
        );
        let sampler = MetricsSampler::new(
            Arc::clone(&self.table),
            self.bus.clone(),
            self.clock.clone(),
        );

        info!(node = %self.node_id, "kernel drivers starting");
        vec![
            self.table
                .spawn_reaper(self.config.reaper.clone(), cancel.clone()),
            cron.spawn(cancel.clone()),
            trigger.spawn(cancel.clone()),
            webhooks.spawn(cancel.clone()),
            sampler.spawn(self.config.metrics.clone(), cancel.clone()),
            Arc::clone(&self.audit).spawn_pruner(self.config.retention.clone(), cancel),
        ]
    }

    /// A dispatcher sharing the kernel's store and bus, for DLQ replay
    /// from the gateway.
    pub fn webhook_dispatcher(&self) -> WebhookDispatcher<C> {
        WebhookDispatcher::new(
            Arc::clone(&self.store),
            self.bus.clone(),
            self.clock.clone(),
            self.config.webhook.clone(),
        )
    }

    /// The sandboxed home directory for a user.
    pub fn home_for(&self, uid: &Uid) -> PathBuf {
        self.config.home_dir.join(uid.as_str())
    }

    /// Resolve a uid to an ACL subject; unknown uids act as plain users.
    pub fn subject_for(&self, uid: &Uid) -> Subject {
        let role = self
            .store
            .get_user(uid)
            .ok()
            .flatten()
            .map(|user| user.role)
            .unwrap_or(Role::User);
        Subject::new(uid.clone(), role)
    }

    /// Spawn a supervised agent process and its reasoning loop task.
    pub fn spawn_process(
        &self,
        owner: &Uid,
        config: &AgentConfig,
    ) -> Result<ProcessInfo, KernelError> {
        let kernel = self
            .self_weak
            .upgrade()
            .ok_or_else(|| KernelError::internal("kernel is shutting down"))?;

        let info = self.table.spawn(owner, config)?;
        if let Err(e) = self.store.upsert_process(&info) {
            tracing::warn!(pid = %info.pid, error = %e, "process row write failed");
        }

        let handle = AgentHandle::new();
        self.agents.lock().insert(info.pid, handle.clone());

        tokio::spawn(run_agent_loop(
            kernel,
            info.clone(),
            config.clone(),
            handle,
        ));
        Ok(info)
    }

    fn live_handle(&self, pid: Pid) -> Result<AgentHandle, KernelError> {
        self.agents
            .lock()
            .get(&pid)
            .cloned()
            .ok_or_else(|| KernelError::invalid_state(format!("process {pid} is gone")))
    }

    /// Pause a running agent at its next step boundary.
    pub fn pause_agent(&self, pid: Pid) -> Result<(), KernelError> {
        let handle = self.live_handle(pid)?;
        self.table.pause(pid)?;
        handle.pause();
        Ok(())
    }

    /// Resume a paused agent.
    pub fn resume_agent(&self, pid: Pid) -> Result<(), KernelError> {
        let handle = self.live_handle(pid)?;
        self.table.resume(pid)?;
        handle.resume();
        Ok(())
    }

    /// Cooperative kill: the loop observes the token at the next step
    /// boundary and reports a killed exit.
    pub fn kill_process(&self, pid: Pid) -> Result<(), KernelError> {
        let info = self
            .table
            .get(pid)
            .ok_or_else(|| KernelError::not_found(format!("process {pid}")))?;
        if info.state.is_terminal() {
            return Err(KernelError::new(
                ErrorCode::InvalidState,
                format!("process {pid} already exited"),
            ));
        }
        let handle = self.live_handle(pid)?;
        handle.cancel.cancel();
        // A paused loop must wake to observe the cancellation.
        handle.resume();
        Ok(())
    }

    /// Queue a user message for the agent's next think.
    pub fn message_agent(&self, pid: Pid, text: String) -> Result<(), KernelError> {
        let handle = self.live_handle(pid)?;
        handle.inject(text);
        Ok(())
    }

    pub(crate) fn forget_agent(&self, pid: Pid) {
        self.agents.lock().remove(&pid);
    }

    /// Audit a client command with sanitized arguments.
    pub fn audit_command(
        &self,
        actor_uid: Option<&Uid>,
        action: &str,
        target: Option<String>,
        args: &serde_json::Value,
    ) {
        self.audit.record_command(actor_uid, action, target, args);
    }

    pub fn cluster_info(&self) -> ClusterInfo {
        ClusterInfo {
            node_id: self.node_id.clone(),
            capacity: self.config.max_processes,
            running: self.table.live_count(),
            persistence_disabled: self.store.persistence_disabled(),
            peers: Vec::new(),
        }
    }
}

impl<C: Clock> AgentSpawner for Kernel<C> {
    fn spawn_agent(&self, owner: &Uid, config: &AgentConfig) -> Result<ProcessInfo, KernelError> {
        self.spawn_process(owner, config)
    }
}

#[cfg(test)]
#[path = "kernel_tests.rs"]
mod tests;
