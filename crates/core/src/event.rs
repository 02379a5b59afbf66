// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event types for the Aether kernel
//!
//! Every kernel event is a variant of [`Event`], serialized with
//! `{"type": "<topic>", ...fields}` framing. Topics are dot-separated
//! and map one-to-one onto variants, so subscribers branch on the
//! variant rather than on untyped payloads.

use crate::id::{CronId, MemoryId, Pid, PlanId, PolicyId, TriggerId, Uid, WebhookId};
use crate::process::{AgentPhase, ProcState};
use crate::records::{MemoryLayer, PlanStatus};
use serde::{Deserialize, Serialize};

/// Events published on the kernel bus.
///
/// Serializes with `{"type": "process.spawned", ...fields}` format.
/// Unknown type tags deserialize to `Custom`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    // -- process --
    #[serde(rename = "process.spawned")]
    ProcessSpawned {
        pid: Pid,
        uid: Uid,
        name: String,
        role: String,
        goal: String,
    },

    #[serde(rename = "process.stateChange")]
    ProcessStateChange {
        pid: Pid,
        from: ProcState,
        to: ProcState,
    },

    #[serde(rename = "process.exit")]
    ProcessExit {
        pid: Pid,
        code: i32,
        reason: String,
    },

    #[serde(rename = "process.reaped")]
    ProcessReaped { pid: Pid },

    // -- agent --
    #[serde(rename = "agent.thought")]
    AgentThought {
        pid: Pid,
        step: u32,
        content: String,
    },

    #[serde(rename = "agent.action")]
    AgentAction {
        pid: Pid,
        step: u32,
        tool: String,
        args: serde_json::Value,
    },

    #[serde(rename = "agent.observation")]
    AgentObservation {
        pid: Pid,
        step: u32,
        result: serde_json::Value,
    },

    #[serde(rename = "agent.phase")]
    AgentPhaseChange { pid: Pid, phase: AgentPhase },

    #[serde(rename = "agent.paused")]
    AgentPaused { pid: Pid },

    #[serde(rename = "agent.resumed")]
    AgentResumed { pid: Pid },

    #[serde(rename = "agent.log")]
    AgentLog {
        pid: Pid,
        level: String,
        message: String,
    },

    // -- kernel --
    #[serde(rename = "kernel.metrics")]
    KernelMetrics {
        timestamp: u64,
        process_count: u32,
        cpu_percent: f64,
        memory_mb: f64,
        container_count: u32,
    },

    // -- filesystem --
    #[serde(rename = "fs.changed")]
    FsChanged {
        uid: Uid,
        path: String,
        /// One of "write", "create", "delete".
        change: String,
        #[serde(default)]
        size: u64,
    },

    // -- plan --
    #[serde(rename = "plan.created")]
    PlanCreated { pid: Pid, plan_id: PlanId },

    #[serde(rename = "plan.updated")]
    PlanUpdated { plan_id: PlanId, status: PlanStatus },

    // -- memory --
    #[serde(rename = "mem.stored")]
    MemoryStored {
        uid: Uid,
        memory_id: MemoryId,
        layer: MemoryLayer,
    },

    #[serde(rename = "mem.evicted")]
    MemoryEvicted {
        uid: Uid,
        layer: MemoryLayer,
        count: u32,
    },

    // -- cron --
    #[serde(rename = "cron.created")]
    CronCreated { id: CronId, name: String },

    #[serde(rename = "cron.fired")]
    CronFired { id: CronId, pid: Pid },

    #[serde(rename = "cron.deleted")]
    CronDeleted { id: CronId },

    // -- trigger --
    #[serde(rename = "trigger.created")]
    TriggerCreated { id: TriggerId, name: String },

    #[serde(rename = "trigger.fired")]
    TriggerFired { id: TriggerId, pid: Pid },

    #[serde(rename = "trigger.deleted")]
    TriggerDeleted { id: TriggerId },

    // -- webhook --
    #[serde(rename = "webhook.created")]
    WebhookCreated { id: WebhookId },

    #[serde(rename = "webhook.deleted")]
    WebhookDeleted { id: WebhookId },

    #[serde(rename = "webhook.delivered")]
    WebhookDelivered {
        id: WebhookId,
        event_type: String,
        status: u16,
    },

    #[serde(rename = "webhook.failed")]
    WebhookFailed {
        id: WebhookId,
        event_type: String,
        error: String,
        attempt: u32,
    },

    #[serde(rename = "webhook.dlq")]
    WebhookDeadLettered { id: WebhookId, event_type: String },

    // -- users / policy --
    #[serde(rename = "user.registered")]
    UserRegistered { uid: Uid, username: String },

    #[serde(rename = "user.login")]
    UserLogin { uid: Uid, username: String },

    #[serde(rename = "user.loginFailed")]
    UserLoginFailed { username: String, reason: String },

    #[serde(rename = "user.deleted")]
    UserDeleted { uid: Uid },

    #[serde(rename = "policy.created")]
    PolicyCreated {
        id: PolicyId,
        subject: String,
        action: String,
        effect: String,
    },

    #[serde(rename = "policy.deleted")]
    PolicyDeleted { id: PolicyId },

    // -- sandbox passthrough (opaque handles, fire-and-forget) --
    #[serde(rename = "tty.output")]
    TtyOutput { pid: Pid, data: String },

    #[serde(rename = "vnc.started")]
    VncStarted { pid: Pid, ws_url: String },

    #[serde(rename = "vnc.stopped")]
    VncStopped { pid: Pid },

    #[serde(rename = "gpu.allocated")]
    GpuAllocated { pid: Pid, device: String },

    #[serde(rename = "gpu.released")]
    GpuReleased { pid: Pid, device: String },

    // -- bus --
    /// Synthesized per-subscriber when a bounded queue overflows; never
    /// published by components.
    #[serde(rename = "subscriber.lagged")]
    SubscriberLagged { dropped: u64 },

    #[serde(rename = "bus.handlerError")]
    BusHandlerError { topic: String, error: String },

    /// Catch-all for unknown event types (extensibility)
    #[serde(other, skip_serializing)]
    Custom,
}

impl Event {
    /// The dot-separated topic string this variant publishes under.
    pub fn topic(&self) -> &'static str {
        match self {
            Event::ProcessSpawned { .. } => "process.spawned",
            Event::ProcessStateChange { .. } => "process.stateChange",
            Event::ProcessExit { .. } => "process.exit",
            Event::ProcessReaped { .. } => "process.reaped",
            Event::AgentThought { .. } => "agent.thought",
            Event::AgentAction { .. } => "agent.action",
            Event::AgentObservation { .. } => "agent.observation",
            Event::AgentPhaseChange { .. } => "agent.phase",
            Event::AgentPaused { .. } => "agent.paused",
            Event::AgentResumed { .. } => "agent.resumed",
            Event::AgentLog { .. } => "agent.log",
            Event::KernelMetrics { .. } => "kernel.metrics",
            Event::FsChanged { .. } => "fs.changed",
            Event::PlanCreated { .. } => "plan.created",
            Event::PlanUpdated { .. } => "plan.updated",
            Event::MemoryStored { .. } => "mem.stored",
            Event::MemoryEvicted { .. } => "mem.evicted",
            Event::CronCreated { .. } => "cron.created",
            Event::CronFired { .. } => "cron.fired",
            Event::CronDeleted { .. } => "cron.deleted",
            Event::TriggerCreated { .. } => "trigger.created",
            Event::TriggerFired { .. } => "trigger.fired",
            Event::TriggerDeleted { .. } => "trigger.deleted",
            Event::WebhookCreated { .. } => "webhook.created",
            Event::WebhookDeleted { .. } => "webhook.deleted",
            Event::WebhookDelivered { .. } => "webhook.delivered",
            Event::WebhookFailed { .. } => "webhook.failed",
            Event::WebhookDeadLettered { .. } => "webhook.dlq",
            Event::UserRegistered { .. } => "user.registered",
            Event::UserLogin { .. } => "user.login",
            Event::UserLoginFailed { .. } => "user.loginFailed",
            Event::UserDeleted { .. } => "user.deleted",
            Event::PolicyCreated { .. } => "policy.created",
            Event::PolicyDeleted { .. } => "policy.deleted",
            Event::TtyOutput { .. } => "tty.output",
            Event::VncStarted { .. } => "vnc.started",
            Event::VncStopped { .. } => "vnc.stopped",
            Event::GpuAllocated { .. } => "gpu.allocated",
            Event::GpuReleased { .. } => "gpu.released",
            Event::SubscriberLagged { .. } => "subscriber.lagged",
            Event::BusHandlerError { .. } => "bus.handlerError",
            Event::Custom => "custom",
        }
    }

    /// Critical events are never dropped by a lagging subscriber queue;
    /// the subscriber is disconnected instead.
    pub fn critical(&self) -> bool {
        match self {
            Event::ProcessExit { .. } => true,
            Event::ProcessStateChange { to, .. } => to.is_terminal(),
            _ => false,
        }
    }

    /// The process this event concerns, when it concerns one.
    pub fn pid(&self) -> Option<Pid> {
        match self {
            Event::ProcessSpawned { pid, .. }
            | Event::ProcessStateChange { pid, .. }
            | Event::ProcessExit { pid, .. }
            | Event::ProcessReaped { pid }
            | Event::AgentThought { pid, .. }
            | Event::AgentAction { pid, .. }
            | Event::AgentObservation { pid, .. }
            | Event::AgentPhaseChange { pid, .. }
            | Event::AgentPaused { pid }
            | Event::AgentResumed { pid }
            | Event::AgentLog { pid, .. }
            | Event::PlanCreated { pid, .. }
            | Event::CronFired { pid, .. }
            | Event::TriggerFired { pid, .. }
            | Event::TtyOutput { pid, .. }
            | Event::VncStarted { pid, .. }
            | Event::VncStopped { pid }
            | Event::GpuAllocated { pid, .. }
            | Event::GpuReleased { pid, .. } => Some(*pid),
            _ => None,
        }
    }

    /// The owning user, when the event embeds one directly.
    ///
    /// Events that only carry a pid are resolved to an owner by the
    /// gateway through the process table.
    pub fn owner(&self) -> Option<&Uid> {
        match self {
            Event::ProcessSpawned { uid, .. }
            | Event::FsChanged { uid, .. }
            | Event::MemoryStored { uid, .. }
            | Event::MemoryEvicted { uid, .. }
            | Event::UserRegistered { uid, .. }
            | Event::UserLogin { uid, .. }
            | Event::UserDeleted { uid } => Some(uid),
            _ => None,
        }
    }
}

/// Subscription pattern: an exact topic or a trailing-`*` wildcard.
///
/// `agent.*` matches every topic under the `agent.` prefix; a bare `*`
/// matches everything.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TopicPattern(String);

impl TopicPattern {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self(pattern.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn matches(&self, topic: &str) -> bool {
        match self.0.strip_suffix('*') {
            Some("") => true,
            Some(prefix) => topic.starts_with(prefix),
            None => self.0 == topic,
        }
    }
}

impl From<&str> for TopicPattern {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl std::fmt::Display for TopicPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
