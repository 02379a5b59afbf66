// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! aether-core: core types for the Aether agent-execution kernel

pub mod clock;
pub mod cron_expr;
pub mod error;
pub mod event;
pub mod filter;
pub mod id;
pub mod process;
pub mod records;
pub mod sanitize;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, SystemClock};
pub use cron_expr::{CronError, CronSchedule};
pub use error::{ErrorCode, KernelError};
pub use event::{Event, TopicPattern};
pub use filter::EventFilter;
pub use id::{
    CronId, IdGen, MemoryId, OrgId, Pid, PlanId, PolicyId, SequentialIdGen, SnapshotId, TeamId,
    TriggerId, Uid, UuidIdGen, WebhookId,
};
pub use process::{AgentConfig, AgentPhase, ExitReason, ProcState, ProcessInfo};
pub use records::{
    AgentLogEntry, AuditEntry, CronJob, DlqEntry, Effect, EventTrigger, FeedbackRecord,
    FileMetadata, FileType, InboundWebhook, KernelMetric, KvEntry, LogPhase, MemoryLayer,
    MemoryRecord, OrgMember, OrgRole, Organization, PermissionPolicy, PlanNode, PlanRecord,
    PlanStatus, ReflectionRecord, Role, SnapshotRecord, Team, TeamMember, UserRecord, Webhook,
    WebhookLogEntry,
};
pub use sanitize::sanitize_json;
