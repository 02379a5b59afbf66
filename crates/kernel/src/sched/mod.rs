// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent schedulers: time-based (cron) and event-based (triggers)

mod cron;
mod trigger;

pub use cron::CronDriver;
pub use trigger::TriggerDriver;

use aether_core::{AgentConfig, KernelError, ProcessInfo, Uid};

/// Narrow spawn seam shared by the schedulers and webhook ingress.
///
/// Implemented by the kernel; faked in driver tests.
pub trait AgentSpawner: Send + Sync {
    fn spawn_agent(&self, owner: &Uid, config: &AgentConfig) -> Result<ProcessInfo, KernelError>;
}
