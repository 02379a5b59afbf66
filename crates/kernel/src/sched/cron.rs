// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wall-clock cron driver

use super::AgentSpawner;
use crate::bus::EventBus;
use crate::config::CronConfig;
use aether_core::{Clock, CronSchedule, Event};
use aether_store::StateStore;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub struct CronDriver<C: Clock> {
    store: Arc<StateStore>,
    bus: EventBus,
    spawner: Arc<dyn AgentSpawner>,
    clock: C,
    config: CronConfig,
}

impl<C: Clock> CronDriver<C> {
    pub fn new(
        store: Arc<StateStore>,
        bus: EventBus,
        spawner: Arc<dyn AgentSpawner>,
        clock: C,
        config: CronConfig,
    ) -> Self {
        Self {
            store,
            bus,
            spawner,
            clock,
            config,
        }
    }

    /// One poll: spawn everything due, reschedule what fired.
    ///
    /// A failed spawn leaves the row untouched so the job stays due on
    /// the next tick.
    pub fn tick(&self) {
        let now = self.clock.epoch_ms();
        let due = match self.store.due_cron_jobs(now) {
            Ok(jobs) => jobs,
            Err(e) => {
                warn!(error = %e, "cron poll failed");
                return;
            }
        };

        for job in due {
            let next = CronSchedule::parse(&job.cron_expression)
                .ok()
                .and_then(|schedule| schedule.next_after(now));

            let Some(next) = next else {
                // An unparsable or dead-ended expression can never fire
                // again; disable rather than re-polling it forever.
                warn!(id = %job.id, expr = %job.cron_expression, "disabling cron job with bad expression");
                let _ = self.store.set_cron_enabled(&job.id, false);
                continue;
            };

            match self.spawner.spawn_agent(&job.owner_uid, &job.agent_config) {
                Ok(process) => {
                    info!(id = %job.id, name = %job.name, pid = %process.pid, "cron fired");
                    if let Err(e) = self.store.mark_cron_run(&job.id, now, next) {
                        warn!(id = %job.id, error = %e, "cron bookkeeping failed");
                    }
                    self.bus.emit(Event::CronFired {
                        id: job.id.clone(),
                        pid: process.pid,
                    });
                }
                Err(e) => {
                    warn!(id = %job.id, error = %e, "cron spawn failed, job stays due");
                }
            }
        }
    }

    pub fn spawn(self, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(self.config.poll_interval);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tick.tick() => self.tick(),
                }
            }
        })
    }
}

#[cfg(test)]
#[path = "cron_tests.rs"]
mod tests;
