// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic kernel resource sampling

use crate::bus::EventBus;
use crate::config::MetricsConfig;
use crate::table::ProcessTable;
use aether_core::{Clock, Event};
use parking_lot::Mutex;
use std::sync::Arc;
use sysinfo::System;
use tokio_util::sync::CancellationToken;

pub struct MetricsSampler<C: Clock> {
    table: Arc<ProcessTable<C>>,
    bus: EventBus,
    clock: C,
    system: Mutex<System>,
}

impl<C: Clock> MetricsSampler<C> {
    pub fn new(table: Arc<ProcessTable<C>>, bus: EventBus, clock: C) -> Self {
        Self {
            table,
            bus,
            clock,
            system: Mutex::new(System::new()),
        }
    }

    /// Take one sample and publish it. The store row is written by the
    /// bus subscriber like every other hot event.
    pub fn sample(&self) {
        let (cpu_percent, memory_mb) = {
            let mut system = self.system.lock();
            system.refresh_cpu();
            system.refresh_memory();

            let cpu = system.global_cpu_info().cpu_usage() as f64;
            let memory = sysinfo::get_current_pid()
                .ok()
                .and_then(|pid| {
                    system.refresh_process(pid);
                    system.process(pid).map(|p| p.memory())
                })
                .unwrap_or(0) as f64
                / (1024.0 * 1024.0);
            (cpu, memory)
        };

        self.bus.emit(Event::KernelMetrics {
            timestamp: self.clock.epoch_ms(),
            process_count: self.table.live_count() as u32,
            cpu_percent,
            memory_mb,
            container_count: 0,
        });
    }

    pub fn spawn(self, config: MetricsConfig, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(config.sample_interval);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tick.tick() => self.sample(),
                }
            }
        })
    }
}
