// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Kernel resource metric samples

use crate::{StateStore, StoreError};
use aether_core::KernelMetric;
use rusqlite::params;

impl StateStore {
    pub fn append_metric(&self, metric: &KernelMetric) -> Result<(), StoreError> {
        self.conn().execute(
            r#"
            INSERT INTO metrics (timestamp, process_count, cpu_percent, memory_mb, container_count)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                metric.timestamp as i64,
                metric.process_count,
                metric.cpu_percent,
                metric.memory_mb,
                metric.container_count,
            ],
        )?;
        Ok(())
    }

    pub fn metrics_since(&self, since_ms: u64, limit: usize) -> Result<Vec<KernelMetric>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            r#"
            SELECT timestamp, process_count, cpu_percent, memory_mb, container_count
            FROM metrics WHERE timestamp >= ?1 ORDER BY timestamp LIMIT ?2
            "#,
        )?;
        let rows = stmt.query_map(params![since_ms as i64, limit as i64], |row| {
            Ok(KernelMetric {
                timestamp: row.get::<_, i64>(0)? as u64,
                process_count: row.get(1)?,
                cpu_percent: row.get(2)?,
                memory_mb: row.get(3)?,
                container_count: row.get(4)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn prune_metrics_before(&self, cutoff_ms: u64) -> Result<usize, StoreError> {
        let count = self.conn().execute(
            "DELETE FROM metrics WHERE timestamp < ?1",
            params![cutoff_ms as i64],
        )?;
        Ok(count)
    }
}
