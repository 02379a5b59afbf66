// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only agent reasoning transcript

use crate::{StateStore, StoreError};
use aether_core::{AgentLogEntry, LogPhase, Pid};
use rusqlite::params;

fn parse_phase(s: &str) -> LogPhase {
    match s {
        "thought" => LogPhase::Thought,
        "action" => LogPhase::Action,
        "observation" => LogPhase::Observation,
        _ => LogPhase::System,
    }
}

impl StateStore {
    pub fn append_agent_log(&self, entry: &AgentLogEntry) -> Result<i64, StoreError> {
        let conn = self.conn();
        conn.execute(
            r#"
            INSERT INTO agent_logs (pid, step, phase, tool, content, timestamp)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                entry.pid.as_i64(),
                entry.step,
                entry.phase.as_str(),
                entry.tool,
                entry.content,
                entry.timestamp as i64,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Transcript for one process in insertion order.
    pub fn agent_logs(&self, pid: Pid, limit: usize) -> Result<Vec<AgentLogEntry>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            r#"
            SELECT id, pid, step, phase, tool, content, timestamp
            FROM agent_logs
            WHERE pid = ?1
            ORDER BY id
            LIMIT ?2
            "#,
        )?;
        let rows = stmt.query_map(params![pid.as_i64(), limit as i64], |row| {
            let phase: String = row.get(3)?;
            Ok(AgentLogEntry {
                id: row.get(0)?,
                pid: Pid(row.get(1)?),
                step: row.get(2)?,
                phase: parse_phase(&phase),
                tool: row.get(4)?,
                content: row.get(5)?,
                timestamp: row.get::<_, i64>(6)? as u64,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn prune_agent_logs_before(&self, cutoff_ms: u64) -> Result<usize, StoreError> {
        let count = self.conn().execute(
            "DELETE FROM agent_logs WHERE timestamp < ?1",
            params![cutoff_ms as i64],
        )?;
        Ok(count)
    }
}
