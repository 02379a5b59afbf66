// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only audit log

use crate::{json_text, StateStore, StoreError};
use aether_core::{AuditEntry, Pid, Uid};
use rusqlite::params;

impl StateStore {
    pub fn append_audit(&self, entry: &AuditEntry) -> Result<i64, StoreError> {
        let conn = self.conn();
        conn.execute(
            r#"
            INSERT INTO audit_log (timestamp, event_type, actor_pid, actor_uid, action, target,
                                   args_sanitized, result_hash, metadata)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                entry.timestamp as i64,
                entry.event_type,
                entry.actor_pid.map(|p| p.as_i64()),
                entry.actor_uid.as_ref().map(|u| u.as_str().to_string()),
                entry.action,
                entry.target,
                entry.args_sanitized.as_ref().map(json_text).transpose()?,
                entry.result_hash,
                entry.metadata.as_ref().map(json_text).transpose()?,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Query audit entries in a time window, newest first.
    pub fn query_audit(
        &self,
        since_ms: u64,
        until_ms: u64,
        limit: usize,
    ) -> Result<Vec<AuditEntry>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            r#"
            SELECT id, timestamp, event_type, actor_pid, actor_uid, action, target,
                   args_sanitized, result_hash, metadata
            FROM audit_log
            WHERE timestamp >= ?1 AND timestamp <= ?2
            ORDER BY id DESC
            LIMIT ?3
            "#,
        )?;
        let rows = stmt.query_map(
            params![since_ms as i64, until_ms as i64, limit as i64],
            |row| {
                let args: Option<String> = row.get(7)?;
                let metadata: Option<String> = row.get(9)?;
                Ok(AuditEntry {
                    id: row.get(0)?,
                    timestamp: row.get::<_, i64>(1)? as u64,
                    event_type: row.get(2)?,
                    actor_pid: row.get::<_, Option<i64>>(3)?.map(Pid),
                    actor_uid: row.get::<_, Option<String>>(4)?.map(Uid::new),
                    action: row.get(5)?,
                    target: row.get(6)?,
                    args_sanitized: args.and_then(|t| serde_json::from_str(&t).ok()),
                    result_hash: row.get(8)?,
                    metadata: metadata.and_then(|t| serde_json::from_str(&t).ok()),
                })
            },
        )?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Remove entries older than the retention cutoff.
    pub fn prune_audit_before(&self, cutoff_ms: u64) -> Result<usize, StoreError> {
        let count = self.conn().execute(
            "DELETE FROM audit_log WHERE timestamp < ?1",
            params![cutoff_ms as i64],
        )?;
        Ok(count)
    }
}
