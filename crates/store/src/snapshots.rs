// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Snapshot records (tarballs live on disk, rows here)

use crate::{json_text, StateStore, StoreError};
use aether_core::{Pid, SnapshotId, SnapshotRecord};
use rusqlite::{params, OptionalExtension, Row};

fn row_to_snapshot(row: &Row<'_>) -> Result<SnapshotRecord, rusqlite::Error> {
    let info: String = row.get(6)?;
    Ok(SnapshotRecord {
        id: SnapshotId::new(row.get::<_, String>(0)?),
        pid: Pid(row.get(1)?),
        timestamp: row.get::<_, i64>(2)? as u64,
        description: row.get(3)?,
        file_path: row.get(4)?,
        tarball_path: row.get(5)?,
        process_info: serde_json::from_str(&info).unwrap_or(serde_json::Value::Null),
        size_bytes: row.get::<_, i64>(7)? as u64,
    })
}

impl StateStore {
    pub fn insert_snapshot(&self, snapshot: &SnapshotRecord) -> Result<(), StoreError> {
        self.conn().execute(
            r#"
            INSERT INTO snapshots (id, pid, timestamp, description, file_path, tarball_path,
                                   process_info, size_bytes)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                snapshot.id.as_str(),
                snapshot.pid.as_i64(),
                snapshot.timestamp as i64,
                snapshot.description,
                snapshot.file_path,
                snapshot.tarball_path,
                json_text(&snapshot.process_info)?,
                snapshot.size_bytes as i64,
            ],
        )?;
        Ok(())
    }

    pub fn get_snapshot(&self, id: &SnapshotId) -> Result<Option<SnapshotRecord>, StoreError> {
        let conn = self.conn();
        let result = conn
            .query_row(
                "SELECT id, pid, timestamp, description, file_path, tarball_path, process_info, \
                 size_bytes FROM snapshots WHERE id = ?1",
                params![id.as_str()],
                |row| row_to_snapshot(row),
            )
            .optional()?;
        Ok(result)
    }

    pub fn list_snapshots(&self, pid: Option<Pid>) -> Result<Vec<SnapshotRecord>, StoreError> {
        let conn = self.conn();
        let mut out = Vec::new();
        match pid {
            Some(pid) => {
                let mut stmt = conn.prepare(
                    "SELECT id, pid, timestamp, description, file_path, tarball_path, \
                     process_info, size_bytes FROM snapshots WHERE pid = ?1 ORDER BY timestamp",
                )?;
                let rows = stmt.query_map(params![pid.as_i64()], |row| row_to_snapshot(row))?;
                for row in rows {
                    out.push(row?);
                }
            }
            None => {
                let mut stmt = conn.prepare(
                    "SELECT id, pid, timestamp, description, file_path, tarball_path, \
                     process_info, size_bytes FROM snapshots ORDER BY timestamp",
                )?;
                let rows = stmt.query_map([], |row| row_to_snapshot(row))?;
                for row in rows {
                    out.push(row?);
                }
            }
        }
        Ok(out)
    }

    pub fn delete_snapshot(&self, id: &SnapshotId) -> Result<bool, StoreError> {
        let removed = self
            .conn()
            .execute("DELETE FROM snapshots WHERE id = ?1", params![id.as_str()])?;
        Ok(removed > 0)
    }
}
