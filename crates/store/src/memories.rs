// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent memories: layered storage, full-text search, eviction

use crate::{json_text, StateStore, StoreError};
use aether_core::{MemoryId, MemoryLayer, MemoryRecord, Pid, Uid};
use rusqlite::{params, OptionalExtension, Row};

fn row_to_memory(row: &Row<'_>) -> Result<MemoryRecord, rusqlite::Error> {
    let layer: String = row.get(2)?;
    let tags: String = row.get(4)?;
    let related: String = row.get(11)?;
    Ok(MemoryRecord {
        id: MemoryId::new(row.get::<_, String>(0)?),
        agent_uid: Uid::new(row.get::<_, String>(1)?),
        layer: MemoryLayer::parse(&layer).unwrap_or(MemoryLayer::Episodic),
        content: row.get(3)?,
        tags: serde_json::from_str(&tags).unwrap_or_default(),
        importance: row.get(5)?,
        access_count: row.get::<_, i64>(6)? as u64,
        created_at_ms: row.get::<_, i64>(7)? as u64,
        last_accessed_ms: row.get::<_, i64>(8)? as u64,
        expires_at_ms: row.get::<_, Option<i64>>(9)?.map(|v| v as u64),
        source_pid: row.get::<_, Option<i64>>(10)?.map(Pid),
        related: serde_json::from_str(&related).unwrap_or_default(),
    })
}

const MEMORY_COLUMNS: &str = "id, agent_uid, layer, content, tags, importance, access_count, \
     created_at_ms, last_accessed_ms, expires_at_ms, source_pid, related";

/// Convert a free-text query into an FTS5 MATCH expression: tokens are
/// stripped of punctuation, single characters dropped, the remainder
/// quoted and OR-joined.
fn fts_query(input: &str) -> Option<String> {
    let terms: Vec<String> = input
        .split_whitespace()
        .map(|token| {
            token
                .chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
        })
        .filter(|t| t.len() > 1)
        .map(|t| format!("\"{t}\""))
        .collect();

    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" OR "))
    }
}

impl StateStore {
    /// Insert a memory and evict down to `cap` for its (agent, layer).
    ///
    /// Eviction removes the lowest-importance, least-recently-accessed
    /// rows first and returns how many were dropped.
    pub fn put_memory(&self, memory: &MemoryRecord, cap: usize) -> Result<u32, StoreError> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        tx.execute(
            r#"
            INSERT INTO memories (id, agent_uid, layer, content, tags, importance, access_count,
                                  created_at_ms, last_accessed_ms, expires_at_ms, source_pid, related)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            ON CONFLICT(id) DO UPDATE SET
                content = ?4,
                tags = ?5,
                importance = ?6,
                last_accessed_ms = ?9,
                expires_at_ms = ?10,
                related = ?12
            "#,
            params![
                memory.id.as_str(),
                memory.agent_uid.as_str(),
                memory.layer.as_str(),
                memory.content,
                json_text(&memory.tags)?,
                memory.importance,
                memory.access_count as i64,
                memory.created_at_ms as i64,
                memory.last_accessed_ms as i64,
                memory.expires_at_ms.map(|v| v as i64),
                memory.source_pid.map(|p| p.as_i64()),
                json_text(&memory.related)?,
            ],
        )?;
        tx.execute(
            "DELETE FROM memories_fts WHERE id = ?1",
            params![memory.id.as_str()],
        )?;
        tx.execute(
            "INSERT INTO memories_fts (id, content) VALUES (?1, ?2)",
            params![memory.id.as_str(), memory.content],
        )?;

        let count: i64 = tx.query_row(
            "SELECT COUNT(*) FROM memories WHERE agent_uid = ?1 AND layer = ?2",
            params![memory.agent_uid.as_str(), memory.layer.as_str()],
            |row| row.get(0),
        )?;

        let mut evicted = 0u32;
        if count as usize > cap {
            let excess = count as usize - cap;
            let victims: Vec<String> = {
                let mut stmt = tx.prepare(
                    r#"
                    SELECT id FROM memories
                    WHERE agent_uid = ?1 AND layer = ?2
                    ORDER BY importance ASC, last_accessed_ms ASC
                    LIMIT ?3
                    "#,
                )?;
                let rows = stmt.query_map(
                    params![
                        memory.agent_uid.as_str(),
                        memory.layer.as_str(),
                        excess as i64
                    ],
                    |row| row.get::<_, String>(0),
                )?;
                let mut ids = Vec::new();
                for row in rows {
                    ids.push(row?);
                }
                ids
            };

            for id in &victims {
                tx.execute("DELETE FROM memories WHERE id = ?1", params![id])?;
                tx.execute("DELETE FROM memories_fts WHERE id = ?1", params![id])?;
                evicted += 1;
            }
        }

        tx.commit()?;
        Ok(evicted)
    }

    /// Fetch a memory and bump its access statistics.
    pub fn access_memory(
        &self,
        id: &MemoryId,
        now_ms: u64,
    ) -> Result<Option<MemoryRecord>, StoreError> {
        let conn = self.conn();
        conn.execute(
            "UPDATE memories SET access_count = access_count + 1, last_accessed_ms = ?2 \
             WHERE id = ?1",
            params![id.as_str(), now_ms as i64],
        )?;
        let result = conn
            .query_row(
                &format!("SELECT {MEMORY_COLUMNS} FROM memories WHERE id = ?1"),
                params![id.as_str()],
                |row| row_to_memory(row),
            )
            .optional()?;
        Ok(result)
    }

    pub fn delete_memory(&self, id: &MemoryId) -> Result<bool, StoreError> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let removed = tx.execute("DELETE FROM memories WHERE id = ?1", params![id.as_str()])?;
        tx.execute(
            "DELETE FROM memories_fts WHERE id = ?1",
            params![id.as_str()],
        )?;
        tx.commit()?;
        Ok(removed > 0)
    }

    /// Full-text search scoped to one agent, best rank first.
    pub fn search_memories(
        &self,
        agent_uid: &Uid,
        query: &str,
        limit: usize,
    ) -> Result<Vec<MemoryRecord>, StoreError> {
        let Some(match_expr) = fts_query(query) else {
            return Ok(Vec::new());
        };

        let qualified_columns = MEMORY_COLUMNS
            .split(", ")
            .map(|col| format!("m.{col}"))
            .collect::<Vec<_>>()
            .join(", ");
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {qualified_columns}
            FROM memories m
            JOIN memories_fts f ON f.id = m.id
            WHERE memories_fts MATCH ?1 AND m.agent_uid = ?2
            ORDER BY rank
            LIMIT ?3
            "#
        ))?;
        let rows = stmt.query_map(
            params![match_expr, agent_uid.as_str(), limit as i64],
            |row| row_to_memory(row),
        )?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn count_memories(&self, agent_uid: &Uid, layer: MemoryLayer) -> Result<usize, StoreError> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM memories WHERE agent_uid = ?1 AND layer = ?2",
            params![agent_uid.as_str(), layer.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Drop memories whose expiry passed.
    pub fn expire_memories(&self, now_ms: u64) -> Result<usize, StoreError> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM memories_fts WHERE id IN \
             (SELECT id FROM memories WHERE expires_at_ms IS NOT NULL AND expires_at_ms < ?1)",
            params![now_ms as i64],
        )?;
        let removed = tx.execute(
            "DELETE FROM memories WHERE expires_at_ms IS NOT NULL AND expires_at_ms < ?1",
            params![now_ms as i64],
        )?;
        tx.commit()?;
        Ok(removed)
    }
}

#[cfg(test)]
#[path = "memories_tests.rs"]
mod tests;
