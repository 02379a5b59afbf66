// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Last-write-wins key/value storage

use crate::{json_text, StateStore, StoreError};
use aether_core::KvEntry;
use rusqlite::{params, OptionalExtension};

impl StateStore {
    pub fn kv_set(&self, key: &str, value: &serde_json::Value, now_ms: u64) -> Result<(), StoreError> {
        self.conn().execute(
            "INSERT INTO kv (key, value, updated_at_ms) VALUES (?1, ?2, ?3) \
             ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at_ms = ?3",
            params![key, json_text(value)?, now_ms as i64],
        )?;
        Ok(())
    }

    pub fn kv_get(&self, key: &str) -> Result<Option<KvEntry>, StoreError> {
        let conn = self.conn();
        let result = conn
            .query_row(
                "SELECT key, value, updated_at_ms FROM kv WHERE key = ?1",
                params![key],
                |row| {
                    let value: String = row.get(1)?;
                    Ok((row.get::<_, String>(0)?, value, row.get::<_, i64>(2)?))
                },
            )
            .optional()?;
        match result {
            Some((key, value, updated)) => Ok(Some(KvEntry {
                key,
                value: serde_json::from_str(&value)?,
                updated_at_ms: updated as u64,
            })),
            None => Ok(None),
        }
    }

    pub fn kv_delete(&self, key: &str) -> Result<bool, StoreError> {
        let removed = self
            .conn()
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(removed > 0)
    }
}
