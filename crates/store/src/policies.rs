// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Permission policies

use crate::{StateStore, StoreError};
use aether_core::{Effect, PermissionPolicy, PolicyId, Uid};
use rusqlite::{params, Row};

fn row_to_policy(row: &Row<'_>) -> Result<PermissionPolicy, rusqlite::Error> {
    let effect: String = row.get(4)?;
    Ok(PermissionPolicy {
        id: PolicyId::new(row.get::<_, String>(0)?),
        subject: row.get(1)?,
        action: row.get(2)?,
        resource: row.get(3)?,
        effect: Effect::parse(&effect).unwrap_or(Effect::Deny),
        created_at_ms: row.get::<_, i64>(5)? as u64,
        created_by: row.get::<_, Option<String>>(6)?.map(Uid::new),
    })
}

impl StateStore {
    pub fn insert_policy(&self, policy: &PermissionPolicy) -> Result<(), StoreError> {
        self.conn().execute(
            r#"
            INSERT INTO policies (id, subject, action, resource, effect, created_at_ms, created_by)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                policy.id.as_str(),
                policy.subject,
                policy.action,
                policy.resource,
                policy.effect.as_str(),
                policy.created_at_ms as i64,
                policy.created_by.as_ref().map(|u| u.as_str().to_string()),
            ],
        )?;
        Ok(())
    }

    pub fn list_policies(&self) -> Result<Vec<PermissionPolicy>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, subject, action, resource, effect, created_at_ms, created_by \
             FROM policies ORDER BY created_at_ms",
        )?;
        let rows = stmt.query_map([], |row| row_to_policy(row))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn delete_policy(&self, id: &PolicyId) -> Result<bool, StoreError> {
        let removed = self
            .conn()
            .execute("DELETE FROM policies WHERE id = ?1", params![id.as_str()])?;
        Ok(removed > 0)
    }
}
