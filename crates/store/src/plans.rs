// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plans, feedback and reflections

use crate::{from_json_text, json_text, StateStore, StoreError};
use aether_core::{
    FeedbackRecord, Pid, PlanId, PlanRecord, PlanStatus, ReflectionRecord, Uid,
};
use rusqlite::{params, OptionalExtension, Row};

fn row_to_plan(row: &Row<'_>) -> Result<(PlanRecord, String), rusqlite::Error> {
    let status: String = row.get(3)?;
    let tree: String = row.get(4)?;
    Ok((
        PlanRecord {
            id: PlanId::new(row.get::<_, String>(0)?),
            pid: Pid(row.get(1)?),
            agent_uid: Uid::new(row.get::<_, String>(2)?),
            status: PlanStatus::parse(&status).unwrap_or(PlanStatus::Active),
            tree: Vec::new(),
            created_at_ms: row.get::<_, i64>(5)? as u64,
            updated_at_ms: row.get::<_, i64>(6)? as u64,
        },
        tree,
    ))
}

impl StateStore {
    pub fn upsert_plan(&self, plan: &PlanRecord) -> Result<(), StoreError> {
        self.conn().execute(
            r#"
            INSERT INTO plans (id, pid, agent_uid, status, tree, created_at_ms, updated_at_ms)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id) DO UPDATE SET
                status = ?4,
                tree = ?5,
                updated_at_ms = ?7
            "#,
            params![
                plan.id.as_str(),
                plan.pid.as_i64(),
                plan.agent_uid.as_str(),
                plan.status.as_str(),
                json_text(&plan.tree)?,
                plan.created_at_ms as i64,
                plan.updated_at_ms as i64,
            ],
        )?;
        Ok(())
    }

    pub fn get_plan(&self, id: &PlanId) -> Result<Option<PlanRecord>, StoreError> {
        let conn = self.conn();
        let result = conn
            .query_row(
                "SELECT id, pid, agent_uid, status, tree, created_at_ms, updated_at_ms \
                 FROM plans WHERE id = ?1",
                params![id.as_str()],
                |row| row_to_plan(row),
            )
            .optional()?;
        match result {
            Some((mut plan, tree)) => {
                plan.tree = from_json_text(&tree)?;
                Ok(Some(plan))
            }
            None => Ok(None),
        }
    }

    pub fn plan_for_pid(&self, pid: Pid) -> Result<Option<PlanRecord>, StoreError> {
        let conn = self.conn();
        let result = conn
            .query_row(
                "SELECT id, pid, agent_uid, status, tree, created_at_ms, updated_at_ms \
                 FROM plans WHERE pid = ?1 ORDER BY updated_at_ms DESC LIMIT 1",
                params![pid.as_i64()],
                |row| row_to_plan(row),
            )
            .optional()?;
        match result {
            Some((mut plan, tree)) => {
                plan.tree = from_json_text(&tree)?;
                Ok(Some(plan))
            }
            None => Ok(None),
        }
    }

    /// Update a plan's status, enforcing the monotone transition rule.
    pub fn update_plan_status(&self, id: &PlanId, to: PlanStatus, now_ms: u64) -> Result<PlanRecord, StoreError> {
        let current = self
            .get_plan(id)?
            .ok_or_else(|| StoreError::not_found(format!("plan {id}")))?;

        if !current.status.can_transition(to) && current.status != to {
            return Err(StoreError::Invalid(format!(
                "plan {} is {} and cannot become {}",
                id,
                current.status.as_str(),
                to.as_str()
            )));
        }

        self.conn().execute(
            "UPDATE plans SET status = ?2, updated_at_ms = ?3 WHERE id = ?1",
            params![id.as_str(), to.as_str(), now_ms as i64],
        )?;

        let mut updated = current;
        updated.status = to;
        updated.updated_at_ms = now_ms;
        Ok(updated)
    }

    pub fn insert_feedback(&self, feedback: &FeedbackRecord) -> Result<i64, StoreError> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO feedback (pid, agent_uid, rating, comment, created_at_ms) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                feedback.pid.as_i64(),
                feedback.agent_uid.as_str(),
                feedback.rating,
                feedback.comment,
                feedback.created_at_ms as i64,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn insert_reflection(&self, reflection: &ReflectionRecord) -> Result<i64, StoreError> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO reflections (pid, agent_uid, content, created_at_ms) \
             VALUES (?1, ?2, ?3, ?4)",
            params![
                reflection.pid.as_i64(),
                reflection.agent_uid.as_str(),
                reflection.content,
                reflection.created_at_ms as i64,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn reflections_for_agent(
        &self,
        agent_uid: &Uid,
        limit: usize,
    ) -> Result<Vec<ReflectionRecord>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, pid, agent_uid, content, created_at_ms FROM reflections \
             WHERE agent_uid = ?1 ORDER BY id DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![agent_uid.as_str(), limit as i64], |row| {
            Ok(ReflectionRecord {
                id: row.get(0)?,
                pid: Pid(row.get(1)?),
                agent_uid: Uid::new(row.get::<_, String>(2)?),
                content: row.get(3)?,
                created_at_ms: row.get::<_, i64>(4)? as u64,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

#[cfg(test)]
#[path = "plans_tests.rs"]
mod tests;
