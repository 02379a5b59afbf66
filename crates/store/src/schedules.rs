// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cron jobs and event triggers

use crate::{from_json_text, json_text, StateStore, StoreError};
use aether_core::{CronId, CronJob, EventTrigger, TriggerId, Uid};
use rusqlite::{params, OptionalExtension, Row};

fn row_to_cron(row: &Row<'_>) -> Result<(CronJob, String), rusqlite::Error> {
    let config: String = row.get(3)?;
    Ok((
        CronJob {
            id: CronId::new(row.get::<_, String>(0)?),
            name: row.get(1)?,
            cron_expression: row.get(2)?,
            agent_config: aether_core::AgentConfig {
                name: String::new(),
                role: String::new(),
                goal: String::new(),
                max_steps: 0,
                env: Default::default(),
            },
            enabled: row.get::<_, i64>(4)? != 0,
            owner_uid: Uid::new(row.get::<_, String>(5)?),
            last_run_ms: row.get::<_, Option<i64>>(6)?.map(|v| v as u64),
            next_run_ms: row.get::<_, i64>(7)? as u64,
            run_count: row.get::<_, i64>(8)? as u64,
            created_at_ms: row.get::<_, i64>(9)? as u64,
        },
        config,
    ))
}

fn finish_cron((mut job, config): (CronJob, String)) -> Result<CronJob, StoreError> {
    job.agent_config = from_json_text(&config)?;
    Ok(job)
}

fn row_to_trigger(row: &Row<'_>) -> Result<(EventTrigger, String, Option<String>), rusqlite::Error> {
    let config: String = row.get(4)?;
    let filter: Option<String> = row.get(3)?;
    Ok((
        EventTrigger {
            id: TriggerId::new(row.get::<_, String>(0)?),
            name: row.get(1)?,
            event_type: row.get(2)?,
            event_filter: None,
            agent_config: aether_core::AgentConfig {
                name: String::new(),
                role: String::new(),
                goal: String::new(),
                max_steps: 0,
                env: Default::default(),
            },
            enabled: row.get::<_, i64>(5)? != 0,
            owner_uid: Uid::new(row.get::<_, String>(6)?),
            cooldown_ms: row.get::<_, i64>(7)? as u64,
            last_fired_ms: row.get::<_, Option<i64>>(8)?.map(|v| v as u64),
            fire_count: row.get::<_, i64>(9)? as u64,
            created_at_ms: row.get::<_, i64>(10)? as u64,
        },
        config,
        filter,
    ))
}

fn finish_trigger(
    (mut trigger, config, filter): (EventTrigger, String, Option<String>),
) -> Result<EventTrigger, StoreError> {
    trigger.agent_config = from_json_text(&config)?;
    trigger.event_filter = match filter {
        Some(text) => Some(from_json_text(&text)?),
        None => None,
    };
    Ok(trigger)
}

const CRON_COLUMNS: &str = "id, name, cron_expression, agent_config, enabled, owner_uid, \
     last_run_ms, next_run_ms, run_count, created_at_ms";

const TRIGGER_COLUMNS: &str = "id, name, event_type, event_filter, agent_config, enabled, \
     owner_uid, cooldown_ms, last_fired_ms, fire_count, created_at_ms";

impl StateStore {
    // -- cron jobs --

    pub fn insert_cron_job(&self, job: &CronJob) -> Result<(), StoreError> {
        self.conn().execute(
            &format!(
                "INSERT INTO cron_jobs ({CRON_COLUMNS}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
            ),
            params![
                job.id.as_str(),
                job.name,
                job.cron_expression,
                json_text(&job.agent_config)?,
                job.enabled as i64,
                job.owner_uid.as_str(),
                job.last_run_ms.map(|v| v as i64),
                job.next_run_ms as i64,
                job.run_count as i64,
                job.created_at_ms as i64,
            ],
        )?;
        Ok(())
    }

    pub fn get_cron_job(&self, id: &CronId) -> Result<Option<CronJob>, StoreError> {
        let conn = self.conn();
        let result = conn
            .query_row(
                &format!("SELECT {CRON_COLUMNS} FROM cron_jobs WHERE id = ?1"),
                params![id.as_str()],
                |row| row_to_cron(row),
            )
            .optional()?;
        result.map(finish_cron).transpose()
    }

    pub fn list_cron_jobs(&self, owner: Option<&Uid>) -> Result<Vec<CronJob>, StoreError> {
        let conn = self.conn();
        let mut out = Vec::new();
        match owner {
            Some(uid) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {CRON_COLUMNS} FROM cron_jobs WHERE owner_uid = ?1 ORDER BY created_at_ms"
                ))?;
                let rows = stmt.query_map(params![uid.as_str()], |row| row_to_cron(row))?;
                for row in rows {
                    out.push(finish_cron(row?)?);
                }
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {CRON_COLUMNS} FROM cron_jobs ORDER BY created_at_ms"
                ))?;
                let rows = stmt.query_map([], |row| row_to_cron(row))?;
                for row in rows {
                    out.push(finish_cron(row?)?);
                }
            }
        }
        Ok(out)
    }

    /// Jobs due at `now`, soonest first.
    pub fn due_cron_jobs(&self, now_ms: u64) -> Result<Vec<CronJob>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {CRON_COLUMNS} FROM cron_jobs \
             WHERE enabled = 1 AND next_run_ms <= ?1 ORDER BY next_run_ms"
        ))?;
        let rows = stmt.query_map(params![now_ms as i64], |row| row_to_cron(row))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(finish_cron(row?)?);
        }
        Ok(out)
    }

    /// Stamp a successful firing: last run, next run, counter.
    pub fn mark_cron_run(
        &self,
        id: &CronId,
        last_run_ms: u64,
        next_run_ms: u64,
    ) -> Result<(), StoreError> {
        self.conn().execute(
            "UPDATE cron_jobs SET last_run_ms = ?2, next_run_ms = ?3, run_count = run_count + 1 \
             WHERE id = ?1",
            params![id.as_str(), last_run_ms as i64, next_run_ms as i64],
        )?;
        Ok(())
    }

    pub fn set_cron_enabled(&self, id: &CronId, enabled: bool) -> Result<bool, StoreError> {
        let changed = self.conn().execute(
            "UPDATE cron_jobs SET enabled = ?2 WHERE id = ?1",
            params![id.as_str(), enabled as i64],
        )?;
        Ok(changed > 0)
    }

    pub fn delete_cron_job(&self, id: &CronId) -> Result<bool, StoreError> {
        let removed = self
            .conn()
            .execute("DELETE FROM cron_jobs WHERE id = ?1", params![id.as_str()])?;
        Ok(removed > 0)
    }

    // -- event triggers --

    pub fn insert_trigger(&self, trigger: &EventTrigger) -> Result<(), StoreError> {
        self.conn().execute(
            &format!(
                "INSERT INTO event_triggers ({TRIGGER_COLUMNS}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
            ),
            params![
                trigger.id.as_str(),
                trigger.name,
                trigger.event_type,
                trigger
                    .event_filter
                    .as_ref()
                    .map(json_text)
                    .transpose()?,
                json_text(&trigger.agent_config)?,
                trigger.enabled as i64,
                trigger.owner_uid.as_str(),
                trigger.cooldown_ms as i64,
                trigger.last_fired_ms.map(|v| v as i64),
                trigger.fire_count as i64,
                trigger.created_at_ms as i64,
            ],
        )?;
        Ok(())
    }

    pub fn get_trigger(&self, id: &TriggerId) -> Result<Option<EventTrigger>, StoreError> {
        let conn = self.conn();
        let result = conn
            .query_row(
                &format!("SELECT {TRIGGER_COLUMNS} FROM event_triggers WHERE id = ?1"),
                params![id.as_str()],
                |row| row_to_trigger(row),
            )
            .optional()?;
        result.map(finish_trigger).transpose()
    }

    pub fn list_triggers(&self, owner: Option<&Uid>) -> Result<Vec<EventTrigger>, StoreError> {
        let conn = self.conn();
        let mut out = Vec::new();
        match owner {
            Some(uid) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {TRIGGER_COLUMNS} FROM event_triggers WHERE owner_uid = ?1 \
                     ORDER BY created_at_ms"
                ))?;
                let rows = stmt.query_map(params![uid.as_str()], |row| row_to_trigger(row))?;
                for row in rows {
                    out.push(finish_trigger(row?)?);
                }
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {TRIGGER_COLUMNS} FROM event_triggers ORDER BY created_at_ms"
                ))?;
                let rows = stmt.query_map([], |row| row_to_trigger(row))?;
                for row in rows {
                    out.push(finish_trigger(row?)?);
                }
            }
        }
        Ok(out)
    }

    /// Enabled triggers listening on `topic`.
    pub fn triggers_for_event(&self, topic: &str) -> Result<Vec<EventTrigger>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {TRIGGER_COLUMNS} FROM event_triggers \
             WHERE enabled = 1 AND event_type = ?1 ORDER BY created_at_ms"
        ))?;
        let rows = stmt.query_map(params![topic], |row| row_to_trigger(row))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(finish_trigger(row?)?);
        }
        Ok(out)
    }

    /// Stamp a firing (successful or failed spawn both open a new
    /// cooldown window).
    pub fn mark_trigger_fired(
        &self,
        id: &TriggerId,
        fired_at_ms: u64,
        spawned: bool,
    ) -> Result<(), StoreError> {
        self.conn().execute(
            "UPDATE event_triggers SET last_fired_ms = ?2, \
             fire_count = fire_count + ?3 WHERE id = ?1",
            params![id.as_str(), fired_at_ms as i64, spawned as i64],
        )?;
        Ok(())
    }

    pub fn set_trigger_enabled(&self, id: &TriggerId, enabled: bool) -> Result<bool, StoreError> {
        let changed = self.conn().execute(
            "UPDATE event_triggers SET enabled = ?2 WHERE id = ?1",
            params![id.as_str(), enabled as i64],
        )?;
        Ok(changed > 0)
    }

    pub fn delete_trigger(&self, id: &TriggerId) -> Result<bool, StoreError> {
        let removed = self.conn().execute(
            "DELETE FROM event_triggers WHERE id = ?1",
            params![id.as_str()],
        )?;
        Ok(removed > 0)
    }
}

#[cfg(test)]
#[path = "schedules_tests.rs"]
mod tests;
