// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outbound webhooks, inbound hooks, delivery logs and the DLQ

use crate::{from_json_text, json_text, StateStore, StoreError};
use aether_core::{DlqEntry, InboundWebhook, Uid, Webhook, WebhookId, WebhookLogEntry};
use rusqlite::{params, OptionalExtension, Row};

fn row_to_webhook(row: &Row<'_>) -> Result<(Webhook, String, Option<String>, String), rusqlite::Error> {
    let events: String = row.get(3)?;
    let filter: Option<String> = row.get(4)?;
    let headers: String = row.get(5)?;
    Ok((
        Webhook {
            id: WebhookId::new(row.get::<_, String>(0)?),
            url: row.get(1)?,
            secret: row.get(2)?,
            events: Default::default(),
            filter: None,
            headers: Default::default(),
            enabled: row.get::<_, i64>(6)? != 0,
            owner_uid: Uid::new(row.get::<_, String>(7)?),
            retry_count: row.get(8)?,
            timeout_ms: row.get::<_, i64>(9)? as u64,
            failure_count: row.get::<_, i64>(10)? as u64,
            created_at_ms: row.get::<_, i64>(11)? as u64,
        },
        events,
        filter,
        headers,
    ))
}

fn finish_webhook(
    (mut hook, events, filter, headers): (Webhook, String, Option<String>, String),
) -> Result<Webhook, StoreError> {
    hook.events = from_json_text(&events)?;
    hook.filter = filter.as_deref().map(from_json_text).transpose()?;
    hook.headers = from_json_text(&headers)?;
    Ok(hook)
}

const WEBHOOK_COLUMNS: &str = "id, url, secret, events, filter, headers, enabled, owner_uid, \
     retry_count, timeout_ms, failure_count, created_at_ms";

impl StateStore {
    // -- outbound --

    pub fn insert_webhook(&self, hook: &Webhook) -> Result<(), StoreError> {
        self.conn().execute(
            &format!(
                "INSERT INTO webhooks ({WEBHOOK_COLUMNS}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
            ),
            params![
                hook.id.as_str(),
                hook.url,
                hook.secret,
                json_text(&hook.events)?,
                hook.filter.as_ref().map(json_text).transpose()?,
                json_text(&hook.headers)?,
                hook.enabled as i64,
                hook.owner_uid.as_str(),
                hook.retry_count,
                hook.timeout_ms as i64,
                hook.failure_count as i64,
                hook.created_at_ms as i64,
            ],
        )?;
        Ok(())
    }

    pub fn get_webhook(&self, id: &WebhookId) -> Result<Option<Webhook>, StoreError> {
        let conn = self.conn();
        let result = conn
            .query_row(
                &format!("SELECT {WEBHOOK_COLUMNS} FROM webhooks WHERE id = ?1"),
                params![id.as_str()],
                |row| row_to_webhook(row),
            )
            .optional()?;
        result.map(finish_webhook).transpose()
    }

    pub fn list_webhooks(&self, owner: Option<&Uid>) -> Result<Vec<Webhook>, StoreError> {
        let conn = self.conn();
        let mut out = Vec::new();
        match owner {
            Some(uid) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {WEBHOOK_COLUMNS} FROM webhooks WHERE owner_uid = ?1 \
                     ORDER BY created_at_ms"
                ))?;
                let rows = stmt.query_map(params![uid.as_str()], |row| row_to_webhook(row))?;
                for row in rows {
                    out.push(finish_webhook(row?)?);
                }
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {WEBHOOK_COLUMNS} FROM webhooks ORDER BY created_at_ms"
                ))?;
                let rows = stmt.query_map([], |row| row_to_webhook(row))?;
                for row in rows {
                    out.push(finish_webhook(row?)?);
                }
            }
        }
        Ok(out)
    }

    /// Enabled webhooks subscribed to `topic`.
    pub fn webhooks_for_event(&self, topic: &str) -> Result<Vec<Webhook>, StoreError> {
        // Subscriptions are a JSON array column; the set is small, so
        // filtering happens here rather than in SQL.
        Ok(self
            .list_webhooks(None)?
            .into_iter()
            .filter(|hook| hook.enabled && hook.events.contains(topic))
            .collect())
    }

    pub fn increment_webhook_failures(&self, id: &WebhookId) -> Result<(), StoreError> {
        self.conn().execute(
            "UPDATE webhooks SET failure_count = failure_count + 1 WHERE id = ?1",
            params![id.as_str()],
        )?;
        Ok(())
    }

    pub fn delete_webhook(&self, id: &WebhookId) -> Result<bool, StoreError> {
        let removed = self
            .conn()
            .execute("DELETE FROM webhooks WHERE id = ?1", params![id.as_str()])?;
        Ok(removed > 0)
    }

    // -- delivery log --

    pub fn append_webhook_log(&self, entry: &WebhookLogEntry) -> Result<(), StoreError> {
        self.conn().execute(
            r#"
            INSERT INTO webhook_logs (webhook_id, event_type, success, status, error, attempt,
                                      created_at_ms)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                entry.webhook_id.as_str(),
                entry.event_type,
                entry.success as i64,
                entry.status,
                entry.error,
                entry.attempt,
                entry.created_at_ms as i64,
            ],
        )?;
        Ok(())
    }

    pub fn webhook_logs(
        &self,
        id: &WebhookId,
        limit: usize,
    ) -> Result<Vec<WebhookLogEntry>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, webhook_id, event_type, success, status, error, attempt, created_at_ms \
             FROM webhook_logs WHERE webhook_id = ?1 ORDER BY id DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![id.as_str(), limit as i64], |row| {
            Ok(WebhookLogEntry {
                id: row.get(0)?,
                webhook_id: WebhookId::new(row.get::<_, String>(1)?),
                event_type: row.get(2)?,
                success: row.get::<_, i64>(3)? != 0,
                status: row.get(4)?,
                error: row.get(5)?,
                attempt: row.get(6)?,
                created_at_ms: row.get::<_, i64>(7)? as u64,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    // -- dead letters --

    pub fn insert_dlq_entry(&self, entry: &DlqEntry) -> Result<i64, StoreError> {
        let conn = self.conn();
        conn.execute(
            r#"
            INSERT INTO webhook_dlq (webhook_id, event_type, payload, error, attempts, created_at_ms)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                entry.webhook_id.as_str(),
                entry.event_type,
                json_text(&entry.payload)?,
                entry.error,
                entry.attempts,
                entry.created_at_ms as i64,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn list_dlq(&self, limit: usize) -> Result<Vec<DlqEntry>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, webhook_id, event_type, payload, error, attempts, created_at_ms \
             FROM webhook_dlq ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            let payload: String = row.get(3)?;
            Ok(DlqEntry {
                id: row.get(0)?,
                webhook_id: WebhookId::new(row.get::<_, String>(1)?),
                event_type: row.get(2)?,
                payload: serde_json::from_str(&payload).unwrap_or(serde_json::Value::Null),
                error: row.get(4)?,
                attempts: row.get(5)?,
                created_at_ms: row.get::<_, i64>(6)? as u64,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn get_dlq_entry(&self, id: i64) -> Result<Option<DlqEntry>, StoreError> {
        let conn = self.conn();
        let result = conn
            .query_row(
                "SELECT id, webhook_id, event_type, payload, error, attempts, created_at_ms \
                 FROM webhook_dlq WHERE id = ?1",
                params![id],
                |row| {
                    let payload: String = row.get(3)?;
                    Ok(DlqEntry {
                        id: row.get(0)?,
                        webhook_id: WebhookId::new(row.get::<_, String>(1)?),
                        event_type: row.get(2)?,
                        payload: serde_json::from_str(&payload).unwrap_or(serde_json::Value::Null),
                        error: row.get(4)?,
                        attempts: row.get(5)?,
                        created_at_ms: row.get::<_, i64>(6)? as u64,
                    })
                },
            )
            .optional()?;
        Ok(result)
    }

    pub fn delete_dlq_entry(&self, id: i64) -> Result<bool, StoreError> {
        let removed = self
            .conn()
            .execute("DELETE FROM webhook_dlq WHERE id = ?1", params![id])?;
        Ok(removed > 0)
    }

    // -- inbound --

    pub fn insert_inbound_webhook(&self, hook: &InboundWebhook) -> Result<(), StoreError> {
        let result = self.conn().execute(
            r#"
            INSERT INTO inbound_webhooks (token, name, agent_config, transform, owner_uid,
                                          last_triggered_ms, trigger_count, created_at_ms)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                hook.token,
                hook.name,
                json_text(&hook.agent_config)?,
                hook.transform,
                hook.owner_uid.as_str(),
                hook.last_triggered_ms.map(|v| v as i64),
                hook.trigger_count as i64,
                hook.created_at_ms as i64,
            ],
        );
        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::conflict("inbound webhook token already exists"))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn get_inbound_webhook(&self, token: &str) -> Result<Option<InboundWebhook>, StoreError> {
        let conn = self.conn();
        let result = conn
            .query_row(
                "SELECT token, name, agent_config, transform, owner_uid, last_triggered_ms, \
                 trigger_count, created_at_ms FROM inbound_webhooks WHERE token = ?1",
                params![token],
                |row| {
                    let config: String = row.get(2)?;
                    Ok((
                        InboundWebhook {
                            token: row.get(0)?,
                            name: row.get(1)?,
                            agent_config: aether_core::AgentConfig {
                                name: String::new(),
                                role: String::new(),
                                goal: String::new(),
                                max_steps: 0,
                                env: Default::default(),
                            },
                            transform: row.get(3)?,
                            owner_uid: Uid::new(row.get::<_, String>(4)?),
                            last_triggered_ms: row.get::<_, Option<i64>>(5)?.map(|v| v as u64),
                            trigger_count: row.get::<_, i64>(6)? as u64,
                            created_at_ms: row.get::<_, i64>(7)? as u64,
                        },
                        config,
                    ))
                },
            )
            .optional()?;
        match result {
            Some((mut hook, config)) => {
                hook.agent_config = from_json_text(&config)?;
                Ok(Some(hook))
            }
            None => Ok(None),
        }
    }

    pub fn list_inbound_webhooks(&self, owner: Option<&Uid>) -> Result<Vec<InboundWebhook>, StoreError> {
        let all = {
            let conn = self.conn();
            let mut stmt = conn.prepare(
                "SELECT token, owner_uid FROM inbound_webhooks ORDER BY created_at_ms",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;
            let mut tokens = Vec::new();
            for row in rows {
                tokens.push(row?);
            }
            tokens
        };

        let mut out = Vec::new();
        for (token, hook_owner) in all {
            if owner.map(|uid| uid.as_str() == hook_owner).unwrap_or(true) {
                if let Some(hook) = self.get_inbound_webhook(&token)? {
                    out.push(hook);
                }
            }
        }
        Ok(out)
    }

    pub fn mark_inbound_triggered(&self, token: &str, at_ms: u64) -> Result<(), StoreError> {
        self.conn().execute(
            "UPDATE inbound_webhooks SET last_triggered_ms = ?2, \
             trigger_count = trigger_count + 1 WHERE token = ?1",
            params![token, at_ms as i64],
        )?;
        Ok(())
    }

    pub fn delete_inbound_webhook(&self, token: &str) -> Result<bool, StoreError> {
        let removed = self.conn().execute(
            "DELETE FROM inbound_webhooks WHERE token = ?1",
            params![token],
        )?;
        Ok(removed > 0)
    }
}

#[cfg(test)]
#[path = "webhooks_tests.rs"]
mod tests;
