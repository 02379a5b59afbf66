// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Idempotent schema application

use crate::error::StoreError;
use rusqlite::Connection;

/// Schema version stamped into `PRAGMA user_version`.
pub const SCHEMA_VERSION: i32 = 1;

pub fn init_schema(conn: &Connection) -> Result<(), StoreError> {
    // journal_mode replies with the resulting mode, so it cannot run
    // inside the batch.
    conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS processes (
            pid INTEGER PRIMARY KEY,
            uid TEXT NOT NULL,
            name TEXT NOT NULL,
            role TEXT NOT NULL,
            goal TEXT NOT NULL,
            state TEXT NOT NULL,
            phase TEXT NOT NULL DEFAULT 'idle',
            exit_code INTEGER,
            created_at_ms INTEGER NOT NULL,
            exited_at_ms INTEGER,
            env TEXT NOT NULL DEFAULT '{}',
            tty_id TEXT,
            vnc_ws_url TEXT
        );

        CREATE TABLE IF NOT EXISTS agent_logs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            pid INTEGER NOT NULL,
            step INTEGER NOT NULL,
            phase TEXT NOT NULL,
            tool TEXT,
            content TEXT NOT NULL,
            timestamp INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS files (
            path TEXT PRIMARY KEY,
            owner_uid TEXT NOT NULL,
            size INTEGER NOT NULL DEFAULT 0,
            file_type TEXT NOT NULL DEFAULT 'file',
            created_at_ms INTEGER NOT NULL,
            modified_at_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS metrics (
            timestamp INTEGER NOT NULL,
            process_count INTEGER NOT NULL,
            cpu_percent REAL NOT NULL,
            memory_mb REAL NOT NULL,
            container_count INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS snapshots (
            id TEXT PRIMARY KEY,
            pid INTEGER NOT NULL,
            timestamp INTEGER NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            file_path TEXT NOT NULL,
            tarball_path TEXT NOT NULL,
            process_info TEXT NOT NULL,
            size_bytes INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS users (
            uid TEXT PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            display_name TEXT NOT NULL DEFAULT '',
            password_hash TEXT NOT NULL,
            role TEXT NOT NULL DEFAULT 'user',
            created_at_ms INTEGER NOT NULL,
            last_login_ms INTEGER,
            mfa_secret TEXT,
            mfa_enabled INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS memories (
            id TEXT PRIMARY KEY,
            agent_uid TEXT NOT NULL,
            layer TEXT NOT NULL,
            content TEXT NOT NULL,
            tags TEXT NOT NULL DEFAULT '[]',
            importance REAL NOT NULL DEFAULT 0.5,
            access_count INTEGER NOT NULL DEFAULT 0,
            created_at_ms INTEGER NOT NULL,
            last_accessed_ms INTEGER NOT NULL,
            expires_at_ms INTEGER,
            source_pid INTEGER,
            related TEXT NOT NULL DEFAULT '[]'
        );

        CREATE VIRTUAL TABLE IF NOT EXISTS memories_fts
            USING fts5(id UNINDEXED, content);

        CREATE TABLE IF NOT EXISTS plans (
            id TEXT PRIMARY KEY,
            pid INTEGER NOT NULL,
            agent_uid TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'active',
            tree TEXT NOT NULL DEFAULT '[]',
            created_at_ms INTEGER NOT NULL,
            updated_at_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS feedback (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            pid INTEGER NOT NULL,
            agent_uid TEXT NOT NULL,
            rating REAL NOT NULL,
            comment TEXT NOT NULL DEFAULT '',
            created_at_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS reflections (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            pid INTEGER NOT NULL,
            agent_uid TEXT NOT NULL,
            content TEXT NOT NULL,
            created_at_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS cron_jobs (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            cron_expression TEXT NOT NULL,
            agent_config TEXT NOT NULL,
            enabled INTEGER NOT NULL DEFAULT 1,
            owner_uid TEXT NOT NULL,
            last_run_ms INTEGER,
            next_run_ms INTEGER NOT NULL,
            run_count INTEGER NOT NULL DEFAULT 0,
            created_at_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS event_triggers (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            event_type TEXT NOT NULL,
            event_filter TEXT,
            agent_config TEXT NOT NULL,
            enabled INTEGER NOT NULL DEFAULT 1,
            owner_uid TEXT NOT NULL,
            cooldown_ms INTEGER NOT NULL DEFAULT 0,
            last_fired_ms INTEGER,
            fire_count INTEGER NOT NULL DEFAULT 0,
            created_at_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS webhooks (
            id TEXT PRIMARY KEY,
            url TEXT NOT NULL,
            secret TEXT,
            events TEXT NOT NULL DEFAULT '[]',
            filter TEXT,
            headers TEXT NOT NULL DEFAULT '{}',
            enabled INTEGER NOT NULL DEFAULT 1,
            owner_uid TEXT NOT NULL,
            retry_count INTEGER NOT NULL DEFAULT 3,
            timeout_ms INTEGER NOT NULL DEFAULT 5000,
            failure_count INTEGER NOT NULL DEFAULT 0,
            created_at_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS inbound_webhooks (
            token TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            agent_config TEXT NOT NULL,
            transform TEXT,
            owner_uid TEXT NOT NULL,
            last_triggered_ms INTEGER,
            trigger_count INTEGER NOT NULL DEFAULT 0,
            created_at_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS webhook_logs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            webhook_id TEXT NOT NULL,
            event_type TEXT NOT NULL,
            success INTEGER NOT NULL,
            status INTEGER,
            error TEXT,
            attempt INTEGER NOT NULL,
            created_at_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS webhook_dlq (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            webhook_id TEXT NOT NULL,
            event_type TEXT NOT NULL,
            payload TEXT NOT NULL,
            error TEXT NOT NULL,
            attempts INTEGER NOT NULL,
            created_at_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS orgs (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            created_at_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS org_members (
            org_id TEXT NOT NULL,
            uid TEXT NOT NULL,
            role TEXT NOT NULL DEFAULT 'member',
            PRIMARY KEY (org_id, uid)
        );

        CREATE TABLE IF NOT EXISTS teams (
            id TEXT PRIMARY KEY,
            org_id TEXT NOT NULL,
            name TEXT NOT NULL,
            created_at_ms INTEGER NOT NULL,
            UNIQUE (org_id, name)
        );

        CREATE TABLE IF NOT EXISTS team_members (
            team_id TEXT NOT NULL,
            uid TEXT NOT NULL,
            role TEXT NOT NULL DEFAULT 'member',
            PRIMARY KEY (team_id, uid)
        );

        CREATE TABLE IF NOT EXISTS audit_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp INTEGER NOT NULL,
            event_type TEXT NOT NULL,
            actor_pid INTEGER,
            actor_uid TEXT,
            action TEXT NOT NULL,
            target TEXT,
            args_sanitized TEXT,
            result_hash TEXT,
            metadata TEXT
        );

        CREATE TABLE IF NOT EXISTS policies (
            id TEXT PRIMARY KEY,
            subject TEXT NOT NULL,
            action TEXT NOT NULL,
            resource TEXT NOT NULL,
            effect TEXT NOT NULL,
            created_at_ms INTEGER NOT NULL,
            created_by TEXT
        );

        CREATE TABLE IF NOT EXISTS kv (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at_ms INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_agent_logs_pid ON agent_logs(pid, id);
        CREATE INDEX IF NOT EXISTS idx_files_owner ON files(owner_uid);
        CREATE INDEX IF NOT EXISTS idx_metrics_ts ON metrics(timestamp);
        CREATE INDEX IF NOT EXISTS idx_memories_agent ON memories(agent_uid, layer);
        CREATE INDEX IF NOT EXISTS idx_cron_due ON cron_jobs(enabled, next_run_ms);
        CREATE INDEX IF NOT EXISTS idx_triggers_type ON event_triggers(enabled, event_type);
        CREATE INDEX IF NOT EXISTS idx_audit_ts ON audit_log(timestamp);
        CREATE INDEX IF NOT EXISTS idx_webhook_logs_hook ON webhook_logs(webhook_id, id);
        "#,
    )?;

    // Columns added after the initial schema shipped. ALTER is a no-op
    // error when the column exists; ensure_column swallows exactly that.
    ensure_column(conn, "processes", "tty_id", "TEXT")?;
    ensure_column(conn, "processes", "vnc_ws_url", "TEXT")?;
    ensure_column(conn, "users", "mfa_secret", "TEXT")?;
    ensure_column(conn, "users", "mfa_enabled", "INTEGER NOT NULL DEFAULT 0")?;
    ensure_column(conn, "webhooks", "failure_count", "INTEGER NOT NULL DEFAULT 0")?;

    conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;

    Ok(())
}

/// Add a column if the table does not already have it.
pub fn ensure_column(
    conn: &Connection,
    table: &str,
    column: &str,
    decl: &str,
) -> Result<(), StoreError> {
    let exists = conn
        .prepare(&format!("PRAGMA table_info({table})"))?
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<Vec<_>, _>>()?
        .iter()
        .any(|name| name == column);

    if !exists {
        conn.execute_batch(&format!("ALTER TABLE {table} ADD COLUMN {column} {decl}"))?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
