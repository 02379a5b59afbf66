// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn schema_applies_twice_without_error() {
    let conn = Connection::open_in_memory().unwrap();
    init_schema(&conn).unwrap();
    init_schema(&conn).unwrap();
}

#[test]
fn user_version_is_stamped() {
    let conn = Connection::open_in_memory().unwrap();
    init_schema(&conn).unwrap();
    let version: i32 = conn
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .unwrap();
    assert_eq!(version, SCHEMA_VERSION);
}

#[test]
fn ensure_column_adds_missing_column() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch("CREATE TABLE widgets (id INTEGER PRIMARY KEY)")
        .unwrap();

    ensure_column(&conn, "widgets", "color", "TEXT").unwrap();
    conn.execute("INSERT INTO widgets (id, color) VALUES (1, 'red')", [])
        .unwrap();

    // Second call is a no-op.
    ensure_column(&conn, "widgets", "color", "TEXT").unwrap();
}

#[test]
fn all_domain_tables_exist() {
    let conn = Connection::open_in_memory().unwrap();
    init_schema(&conn).unwrap();

    for table in [
        "processes",
        "agent_logs",
        "files",
        "metrics",
        "snapshots",
        "users",
        "memories",
        "plans",
        "feedback",
        "reflections",
        "cron_jobs",
        "event_triggers",
        "webhooks",
        "inbound_webhooks",
        "webhook_logs",
        "webhook_dlq",
        "orgs",
        "org_members",
        "teams",
        "team_members",
        "audit_log",
        "policies",
        "kv",
    ] {
        let count: i64 = conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(count, 0, "table {table} should exist and be empty");
    }
}
