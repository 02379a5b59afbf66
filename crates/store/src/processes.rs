// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process table history rows
//!
//! Live process state lives in the kernel's in-memory table; these rows
//! are the durable history that survives reaping and restarts.

use crate::{json_text, StateStore, StoreError};
use aether_core::{AgentPhase, Pid, ProcState, ProcessInfo, Uid};
use rusqlite::{params, OptionalExtension, Row};

fn row_to_process(row: &Row<'_>) -> Result<ProcessInfo, rusqlite::Error> {
    let state: String = row.get(5)?;
    let phase: String = row.get(6)?;
    let env: String = row.get(10)?;
    Ok(ProcessInfo {
        pid: Pid(row.get(0)?),
        uid: Uid::new(row.get::<_, String>(1)?),
        name: row.get(2)?,
        role: row.get(3)?,
        goal: row.get(4)?,
        state: ProcState::parse(&state).unwrap_or(ProcState::Dead),
        phase: AgentPhase::parse(&phase).unwrap_or(AgentPhase::Idle),
        exit_code: row.get(7)?,
        created_at_ms: row.get::<_, i64>(8)? as u64,
        exited_at_ms: row.get::<_, Option<i64>>(9)?.map(|v| v as u64),
        env: serde_json::from_str(&env).unwrap_or_default(),
        tty_id: row.get(11)?,
        vnc_ws_url: row.get(12)?,
    })
}

const PROCESS_COLUMNS: &str = "pid, uid, name, role, goal, state, phase, exit_code, \
     created_at_ms, exited_at_ms, env, tty_id, vnc_ws_url";

impl StateStore {
    /// Insert or replace the history row for a process.
    pub fn upsert_process(&self, info: &ProcessInfo) -> Result<(), StoreError> {
        let conn = self.conn();
        conn.execute(
            r#"
            INSERT INTO processes (pid, uid, name, role, goal, state, phase, exit_code,
                                   created_at_ms, exited_at_ms, env, tty_id, vnc_ws_url)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            ON CONFLICT(pid) DO UPDATE SET
                state = ?6,
                phase = ?7,
                exit_code = COALESCE(processes.exit_code, ?8),
                exited_at_ms = COALESCE(processes.exited_at_ms, ?10),
                tty_id = COALESCE(?12, tty_id),
                vnc_ws_url = COALESCE(?13, vnc_ws_url)
            "#,
            params![
                info.pid.as_i64(),
                info.uid.as_str(),
                info.name,
                info.role,
                info.goal,
                info.state.as_str(),
                info.phase.as_str(),
                info.exit_code,
                info.created_at_ms as i64,
                info.exited_at_ms.map(|v| v as i64),
                json_text(&info.env)?,
                info.tty_id,
                info.vnc_ws_url,
            ],
        )?;
        Ok(())
    }

    /// Record a state transition observed on the bus.
    pub fn set_process_state(&self, pid: Pid, state: ProcState) -> Result<(), StoreError> {
        self.conn().execute(
            "UPDATE processes SET state = ?2 WHERE pid = ?1",
            params![pid.as_i64(), state.as_str()],
        )?;
        Ok(())
    }

    pub fn set_process_phase(&self, pid: Pid, phase: AgentPhase) -> Result<(), StoreError> {
        self.conn().execute(
            "UPDATE processes SET phase = ?2 WHERE pid = ?1",
            params![pid.as_i64(), phase.as_str()],
        )?;
        Ok(())
    }

    /// Persist an exit. The guard keeps the exit code first-write-wins
    /// so a replayed `process.exit` cannot overwrite it.
    pub fn record_process_exit(
        &self,
        pid: Pid,
        exit_code: i32,
        exited_at_ms: u64,
    ) -> Result<(), StoreError> {
        self.conn().execute(
            r#"
            UPDATE processes
            SET state = 'zombie',
                exit_code = ?2,
                exited_at_ms = ?3
            WHERE pid = ?1 AND exit_code IS NULL
            "#,
            params![pid.as_i64(), exit_code, exited_at_ms as i64],
        )?;
        Ok(())
    }

    pub fn get_process(&self, pid: Pid) -> Result<Option<ProcessInfo>, StoreError> {
        let conn = self.conn();
        let result = conn
            .query_row(
                &format!("SELECT {PROCESS_COLUMNS} FROM processes WHERE pid = ?1"),
                [pid.as_i64()],
                |row| row_to_process(row),
            )
            .optional()?;
        Ok(result)
    }

    /// Full process history, newest first, optionally scoped to a user.
    pub fn list_process_history(
        &self,
        owner: Option<&Uid>,
        limit: usize,
    ) -> Result<Vec<ProcessInfo>, StoreError> {
        let conn = self.conn();
        let mut out = Vec::new();
        match owner {
            Some(uid) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {PROCESS_COLUMNS} FROM processes WHERE uid = ?1 \
                     ORDER BY pid DESC LIMIT ?2"
                ))?;
                let rows = stmt.query_map(params![uid.as_str(), limit as i64], |row| {
                    row_to_process(row)
                })?;
                for row in rows {
                    out.push(row?);
                }
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {PROCESS_COLUMNS} FROM processes ORDER BY pid DESC LIMIT ?1"
                ))?;
                let rows = stmt.query_map(params![limit as i64], |row| row_to_process(row))?;
                for row in rows {
                    out.push(row?);
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
#[path = "processes_tests.rs"]
mod tests;
