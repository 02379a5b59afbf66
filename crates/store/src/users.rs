// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! User accounts

use crate::{StateStore, StoreError};
use aether_core::{Role, Uid, UserRecord};
use rusqlite::{params, OptionalExtension, Row};

fn row_to_user(row: &Row<'_>) -> Result<UserRecord, rusqlite::Error> {
    let role: String = row.get(4)?;
    Ok(UserRecord {
        uid: Uid::new(row.get::<_, String>(0)?),
        username: row.get(1)?,
        display_name: row.get(2)?,
        password_hash: row.get(3)?,
        role: Role::parse(&role).unwrap_or(Role::User),
        created_at_ms: row.get::<_, i64>(5)? as u64,
        last_login_ms: row.get::<_, Option<i64>>(6)?.map(|v| v as u64),
        mfa_secret: row.get(7)?,
        mfa_enabled: row.get::<_, i64>(8)? != 0,
    })
}

const USER_COLUMNS: &str = "uid, username, display_name, password_hash, role, created_at_ms, \
     last_login_ms, mfa_secret, mfa_enabled";

impl StateStore {
    /// Insert a new user. Duplicate usernames surface as `Conflict`.
    pub fn insert_user(&self, user: &UserRecord) -> Result<(), StoreError> {
        let result = self.conn().execute(
            r#"
            INSERT INTO users (uid, username, display_name, password_hash, role,
                               created_at_ms, last_login_ms, mfa_secret, mfa_enabled)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                user.uid.as_str(),
                user.username,
                user.display_name,
                user.password_hash,
                user.role.as_str(),
                user.created_at_ms as i64,
                user.last_login_ms.map(|v| v as i64),
                user.mfa_secret,
                user.mfa_enabled as i64,
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::conflict(format!(
                    "username '{}' already exists",
                    user.username
                )))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn get_user(&self, uid: &Uid) -> Result<Option<UserRecord>, StoreError> {
        let conn = self.conn();
        let result = conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE uid = ?1"),
                params![uid.as_str()],
                |row| row_to_user(row),
            )
            .optional()?;
        Ok(result)
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        let conn = self.conn();
        let result = conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"),
                params![username],
                |row| row_to_user(row),
            )
            .optional()?;
        Ok(result)
    }

    pub fn list_users(&self) -> Result<Vec<UserRecord>, StoreError> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at_ms"))?;
        let rows = stmt.query_map([], |row| row_to_user(row))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn user_count(&self) -> Result<usize, StoreError> {
        let count: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn set_last_login(&self, uid: &Uid, at_ms: u64) -> Result<(), StoreError> {
        self.conn().execute(
            "UPDATE users SET last_login_ms = ?2 WHERE uid = ?1",
            params![uid.as_str(), at_ms as i64],
        )?;
        Ok(())
    }

    pub fn set_mfa(&self, uid: &Uid, secret: Option<&str>, enabled: bool) -> Result<(), StoreError> {
        self.conn().execute(
            "UPDATE users SET mfa_secret = ?2, mfa_enabled = ?3 WHERE uid = ?1",
            params![uid.as_str(), secret, enabled as i64],
        )?;
        Ok(())
    }

    pub fn delete_user(&self, uid: &Uid) -> Result<bool, StoreError> {
        let removed = self
            .conn()
            .execute("DELETE FROM users WHERE uid = ?1", params![uid.as_str()])?;
        Ok(removed > 0)
    }
}
