// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! aether-store: the kernel's persistence layer
//!
//! A single embedded SQLite database owns every persistent domain. The
//! store is the sole writer; components either call typed methods or
//! feed kernel events through [`StateStore::apply_event`].

mod apply;
mod audit;
mod error;
mod files;
mod kv;
mod logs;
mod memories;
mod metrics;
mod orgs;
mod plans;
mod policies;
mod processes;
mod schedules;
mod schema;
mod snapshots;
mod users;
mod webhooks;

pub use error::StoreError;

use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Synchronous persistence layer over an embedded SQLite file.
///
/// All methods lock the single connection; SQLite serializes writes
/// internally and the kernel treats every call as a suspension point.
pub struct StateStore {
    conn: Mutex<Connection>,
    persistence_disabled: bool,
    path: Option<PathBuf>,
}

impl StateStore {
    /// Open (or create) the database at `path`.
    ///
    /// A corrupt file is deleted together with its `-wal`/`-shm`
    /// sidecars and recreated; if the retry also fails the store runs
    /// on an in-memory database and flags persistence as disabled.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();

        match Self::open_at(path) {
            Ok(store) => Ok(store),
            Err(first) => {
                warn!(
                    path = %path.display(),
                    error = %first,
                    "database unusable, deleting and recreating"
                );
                remove_with_sidecars(path);

                match Self::open_at(path) {
                    Ok(store) => Ok(store),
                    Err(second) => {
                        warn!(
                            error = %second,
                            "recreate failed, falling back to in-memory state (persistence disabled)"
                        );
                        let conn = Connection::open_in_memory()?;
                        schema::init_schema(&conn)?;
                        Ok(Self {
                            conn: Mutex::new(conn),
                            persistence_disabled: true,
                            path: Some(path.to_path_buf()),
                        })
                    }
                }
            }
        }
    }

    /// Open an in-memory store (tests, and the persistence fallback).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        schema::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            persistence_disabled: false,
            path: None,
        })
    }

    fn open_at(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Invalid(format!("create state dir: {e}")))?;
        }
        let conn = Connection::open(path)?;
        schema::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            persistence_disabled: false,
            path: Some(path.to_path_buf()),
        })
    }

    /// True when the on-disk database could not be recreated and the
    /// kernel is running fully in memory.
    pub fn persistence_disabled(&self) -> bool {
        self.persistence_disabled
    }

    /// The configured database path, if the store was opened from disk.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub(crate) fn conn(&self) -> parking_lot::MutexGuard<'_, Connection> {
        self.conn.lock()
    }
}

fn remove_with_sidecars(path: &Path) {
    let base = path.display().to_string();
    for candidate in [
        base.clone(),
        format!("{base}-wal"),
        format!("{base}-shm"),
    ] {
        let _ = std::fs::remove_file(candidate);
    }
}

/// Serialize a value into a JSON TEXT column.
pub(crate) fn json_text<T: serde::Serialize>(value: &T) -> Result<String, StoreError> {
    Ok(serde_json::to_string(value)?)
}

/// Deserialize a JSON TEXT column, treating malformed content as an error.
pub(crate) fn from_json_text<T: serde::de::DeserializeOwned>(text: &str) -> Result<T, StoreError> {
    Ok(serde_json::from_str(text)?)
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
