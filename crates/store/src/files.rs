// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File metadata index for agent homes

use crate::{StateStore, StoreError};
use aether_core::{FileMetadata, FileType, Uid};
use rusqlite::{params, OptionalExtension};

impl StateStore {
    pub fn upsert_file(&self, meta: &FileMetadata) -> Result<(), StoreError> {
        self.conn().execute(
            r#"
            INSERT INTO files (path, owner_uid, size, file_type, created_at_ms, modified_at_ms)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(path) DO UPDATE SET
                size = ?3,
                file_type = ?4,
                modified_at_ms = ?6
            "#,
            params![
                meta.path,
                meta.owner_uid.as_str(),
                meta.size as i64,
                meta.file_type.as_str(),
                meta.created_at_ms as i64,
                meta.modified_at_ms as i64,
            ],
        )?;
        Ok(())
    }

    pub fn delete_file(&self, path: &str) -> Result<(), StoreError> {
        self.conn()
            .execute("DELETE FROM files WHERE path = ?1", params![path])?;
        Ok(())
    }

    pub fn get_file(&self, path: &str) -> Result<Option<FileMetadata>, StoreError> {
        let conn = self.conn();
        let result = conn
            .query_row(
                r#"
                SELECT path, owner_uid, size, file_type, created_at_ms, modified_at_ms
                FROM files WHERE path = ?1
                "#,
                params![path],
                |row| {
                    let file_type: String = row.get(3)?;
                    Ok(FileMetadata {
                        path: row.get(0)?,
                        owner_uid: Uid::new(row.get::<_, String>(1)?),
                        size: row.get::<_, i64>(2)? as u64,
                        file_type: FileType::parse(&file_type).unwrap_or(FileType::File),
                        created_at_ms: row.get::<_, i64>(4)? as u64,
                        modified_at_ms: row.get::<_, i64>(5)? as u64,
                    })
                },
            )
            .optional()?;
        Ok(result)
    }

    pub fn list_files(&self, owner: &Uid) -> Result<Vec<FileMetadata>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            r#"
            SELECT path, owner_uid, size, file_type, created_at_ms, modified_at_ms
            FROM files WHERE owner_uid = ?1 ORDER BY path
            "#,
        )?;
        let rows = stmt.query_map(params![owner.as_str()], |row| {
            let file_type: String = row.get(3)?;
            Ok(FileMetadata {
                path: row.get(0)?,
                owner_uid: Uid::new(row.get::<_, String>(1)?),
                size: row.get::<_, i64>(2)? as u64,
                file_type: FileType::parse(&file_type).unwrap_or(FileType::File),
                created_at_ms: row.get::<_, i64>(4)? as u64,
                modified_at_ms: row.get::<_, i64>(5)? as u64,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}
