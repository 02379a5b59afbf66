// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Organizations, teams and memberships

use crate::{StateStore, StoreError};
use aether_core::{OrgId, OrgMember, OrgRole, Organization, Team, TeamId, TeamMember, Uid};
use rusqlite::{params, OptionalExtension};

impl StateStore {
    pub fn insert_org(&self, org: &Organization) -> Result<(), StoreError> {
        let result = self.conn().execute(
            "INSERT INTO orgs (id, name, created_at_ms) VALUES (?1, ?2, ?3)",
            params![org.id.as_str(), org.name, org.created_at_ms as i64],
        );
        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::conflict(format!(
                    "organization '{}' already exists",
                    org.name
                )))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn get_org(&self, id: &OrgId) -> Result<Option<Organization>, StoreError> {
        let conn = self.conn();
        let result = conn
            .query_row(
                "SELECT id, name, created_at_ms FROM orgs WHERE id = ?1",
                params![id.as_str()],
                |row| {
                    Ok(Organization {
                        id: OrgId::new(row.get::<_, String>(0)?),
                        name: row.get(1)?,
                        created_at_ms: row.get::<_, i64>(2)? as u64,
                    })
                },
            )
            .optional()?;
        Ok(result)
    }

    pub fn list_orgs(&self) -> Result<Vec<Organization>, StoreError> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare("SELECT id, name, created_at_ms FROM orgs ORDER BY created_at_ms")?;
        let rows = stmt.query_map([], |row| {
            Ok(Organization {
                id: OrgId::new(row.get::<_, String>(0)?),
                name: row.get(1)?,
                created_at_ms: row.get::<_, i64>(2)? as u64,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Delete an org and cascade to its teams and memberships in one
    /// transaction.
    pub fn delete_org(&self, id: &OrgId) -> Result<bool, StoreError> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM team_members WHERE team_id IN (SELECT id FROM teams WHERE org_id = ?1)",
            params![id.as_str()],
        )?;
        tx.execute("DELETE FROM teams WHERE org_id = ?1", params![id.as_str()])?;
        tx.execute(
            "DELETE FROM org_members WHERE org_id = ?1",
            params![id.as_str()],
        )?;
        let removed = tx.execute("DELETE FROM orgs WHERE id = ?1", params![id.as_str()])?;
        tx.commit()?;
        Ok(removed > 0)
    }

    pub fn add_org_member(&self, member: &OrgMember) -> Result<(), StoreError> {
        self.conn().execute(
            "INSERT INTO org_members (org_id, uid, role) VALUES (?1, ?2, ?3) \
             ON CONFLICT(org_id, uid) DO UPDATE SET role = ?3",
            params![
                member.org_id.as_str(),
                member.uid.as_str(),
                member.role.as_str()
            ],
        )?;
        Ok(())
    }

    pub fn org_members(&self, org_id: &OrgId) -> Result<Vec<OrgMember>, StoreError> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare("SELECT org_id, uid, role FROM org_members WHERE org_id = ?1")?;
        let rows = stmt.query_map(params![org_id.as_str()], |row| {
            let role: String = row.get(2)?;
            Ok(OrgMember {
                org_id: OrgId::new(row.get::<_, String>(0)?),
                uid: Uid::new(row.get::<_, String>(1)?),
                role: OrgRole::parse(&role).unwrap_or(OrgRole::Member),
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn insert_team(&self, team: &Team) -> Result<(), StoreError> {
        let result = self.conn().execute(
            "INSERT INTO teams (id, org_id, name, created_at_ms) VALUES (?1, ?2, ?3, ?4)",
            params![
                team.id.as_str(),
                team.org_id.as_str(),
                team.name,
                team.created_at_ms as i64
            ],
        );
        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::conflict(format!(
                    "team '{}' already exists in this organization",
                    team.name
                )))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn list_teams(&self, org_id: &OrgId) -> Result<Vec<Team>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, org_id, name, created_at_ms FROM teams WHERE org_id = ?1 ORDER BY name",
        )?;
        let rows = stmt.query_map(params![org_id.as_str()], |row| {
            Ok(Team {
                id: TeamId::new(row.get::<_, String>(0)?),
                org_id: OrgId::new(row.get::<_, String>(1)?),
                name: row.get(2)?,
                created_at_ms: row.get::<_, i64>(3)? as u64,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn add_team_member(&self, member: &TeamMember) -> Result<(), StoreError> {
        self.conn().execute(
            "INSERT INTO team_members (team_id, uid, role) VALUES (?1, ?2, ?3) \
             ON CONFLICT(team_id, uid) DO UPDATE SET role = ?3",
            params![
                member.team_id.as_str(),
                member.uid.as_str(),
                member.role.as_str()
            ],
        )?;
        Ok(())
    }

    pub fn team_members(&self, team_id: &TeamId) -> Result<Vec<TeamMember>, StoreError> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare("SELECT team_id, uid, role FROM team_members WHERE team_id = ?1")?;
        let rows = stmt.query_map(params![team_id.as_str()], |row| {
            let role: String = row.get(2)?;
            Ok(TeamMember {
                team_id: TeamId::new(row.get::<_, String>(0)?),
                uid: Uid::new(row.get::<_, String>(1)?),
                role: OrgRole::parse(&role).unwrap_or(OrgRole::Member),
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
#[path = "orgs_tests.rs"]
mod tests;
