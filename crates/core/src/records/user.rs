// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::id::Uid;
use serde::{Deserialize, Serialize};

/// Account role. The first registered user becomes admin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(Role::Admin),
            "user" => Some(Role::User),
            _ => None,
        }
    }
}

/// A registered user account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub uid: Uid,
    pub username: String,
    pub display_name: String,
    /// Argon2 PHC string; never serialized to clients.
    #[serde(skip_serializing)]
    #[serde(default)]
    pub password_hash: String,
    pub role: Role,
    pub created_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login_ms: Option<u64>,
    /// Base32 TOTP secret, present once MFA setup has run.
    #[serde(skip_serializing)]
    #[serde(default)]
    pub mfa_secret: Option<String>,
    #[serde(default)]
    pub mfa_enabled: bool,
}
