// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Accounts, password hashing, bearer tokens, TOTP second factor

use crate::bus::EventBus;
use crate::config::AuthConfig;
use aether_core::{Clock, ErrorCode, Event, KernelError, Role, Uid, UserRecord};
use aether_store::StateStore;
use argon2::password_hash::{rand_core::OsRng, PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use hmac::{Hmac, Mac};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::info;

/// TOTP step length in seconds (RFC 6238 default).
const TOTP_STEP_SECS: u64 = 30;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    username: String,
    role: String,
    exp: u64,
}

/// Outcome of a successful register/login.
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub user: UserRecord,
    pub token: String,
}

pub struct AuthService<C: Clock> {
    store: Arc<StateStore>,
    bus: EventBus,
    clock: C,
    config: AuthConfig,
    /// Revoked tokens, bounded FIFO.
    denylist: Mutex<VecDeque<String>>,
}

impl<C: Clock> AuthService<C> {
    pub fn new(store: Arc<StateStore>, bus: EventBus, clock: C, config: AuthConfig) -> Self {
        Self {
            store,
            bus,
            clock,
            config,
            denylist: Mutex::new(VecDeque::new()),
        }
    }

    /// Create an account. The first user becomes admin.
    pub fn register(
        &self,
        username: &str,
        password: &str,
        display_name: &str,
    ) -> Result<AuthSession, KernelError> {
        if username.is_empty() {
            return Err(KernelError::invalid_args("username must not be empty"));
        }
        if password.len() < self.config.min_password_len {
            return Err(KernelError::invalid_args(format!(
                "password must be at least {} characters",
                self.config.min_password_len
            )));
        }

        let role = if self.store.user_count().map_err(KernelError::internal)? == 0 {
            Role::Admin
        } else {
            Role::User
        };

        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(KernelError::internal)?
            .to_string();

        let user = UserRecord {
            uid: Uid::new(format!("u-{}", uuid::Uuid::new_v4())),
            username: username.to_string(),
            display_name: display_name.to_string(),
            password_hash,
            role,
            created_at_ms: self.clock.epoch_ms(),
            last_login_ms: None,
            mfa_secret: None,
            mfa_enabled: false,
        };

        self.store.insert_user(&user).map_err(|e| match e {
            aether_store::StoreError::Conflict(message) => {
                KernelError::new(ErrorCode::Conflict, message)
            }
            other => KernelError::internal(other),
        })?;

        info!(username, uid = %user.uid, role = role.as_str(), "user registered");
        self.bus.emit(Event::UserRegistered {
            uid: user.uid.clone(),
            username: user.username.clone(),
        });

        let token = self.issue_token(&user)?;
        Ok(AuthSession { user, token })
    }

    /// Verify credentials (and TOTP when enabled) and issue a token.
    pub fn login(
        &self,
        username: &str,
        password: &str,
        totp: Option<&str>,
    ) -> Result<AuthSession, KernelError> {
        let user = match self
            .store
            .get_user_by_username(username)
            .map_err(KernelError::internal)?
        {
            Some(user) => user,
            None => return Err(self.login_failure(username, "unknown user")),
        };

        if !verify_password(&user.password_hash, password) {
            return Err(self.login_failure(username, "bad password"));
        }

        if user.mfa_enabled {
            let secret = user.mfa_secret.as_deref().unwrap_or_default();
            match totp {
                None => {
                    return Err(KernelError::unauthenticated("mfa_required"));
                }
                Some(code) if !self.verify_totp(secret, code) => {
                    return Err(self.login_failure(username, "invalid mfa code"));
                }
                Some(_) => {}
            }
        }

        let now = self.clock.epoch_ms();
        self.store
            .set_last_login(&user.uid, now)
            .map_err(KernelError::internal)?;

        self.bus.emit(Event::UserLogin {
            uid: user.uid.clone(),
            username: user.username.clone(),
        });

        let token = self.issue_token(&user)?;
        Ok(AuthSession { user, token })
    }

    fn login_failure(&self, username: &str, reason: &str) -> KernelError {
        self.bus.emit(Event::UserLoginFailed {
            username: username.to_string(),
            reason: reason.to_string(),
        });
        // One opaque message for every credential failure.
        KernelError::unauthenticated("invalid credentials")
    }

    /// Validate a bearer token and load its user.
    pub fn verify_token(&self, token: &str) -> Result<UserRecord, KernelError> {
        if self.denylist.lock().contains(&token.to_string()) {
            return Err(KernelError::unauthenticated("token revoked"));
        }

        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.token_secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|_| KernelError::unauthenticated("invalid token"))?;

        self.store
            .get_user(&Uid::new(data.claims.sub))
            .map_err(KernelError::internal)?
            .ok_or_else(|| KernelError::unauthenticated("user no longer exists"))
    }

    /// Revoke a token until the denylist rotates it out.
    pub fn logout(&self, token: &str) {
        let mut denylist = self.denylist.lock();
        if denylist.len() >= self.config.denylist_cap {
            denylist.pop_front();
        }
        denylist.push_back(token.to_string());
    }

    /// Generate (but do not yet enable) a TOTP secret.
    pub fn mfa_setup(&self, uid: &Uid) -> Result<String, KernelError> {
        let mut raw = [0u8; 20];
        use rand::RngCore;
        rand::thread_rng().fill_bytes(&mut raw);
        let secret = base32::encode(base32::Alphabet::Rfc4648 { padding: false }, &raw);

        self.store
            .set_mfa(uid, Some(&secret), false)
            .map_err(KernelError::internal)?;
        Ok(secret)
    }

    /// Confirm the user's authenticator and enable MFA.
    pub fn mfa_verify(&self, uid: &Uid, code: &str) -> Result<(), KernelError> {
        let user = self
            .store
            .get_user(uid)
            .map_err(KernelError::internal)?
            .ok_or_else(|| KernelError::not_found(format!("user {uid}")))?;

        let secret = user
            .mfa_secret
            .as_deref()
            .ok_or_else(|| KernelError::invalid_state("mfa setup has not run"))?;

        if !self.verify_totp(secret, code) {
            return Err(KernelError::unauthenticated("invalid mfa code"));
        }
        self.store
            .set_mfa(uid, Some(secret), true)
            .map_err(KernelError::internal)?;
        Ok(())
    }

    fn issue_token(&self, user: &UserRecord) -> Result<String, KernelError> {
        let claims = Claims {
            sub: user.uid.as_str().to_string(),
            username: user.username.clone(),
            role: user.role.as_str().to_string(),
            exp: jsonwebtoken::get_current_timestamp() + self.config.token_ttl.as_secs(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.token_secret.as_bytes()),
        )
        .map_err(KernelError::internal)
    }

    /// Check a TOTP code with ±1 step tolerance.
    pub fn verify_totp(&self, secret_base32: &str, code: &str) -> bool {
        let Some(secret) =
            base32::decode(base32::Alphabet::Rfc4648 { padding: false }, secret_base32)
        else {
            return false;
        };
        let counter = self.clock.epoch_ms() / 1000 / TOTP_STEP_SECS;
        for candidate in counter.saturating_sub(1)..=counter + 1 {
            if format!("{:06}", totp_code(&secret, candidate)) == code {
                return true;
            }
        }
        false
    }
}

fn verify_password(hash: &str, password: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// RFC 4226 dynamic truncation over HMAC-SHA1.
fn totp_code(secret: &[u8], counter: u64) -> u32 {
    let Ok(mut mac) = Hmac::<Sha1>::new_from_slice(secret) else {
        return 0;
    };
    mac.update(&counter.to_be_bytes());
    let digest = mac.finalize().into_bytes();
    let offset = (digest[19] & 0x0f) as usize;
    let binary = ((digest[offset] & 0x7f) as u32) << 24
        | (digest[offset + 1] as u32) << 16
        | (digest[offset + 2] as u32) << 8
        | digest[offset + 3] as u32;
    binary % 1_000_000
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
