// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon startup: paths, config assembly, kernel construction

use crate::env;
use crate::offline::OfflineChat;
use aether_core::SystemClock;
use aether_kernel::{ChatStep, Kernel, KernelConfig};
use aether_store::StateStore;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("no usable data directory")]
    NoDataDir,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store error: {0}")]
    Store(#[from] aether_store::StoreError),

    #[error("persistence unavailable and AETHER_REQUIRE_PERSISTENCE is set")]
    PersistenceRequired,
}

/// Resolved daemon configuration.
pub struct Config {
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
    pub log_path: PathBuf,
    pub port: u16,
    pub kernel: KernelConfig,
}

impl Config {
    pub fn load() -> Result<Self, LifecycleError> {
        let data_dir = match env::data_dir() {
            Some(dir) => dir,
            None => dirs::data_dir()
                .ok_or(LifecycleError::NoDataDir)?
                .join("aether"),
        };
        std::fs::create_dir_all(&data_dir)?;

        let db_path = env::db_path().unwrap_or_else(|| data_dir.join("kernel.db"));

        let mut kernel = KernelConfig {
            home_dir: data_dir.join("home"),
            snapshot_dir: data_dir.join("snapshots"),
            ..KernelConfig::default()
        };
        if let Some(max) = env::max_processes() {
            kernel.max_processes = max;
        }
        if let Some(grace) = env::zombie_grace() {
            kernel.reaper.zombie_grace = grace;
        }
        if let Some(secret) = env::token_secret() {
            kernel.auth.token_secret = secret;
        } else {
            warn!("AETHER_TOKEN_SECRET not set, using an ephemeral secret");
            kernel.auth.token_secret = uuid::Uuid::new_v4().to_string();
        }
        if let Some(days) = env::retention_days() {
            kernel.retention.audit = Duration::from_secs(days * 24 * 60 * 60);
        }

        Ok(Self {
            log_path: data_dir.join("daemon.log"),
            db_path,
            port: env::port(),
            data_dir,
            kernel,
        })
    }
}

/// Open the store and build the kernel.
pub fn startup(config: &Config) -> Result<Arc<Kernel<SystemClock>>, LifecycleError> {
    let store = Arc::new(StateStore::open(&config.db_path)?);
    if store.persistence_disabled() {
        if env::require_persistence() {
            return Err(LifecycleError::PersistenceRequired);
        }
        warn!("running with persistence disabled; state will not survive restarts");
    }

    let chat = chat_step();
    let kernel = Kernel::new(config.kernel.clone(), SystemClock, store, chat);
    info!(db = %config.db_path.display(), "kernel constructed");
    Ok(kernel)
}

/// Select the reasoning-step adapter.
///
/// Provider adapters are external; with no provider plugged in, agents
/// run against the offline step so the kernel surface stays usable.
fn chat_step() -> Arc<dyn ChatStep> {
    let keys = env::provider_keys();
    if !keys.is_empty() {
        info!(
            providers = ?keys.iter().map(|(name, _)| *name).collect::<Vec<_>>(),
            "provider keys present; plug a provider adapter to use them"
        );
    }
    Arc::new(OfflineChat)
}
