// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-component configuration records
//!
//! Every knob the kernel exposes lives here as an explicit field with a
//! default; the daemon overrides from environment variables at startup.

use std::path::PathBuf;
use std::time::Duration;

/// Top-level kernel configuration.
#[derive(Debug, Clone)]
pub struct KernelConfig {
    /// Root under which agent homes live (`home/{uid}/…`).
    pub home_dir: PathBuf,
    /// Directory for snapshot tarballs.
    pub snapshot_dir: PathBuf,
    /// Hard cap on live (non-dead) processes.
    pub max_processes: usize,
    pub bus: BusConfig,
    pub reaper: ReaperConfig,
    pub agent: AgentLoopConfig,
    pub cron: CronConfig,
    pub webhook: WebhookConfig,
    pub memory: MemoryConfig,
    pub auth: AuthConfig,
    pub retention: RetentionConfig,
    pub metrics: MetricsConfig,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            home_dir: PathBuf::from("home"),
            snapshot_dir: PathBuf::from("snapshots"),
            max_processes: 64,
            bus: BusConfig::default(),
            reaper: ReaperConfig::default(),
            agent: AgentLoopConfig::default(),
            cron: CronConfig::default(),
            webhook: WebhookConfig::default(),
            memory: MemoryConfig::default(),
            auth: AuthConfig::default(),
            retention: RetentionConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BusConfig {
    /// Per-subscriber queue depth for remote subscribers.
    pub queue_capacity: usize,
    /// Handlers slower than this log a warning.
    pub handler_budget: Duration,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            handler_budget: Duration::from_millis(50),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReaperConfig {
    /// How long a zombie lingers before the reaper collects it.
    pub zombie_grace: Duration,
    pub scan_interval: Duration,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            zombie_grace: Duration::from_secs(60),
            scan_interval: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AgentLoopConfig {
    /// Per-call LLM timeout.
    pub chat_timeout: Duration,
    /// Per-call tool timeout.
    pub tool_timeout: Duration,
}

impl Default for AgentLoopConfig {
    fn default() -> Self {
        Self {
            chat_timeout: Duration::from_secs(120),
            tool_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CronConfig {
    pub poll_interval: Duration,
}

impl Default for CronConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WebhookConfig {
    /// First backoff step; doubles per retry.
    pub backoff_base: Duration,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            backoff_base: Duration::from_millis(50),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MemoryConfig {
    /// Per-(agent, layer) cardinality cap.
    pub layer_cap: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self { layer_cap: 256 }
    }
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HS256 signing secret for bearer tokens.
    pub token_secret: String,
    pub token_ttl: Duration,
    pub min_password_len: usize,
    /// Bound on the logout denylist.
    pub denylist_cap: usize,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_secret: "change-me".to_string(),
            token_ttl: Duration::from_secs(24 * 60 * 60),
            min_password_len: 8,
            denylist_cap: 1024,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetentionConfig {
    pub audit: Duration,
    pub metrics: Duration,
    pub prune_interval: Duration,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            audit: Duration::from_secs(90 * 24 * 60 * 60),
            metrics: Duration::from_secs(7 * 24 * 60 * 60),
            prune_interval: Duration::from_secs(60 * 60),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MetricsConfig {
    pub sample_interval: Duration,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            sample_interval: Duration::from_secs(10),
        }
    }
}
