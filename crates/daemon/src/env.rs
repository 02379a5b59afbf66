// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Environment variable overrides
//!
//! Each knob is a small accessor with a default; the daemon reads them
//! once at startup when building its config.

use std::path::PathBuf;
use std::time::Duration;

/// Admin port for the WebSocket/HTTP listener.
pub fn port() -> u16 {
    std::env::var("AETHER_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(7600)
}

/// Database path override.
pub fn db_path() -> Option<PathBuf> {
    std::env::var("AETHER_DB_PATH").ok().map(PathBuf::from)
}

/// Root data directory override.
pub fn data_dir() -> Option<PathBuf> {
    std::env::var("AETHER_DATA_DIR").ok().map(PathBuf::from)
}

/// Bearer token signing secret.
pub fn token_secret() -> Option<String> {
    std::env::var("AETHER_TOKEN_SECRET").ok()
}

/// Audit retention override, in days.
pub fn retention_days() -> Option<u64> {
    std::env::var("AETHER_RETENTION_DAYS")
        .ok()
        .and_then(|v| v.parse().ok())
}

/// Live process cap.
pub fn max_processes() -> Option<usize> {
    std::env::var("AETHER_MAX_PROCESSES")
        .ok()
        .and_then(|v| v.parse().ok())
}

/// Zombie grace before reaping.
pub fn zombie_grace() -> Option<Duration> {
    std::env::var("AETHER_ZOMBIE_GRACE_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_secs)
}

/// When set, a failed database recreate is fatal (exit code 2)
/// instead of degrading to in-memory state.
pub fn require_persistence() -> bool {
    std::env::var("AETHER_REQUIRE_PERSISTENCE")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Provider API keys, surfaced to the chat adapter.
pub fn provider_keys() -> Vec<(&'static str, String)> {
    ["OPENAI_API_KEY", "ANTHROPIC_API_KEY", "GEMINI_API_KEY"]
        .iter()
        .filter_map(|name| std::env::var(name).ok().map(|v| (*name, v)))
        .collect()
}
