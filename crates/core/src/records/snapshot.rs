// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::id::{Pid, SnapshotId};
use serde::{Deserialize, Serialize};

/// A captured agent-home snapshot with its tarball on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub id: SnapshotId,
    pub pid: Pid,
    pub timestamp: u64,
    pub description: String,
    /// Home directory that was captured.
    pub file_path: String,
    pub tarball_path: String,
    /// Serialized ProcessInfo at capture time.
    pub process_info: serde_json::Value,
    pub size_bytes: u64,
}
