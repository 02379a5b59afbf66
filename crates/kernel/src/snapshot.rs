// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent-home snapshots as gzip tarballs

use aether_core::{Clock, KernelError, Pid, ProcessInfo, SnapshotId, SnapshotRecord};
use aether_store::StateStore;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

/// Capture a process's home directory into a tarball and record it.
pub fn create_snapshot<C: Clock>(
    store: &Arc<StateStore>,
    clock: &C,
    info: &ProcessInfo,
    home: &Path,
    snapshot_dir: &Path,
    description: &str,
) -> Result<SnapshotRecord, KernelError> {
    std::fs::create_dir_all(snapshot_dir).map_err(KernelError::internal)?;

    let id = SnapshotId::new(format!("snap-{}", uuid::Uuid::new_v4()));
    let tarball_path = snapshot_dir.join(format!("{}.tar.gz", id.as_str()));

    let file = File::create(&tarball_path).map_err(KernelError::internal)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = tar::Builder::new(encoder);
    if home.is_dir() {
        builder
            .append_dir_all(".", home)
            .map_err(KernelError::internal)?;
    }
    let encoder = builder.into_inner().map_err(KernelError::internal)?;
    encoder.finish().map_err(KernelError::internal)?;

    let size_bytes = std::fs::metadata(&tarball_path)
        .map(|m| m.len())
        .unwrap_or(0);

    let record = SnapshotRecord {
        id,
        pid: info.pid,
        timestamp: clock.epoch_ms(),
        description: description.to_string(),
        file_path: home.display().to_string(),
        tarball_path: tarball_path.display().to_string(),
        process_info: serde_json::to_value(info).map_err(KernelError::internal)?,
        size_bytes,
    };
    store.insert_snapshot(&record).map_err(KernelError::internal)?;
    Ok(record)
}

/// Delete a snapshot record and its tarball.
pub fn delete_snapshot(store: &Arc<StateStore>, id: &SnapshotId) -> Result<bool, KernelError> {
    let Some(record) = store.get_snapshot(id).map_err(KernelError::internal)? else {
        return Ok(false);
    };
    let _ = std::fs::remove_file(&record.tarball_path);
    store.delete_snapshot(id).map_err(KernelError::internal)
}

/// Re-exported for gateway listings.
pub fn list_snapshots(
    store: &Arc<StateStore>,
    pid: Option<Pid>,
) -> Result<Vec<SnapshotRecord>, KernelError> {
    store.list_snapshots(pid).map_err(KernelError::internal)
}
