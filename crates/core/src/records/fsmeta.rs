// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::id::Uid;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    File,
    Directory,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::File => "file",
            FileType::Directory => "directory",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "file" => Some(FileType::File),
            "directory" => Some(FileType::Directory),
            _ => None,
        }
    }
}

/// Metadata index row for a file in an agent home.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileMetadata {
    /// Path relative to the kernel home root, unique.
    pub path: String,
    pub owner_uid: Uid,
    pub size: u64,
    pub file_type: FileType,
    pub created_at_ms: u64,
    pub modified_at_ms: u64,
}

/// Point-in-time kernel resource sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KernelMetric {
    pub timestamp: u64,
    pub process_count: u32,
    pub cpu_percent: f64,
    pub memory_mb: f64,
    pub container_count: u32,
}
