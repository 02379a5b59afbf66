// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dotted-path event filters for triggers and webhooks

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A flat map of dotted JSON paths to expected scalar values.
///
/// `{"data.tool": "fs_write"}` matches an event payload whose `data`
/// object carries `tool == "fs_write"`. An empty filter matches
/// everything; a missing path matches nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct EventFilter(BTreeMap<String, serde_json::Value>);

impl EventFilter {
    pub fn new(paths: BTreeMap<String, serde_json::Value>) -> Self {
        Self(paths)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether every path resolves to its expected value in `payload`.
    pub fn matches(&self, payload: &serde_json::Value) -> bool {
        self.0
            .iter()
            .all(|(path, expected)| lookup(payload, path) == Some(expected))
    }
}

/// Resolve a dotted path against a JSON value.
fn lookup<'a>(value: &'a serde_json::Value, path: &str) -> Option<&'a serde_json::Value> {
    let mut current = value;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }
    Some(current)
}

#[cfg(test)]
#[path = "filter_tests.rs"]
mod tests;
