// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cron expression parsing and next-fire computation

use chrono::{DateTime, TimeZone, Utc};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CronError {
    #[error("invalid cron expression '{expr}': {reason}")]
    Invalid { expr: String, reason: String },
}

/// A parsed schedule: five-field cron syntax
/// (minute hour day-of-month month day-of-week) or one of the
/// `@hourly/@daily/@weekly/@monthly` macros.
#[derive(Debug, Clone)]
pub struct CronSchedule {
    schedule: cron::Schedule,
    source: String,
}

impl CronSchedule {
    pub fn parse(expr: &str) -> Result<Self, CronError> {
        let trimmed = expr.trim();
        let normalized = normalize(trimmed).ok_or_else(|| CronError::Invalid {
            expr: trimmed.to_string(),
            reason: "expected five fields or a @macro".to_string(),
        })?;

        let schedule = cron::Schedule::from_str(&normalized).map_err(|e| CronError::Invalid {
            expr: trimmed.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            schedule,
            source: trimmed.to_string(),
        })
    }

    /// The expression as written by the user.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Next fire time strictly after `epoch_ms`, as epoch milliseconds.
    ///
    /// Monotone in its argument and always strictly in the future of it.
    pub fn next_after(&self, epoch_ms: u64) -> Option<u64> {
        let after: DateTime<Utc> = Utc.timestamp_millis_opt(epoch_ms as i64).single()?;
        self.schedule
            .after(&after)
            .next()
            .map(|dt| dt.timestamp_millis() as u64)
    }
}

/// Rewrite a user expression into the six-field form the parser wants.
///
/// Macros pass through untouched; five fields gain a pinned seconds
/// column; six or seven fields are accepted as-is.
fn normalize(expr: &str) -> Option<String> {
    if expr.starts_with('@') {
        return Some(expr.to_string());
    }
    match expr.split_whitespace().count() {
        5 => Some(format!("0 {expr}")),
        6 | 7 => Some(expr.to_string()),
        _ => None,
    }
}

#[cfg(test)]
#[path = "cron_expr_tests.rs"]
mod tests;
