// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Secret-stripping for audit records and persisted arguments

use serde_json::Value;

/// Keys removed wherever they appear, compared case-insensitively.
const SECRET_KEYS: &[&str] = &["password", "secret", "token", "apikey"];

/// Longest string retained verbatim; anything longer is truncated.
const MAX_STRING_LEN: usize = 1024;

/// Return a copy of `value` with secret-named keys removed recursively
/// and long strings truncated.
pub fn sanitize_json(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let cleaned = map
                .iter()
                .filter(|(k, _)| !is_secret_key(k))
                .map(|(k, v)| (k.clone(), sanitize_json(v)))
                .collect();
            Value::Object(cleaned)
        }
        Value::Array(items) => Value::Array(items.iter().map(sanitize_json).collect()),
        Value::String(s) if s.len() > MAX_STRING_LEN => {
            let mut end = MAX_STRING_LEN;
            while !s.is_char_boundary(end) {
                end -= 1;
            }
            Value::String(format!("{}…[truncated]", &s[..end]))
        }
        other => other.clone(),
    }
}

fn is_secret_key(key: &str) -> bool {
    let lowered = key.to_ascii_lowercase();
    SECRET_KEYS.iter().any(|k| lowered == *k)
}

#[cfg(test)]
#[path = "sanitize_tests.rs"]
mod tests;
