// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire protocol for the admin WebSocket.
//!
//! Every frame is a single JSON object with a required `type` field.
//! Commands carry a client-chosen `id`; responses echo it. Event
//! frames are the event's own serialized form and never carry an `id`.

use aether_core::{ErrorCode, KernelError};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// A parsed client frame: command name, correlation id, payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub kind: String,
    pub id: Option<String>,
    pub payload: Value,
}

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("frame is not a JSON object")]
    NotAnObject,

    #[error("frame is missing 'type'")]
    MissingType,

    #[error("malformed JSON: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl Frame {
    /// Parse one text frame. The `type` and `id` fields are lifted out;
    /// everything else stays as the payload object.
    pub fn parse(text: &str) -> Result<Self, FrameError> {
        let value: Value = serde_json::from_str(text)?;
        let Value::Object(mut map) = value else {
            return Err(FrameError::NotAnObject);
        };

        let kind = match map.remove("type") {
            Some(Value::String(kind)) => kind,
            _ => return Err(FrameError::MissingType),
        };
        let id = match map.remove("id") {
            Some(Value::String(id)) => Some(id),
            _ => None,
        };

        Ok(Self {
            kind,
            id,
            payload: Value::Object(map),
        })
    }
}

/// `response.ok` frame.
#[derive(Debug, Serialize)]
pub struct OkResponse<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// `response.err` frame.
#[derive(Debug, Serialize)]
pub struct ErrResponse<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<&'a str>,
    pub error: WireError,
}

#[derive(Debug, Serialize)]
pub struct WireError {
    pub code: &'static str,
    pub message: String,
}

/// Render a command result as a response frame.
pub fn render_response(id: Option<&str>, result: Result<Value, KernelError>) -> String {
    match result {
        Ok(data) => {
            let frame = OkResponse {
                kind: "response.ok",
                id,
                data: if data.is_null() { None } else { Some(data) },
            };
            serde_json::to_string(&frame).unwrap_or_else(|_| fallback_err(id))
        }
        Err(error) => {
            let frame = ErrResponse {
                kind: "response.err",
                id,
                error: WireError {
                    code: error.code.as_str(),
                    message: error.message,
                },
            };
            serde_json::to_string(&frame).unwrap_or_else(|_| fallback_err(id))
        }
    }
}

/// A bad-frame reply, sent once before disconnecting.
pub fn render_bad_frame(message: &str) -> String {
    let frame = ErrResponse {
        kind: "response.err",
        id: None,
        error: WireError {
            code: ErrorCode::BadFrame.as_str(),
            message: message.to_string(),
        },
    };
    serde_json::to_string(&frame).unwrap_or_else(|_| fallback_err(None))
}

fn fallback_err(id: Option<&str>) -> String {
    match id {
        Some(id) => format!(
            r#"{{"type":"response.err","id":{},"error":{{"code":"internal","message":"serialization failed"}}}}"#,
            serde_json::Value::String(id.to_string())
        ),
        None => r#"{"type":"response.err","error":{"code":"internal","message":"serialization failed"}}"#.to_string(),
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
