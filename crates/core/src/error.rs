// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy shared across the kernel and the wire protocol

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable error codes carried in `response.err` frames.
///
/// The code is the programmatic branch point; the message alongside it
/// is for humans and carries no stability guarantee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    UnknownCommand,
    ArgValidation,
    Unauthenticated,
    Forbidden,
    NotFound,
    Conflict,
    RateLimited,
    InvalidState,
    CapacityExceeded,
    ToolTimeout,
    ToolExecution,
    LlmUnavailable,
    Persistence,
    Internal,
    BadFrame,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::UnknownCommand => "unknown_command",
            ErrorCode::ArgValidation => "arg_validation",
            ErrorCode::Unauthenticated => "unauthenticated",
            ErrorCode::Forbidden => "forbidden",
            ErrorCode::NotFound => "not_found",
            ErrorCode::Conflict => "conflict",
            ErrorCode::RateLimited => "rate_limited",
            ErrorCode::InvalidState => "invalid_state",
            ErrorCode::CapacityExceeded => "capacity_exceeded",
            ErrorCode::ToolTimeout => "tool_timeout",
            ErrorCode::ToolExecution => "tool_execution",
            ErrorCode::LlmUnavailable => "llm_unavailable",
            ErrorCode::Persistence => "persistence",
            ErrorCode::Internal => "internal",
            ErrorCode::BadFrame => "bad_frame",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A typed kernel error: stable code plus human-readable message.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct KernelError {
    pub code: ErrorCode,
    pub message: String,
}

impl KernelError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(what: impl std::fmt::Display) -> Self {
        Self::new(ErrorCode::NotFound, format!("{what} not found"))
    }

    pub fn forbidden(action: impl std::fmt::Display) -> Self {
        Self::new(ErrorCode::Forbidden, format!("not allowed: {action}"))
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthenticated, message)
    }

    pub fn invalid_args(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ArgValidation, message)
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidState, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, message)
    }

    pub fn internal(message: impl std::fmt::Display) -> Self {
        Self::new(ErrorCode::Internal, message.to_string())
    }
}
