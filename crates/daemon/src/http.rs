// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP surface: WebSocket upgrade, auth convenience routes, health,
//! and inbound webhook ingress. Everything else rides the framed
//! protocol.

use crate::gateway::{self, ConnState, Gateway};
use aether_core::{Clock, ErrorCode, KernelError};
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

pub fn router<C: Clock>(gateway: Arc<Gateway<C>>) -> Router {
    Router::new()
        .route("/ws", get(ws_upgrade::<C>))
        .route("/api/auth/register", post(http_register::<C>))
        .route("/api/auth/login", post(http_login::<C>))
        .route("/api/kernel", get(http_kernel::<C>))
        .route("/hook/{token}", post(http_inbound::<C>))
        .with_state(gateway)
}

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::Unauthenticated => StatusCode::UNAUTHORIZED,
        ErrorCode::Forbidden => StatusCode::FORBIDDEN,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Conflict => StatusCode::CONFLICT,
        ErrorCode::ArgValidation | ErrorCode::BadFrame => StatusCode::BAD_REQUEST,
        ErrorCode::RateLimited | ErrorCode::CapacityExceeded => StatusCode::TOO_MANY_REQUESTS,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(error: KernelError) -> Response {
    let status = status_for(error.code);
    let body = json!({ "error": { "code": error.code.as_str(), "message": error.message } });
    (status, Json(body)).into_response()
}

async fn ws_upgrade<C: Clock>(
    State(gateway): State<Arc<Gateway<C>>>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| gateway::handle_socket(socket, gateway))
}

async fn http_register<C: Clock>(
    State(gateway): State<Arc<Gateway<C>>>,
    Json(payload): Json<Value>,
) -> Response {
    let mut conn = ConnState::default();
    match crate::gateway::commands::auth::register(&gateway, &mut conn, &payload) {
        Ok(data) => Json(data).into_response(),
        Err(error) => error_response(error),
    }
}

async fn http_login<C: Clock>(
    State(gateway): State<Arc<Gateway<C>>>,
    Json(payload): Json<Value>,
) -> Response {
    let mut conn = ConnState::default();
    match crate::gateway::commands::auth::login(&gateway, &mut conn, &payload) {
        Ok(data) => Json(data).into_response(),
        Err(error) => error_response(error),
    }
}

/// Health plus bearer echo.
async fn http_kernel<C: Clock>(
    State(gateway): State<Arc<Gateway<C>>>,
    headers: HeaderMap,
) -> Response {
    let user = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .and_then(|token| gateway.kernel.auth.verify_token(token).ok());

    Json(json!({
        "status": "ok",
        "cluster": gateway.kernel.cluster_info(),
        "user": user,
    }))
    .into_response()
}

/// `POST /hook/{token}`: spawn an agent from a stored inbound hook.
async fn http_inbound<C: Clock>(
    State(gateway): State<Arc<Gateway<C>>>,
    Path(token): Path<String>,
    body: String,
) -> Response {
    let hook = match gateway.kernel.store.get_inbound_webhook(&token) {
        Ok(Some(hook)) => hook,
        Ok(None) => return error_response(KernelError::not_found("hook")),
        Err(e) => return error_response(KernelError::internal(e)),
    };

    let payload: Value = serde_json::from_str(&body).unwrap_or(Value::Null);

    // The transform is a dotted projection into the request body; its
    // result is appended to the configured goal.
    let mut config = hook.agent_config.clone();
    let projected = hook
        .transform
        .as_deref()
        .and_then(|path| {
            let mut current = &payload;
            for segment in path.split('.') {
                current = current.get(segment)?;
            }
            Some(current.clone())
        })
        .unwrap_or_else(|| payload.clone());
    if !projected.is_null() {
        let rendered = match &projected {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        config.goal = format!("{}\n\nWebhook payload: {rendered}", config.goal);
    }

    match gateway.kernel.spawn_process(&hook.owner_uid, &config) {
        Ok(info) => {
            let now = gateway.kernel.clock.epoch_ms();
            if let Err(e) = gateway.kernel.store.mark_inbound_triggered(&token, now) {
                tracing::warn!(error = %e, "inbound hook bookkeeping failed");
            }
            info!(token = %hook.token, pid = %info.pid, "inbound webhook spawned agent");
            Json(json!({ "pid": info.pid })).into_response()
        }
        Err(error) => error_response(error),
    }
}
