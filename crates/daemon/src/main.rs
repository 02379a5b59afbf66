// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Aether daemon (aetherd)
//!
//! Background process that owns the kernel: process table, event bus,
//! state store, schedulers, and the admin WebSocket/HTTP gateway.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod env;
mod gateway;
mod http;
mod lifecycle;
mod offline;
mod protocol;

use crate::gateway::Gateway;
use crate::lifecycle::{Config, LifecycleError};
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Exit codes: 0 clean shutdown, 1 fatal init, 2 persistence required
/// but unavailable.
const EXIT_FATAL_INIT: i32 = 1;
const EXIT_NO_PERSISTENCE: i32 = 2;

#[tokio::main]
async fn main() {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("aetherd {}", env!("CARGO_PKG_VERSION"));
                return;
            }
            "--help" | "-h" | "help" => {
                println!("aetherd {}", env!("CARGO_PKG_VERSION"));
                println!("Aether daemon - supervises agent processes and serves the admin gateway");
                println!();
                println!("USAGE:");
                println!("    aetherd");
                println!();
                println!("Listens on AETHER_PORT (default 7600) for WebSocket and HTTP");
                println!("clients. State lives under the user data directory unless");
                println!("AETHER_DATA_DIR or AETHER_DB_PATH override it.");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return;
            }
            other => {
                eprintln!("error: unexpected argument '{other}'");
                eprintln!("Usage: aetherd [--help | --version]");
                std::process::exit(EXIT_FATAL_INIT);
            }
        }
    }

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("failed to load configuration: {e}");
            std::process::exit(EXIT_FATAL_INIT);
        }
    };

    rotate_log_if_needed(&config.log_path);
    let _log_guard = match setup_logging(&config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("failed to set up logging: {e}");
            std::process::exit(EXIT_FATAL_INIT);
        }
    };

    info!(port = config.port, data_dir = %config.data_dir.display(), "starting aetherd");

    let kernel = match lifecycle::startup(&config) {
        Ok(kernel) => kernel,
        Err(LifecycleError::PersistenceRequired) => {
            error!("persistence unavailable and required; refusing to start");
            std::process::exit(EXIT_NO_PERSISTENCE);
        }
        Err(e) => {
            error!("failed to start kernel: {e}");
            std::process::exit(EXIT_FATAL_INIT);
        }
    };

    let cancel = CancellationToken::new();
    let driver_tasks = kernel.start(cancel.clone());

    let gateway = Arc::new(Gateway::new(kernel));
    let router = http::router(Arc::clone(&gateway));

    let listener = match tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(port = config.port, "failed to bind admin port: {e}");
            std::process::exit(EXIT_FATAL_INIT);
        }
    };

    info!(port = config.port, "gateway listening");

    let shutdown_cancel = cancel.clone();
    let serve = axum::serve(listener, router).with_graceful_shutdown(async move {
        wait_for_shutdown_signal().await;
        shutdown_cancel.cancel();
    });

    if let Err(e) = serve.await {
        error!("server error: {e}");
        cancel.cancel();
        std::process::exit(EXIT_FATAL_INIT);
    }

    cancel.cancel();
    for task in driver_tasks {
        let _ = task.await;
    }
    info!("daemon stopped");
}

async fn wait_for_shutdown_signal() {
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(_) => return,
    };
    let mut sigint = match signal(SignalKind::interrupt()) {
        Ok(s) => s,
        Err(_) => return,
    };
    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
        _ = sigint.recv() => info!("received SIGINT, shutting down"),
    }
}

/// Maximum log file size before rotation (10 MB).
const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Number of rotated log files to keep.
const MAX_ROTATED_LOGS: u32 = 3;

/// Shift `daemon.log` -> `daemon.log.1` -> ... , dropping the oldest.
/// Best-effort: rotation failures never block startup.
fn rotate_log_if_needed(log_path: &std::path::Path) {
    let size = match std::fs::metadata(log_path) {
        Ok(m) => m.len(),
        Err(_) => return,
    };
    if size < MAX_LOG_SIZE {
        return;
    }

    let log_str = log_path.display().to_string();
    for i in (1..MAX_ROTATED_LOGS).rev() {
        let from = format!("{log_str}.{i}");
        let to = format!("{log_str}.{}", i + 1);
        let _ = std::fs::rename(&from, &to);
    }
    let _ = std::fs::rename(log_path, format!("{log_str}.1"));
}

fn setup_logging(
    config: &Config,
) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file_appender = tracing_appender::rolling::never(
        config
            .log_path
            .parent()
            .ok_or(LifecycleError::NoDataDir)?,
        config
            .log_path
            .file_name()
            .ok_or(LifecycleError::NoDataDir)?,
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}
