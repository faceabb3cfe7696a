// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Atrium Works

use std::{env, net::SocketAddr, sync::Arc};

use tracing_subscriber::EnvFilter;

use atrium_server::api::router;
use atrium_server::config::AppConfig;
use atrium_server::directory::InMemoryDirectory;
use atrium_server::state::AppState;

#[tokio::main]
async fn main() {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("configuration error: {err}");
            std::process::exit(1);
        }
    };

    init_tracing(&config.log_format);

    let directory = Arc::new(InMemoryDirectory::new());
    seed_directory(&directory);

    if config.auth.enabled && !config.auth.strict {
        tracing::warn!("auth is running in permissive mode; failures pass through");
    }

    let state = AppState::new(config.auth.clone(), directory);
    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("Failed to parse bind address");

    tracing::info!(%addr, "atrium server listening (docs at /docs)");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server failed");
}

fn init_tracing(log_format: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));

    if log_format == "json" {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Seed the in-memory directory from the environment so a fresh instance is
/// exercisable: `SEED_EMPLOYEE_IDS="100:Alice,101:Bob"`,
/// `SEED_GROUP_CHAT_IDS="-500:Ops"`. The name part is optional.
fn seed_directory(directory: &InMemoryDirectory) {
    if let Ok(raw) = env::var("SEED_EMPLOYEE_IDS") {
        for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (id, name) = match entry.split_once(':') {
                Some((id, name)) => (id, name.to_string()),
                None => (entry, format!("Employee {entry}")),
            };
            directory.insert_employee(id, name);
        }
    }

    if let Ok(raw) = env::var("SEED_GROUP_CHAT_IDS") {
        for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (chat_id, title) = match entry.split_once(':') {
                Some((chat_id, title)) => (chat_id, title.to_string()),
                None => (entry, format!("Group {entry}")),
            };
            directory.insert_group(chat_id, title);
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
