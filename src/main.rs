// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Admission Guard Service
//!
//! A per-client request admission guard. Every guarded request is checked
//! against two trailing windows before any downstream work happens:
//!
//! - 10 requests/minute per client identity (default)
//! - 60 requests/hour per client identity (default)
//! - 10-minute cooldown block once either threshold is crossed
//! - Periodic sweep of stale identity records
//!
//! ## Usage
//!
//! The service provides two modes of operation:
//!
//! 1. **In-path guard**: guarded routes sit behind the admission middleware,
//!    which refuses over-limit requests with a 429 before they reach the
//!    handler.
//!
//! 2. **External auth service**: a fronting proxy calls `/check` with a
//!    client identity and enforces the returned decision itself.
//!
//! ## Configuration
//!
//! Configuration is loaded from environment variables:
//!
//! - `BIND_ADDR`: Server bind address (default: 0.0.0.0:8080)
//! - `MAX_PER_MINUTE`: Max requests per minute per client (default: 10)
//! - `MAX_PER_HOUR`: Max requests per hour per client (default: 60)
//! - `BLOCK_DURATION_MS`: Cooldown block length in milliseconds (default: 600000)
//! - `TRUST_PROXY`: Trust X-Forwarded-For / X-Real-IP (default: false)

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use admission_guard::{
    config::Config,
    handlers::{admission, ask, check, health, metrics_endpoint, AppState},
    limiter::Limiter,
    metrics,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!(
        bind_addr = %config.bind_addr,
        max_per_minute = config.limiter.max_per_minute,
        max_per_hour = config.limiter.max_per_hour,
        block_duration_ms = config.limiter.block_duration_ms,
        trust_proxy = config.trust_proxy,
        "Starting admission guard"
    );

    // Create application state
    let state = Arc::new(AppState {
        limiter: Limiter::new(config.limiter.clone()),
        config: config.clone(),
    });

    // Spawn the sweep task; it runs on its fixed period regardless of
    // traffic and is dropped with the process on shutdown.
    let sweep_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep_state.config.limiter.sweep_interval());
        loop {
            interval.tick().await;
            let evicted = sweep_state.limiter.sweep();
            metrics::SWEPT_RECORDS.inc_by(evicted as u64);
            metrics::TRACKED_IDENTITIES.set(sweep_state.limiter.tracked_identities() as i64);
        }
    });

    // Guarded routes go behind the admission middleware; health and metrics
    // stay outside it.
    let guarded = Router::new()
        .route("/ask", post(ask))
        .route_layer(middleware::from_fn_with_state(state.clone(), admission));

    let mut app = Router::new()
        .route("/check", post(check))
        .route("/health", get(health))
        .route("/healthz", get(health))
        .merge(guarded);

    if config.metrics.enabled {
        app = app.route(&config.metrics.path, get(metrics_endpoint));
    }

    let app = app
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    // Start server
    let addr: SocketAddr = config.bind_addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Admission guard stopped");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
