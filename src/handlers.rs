// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP boundary for the admission guard.
//!
//! Two modes of consumption:
//!
//! 1. **In-path guard**: the [`admission`] middleware wraps guarded routes,
//!    consulting the limiter before any downstream work runs and stamping the
//!    decision onto the response as `X-RateLimit-*` headers.
//! 2. **External auth**: a fronting proxy calls `POST /check` with a client
//!    identity and forwards or refuses the request itself based on the JSON
//!    decision.

use crate::config::Config;
use crate::identity::{self, UNKNOWN_IDENTITY};
use crate::limiter::{Decision, Limiter};
use crate::metrics;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, info};

const LIMIT_MINUTE: HeaderName = HeaderName::from_static("x-ratelimit-limit-minute");
const LIMIT_HOUR: HeaderName = HeaderName::from_static("x-ratelimit-limit-hour");
const REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
const RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Shared application state.
pub struct AppState {
    pub limiter: Limiter,
    pub config: Config,
}

/// 429 response body.
#[derive(Debug, Serialize)]
pub struct RateLimitErrorBody {
    pub error: &'static str,
    pub message: String,
    #[serde(rename = "retryAfter")]
    pub retry_after: u64,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Admission check request (external auth mode).
#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    pub identity: String,
}

/// Admission check response.
#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub remaining: u32,
    /// Epoch seconds at which the window or block resets
    #[serde(rename = "resetAt")]
    pub reset_at: u64,
    #[serde(skip_serializing_if = "Option::is_none", rename = "retryAfter")]
    pub retry_after: Option<u64>,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "admission-guard",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Prometheus metrics endpoint.
pub async fn metrics_endpoint() -> Response {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::render(),
    )
        .into_response()
}

/// Admission check for an externally supplied identity.
///
/// An empty identity means the caller could not determine one; such traffic
/// pools into the shared "unknown" bucket rather than bypassing the guard.
pub async fn check(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CheckRequest>,
) -> Json<CheckResponse> {
    let identity = match req.identity.trim() {
        "" => UNKNOWN_IDENTITY,
        id => id,
    };

    let decision = state.limiter.check(identity);
    metrics::record_decision(&decision);

    match decision {
        Decision::Allowed {
            remaining,
            reset_at_ms,
        } => {
            debug!(identity, remaining, "request admitted");
            Json(CheckResponse {
                allowed: true,
                reason: None,
                remaining,
                reset_at: reset_at_ms / 1000,
                retry_after: None,
            })
        }
        Decision::Denied { reason, .. } => {
            info!(
                identity,
                reason = %reason,
                blocked_until = %format_epoch_ms(decision.reset_at_ms()),
                "request refused"
            );
            Json(CheckResponse {
                allowed: false,
                reason: Some(reason.to_string()),
                remaining: 0,
                reset_at: decision.reset_epoch_secs(),
                retry_after: decision.retry_after_secs(),
            })
        }
    }
}

/// In-path admission middleware.
///
/// Runs before the guarded handler; refused requests never reach it. Both
/// outcomes carry the rate-limit headers so well-behaved clients can pace
/// themselves without ever hitting a 429.
pub async fn admission(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0);
    let identity =
        identity::client_identity(request.headers(), peer, state.config.trust_proxy);

    let decision = state.limiter.check(&identity);
    metrics::record_decision(&decision);

    match decision {
        Decision::Allowed { remaining, .. } => {
            debug!(identity = %identity, remaining, "request admitted");
            let mut response = next.run(request).await;
            apply_rate_headers(response.headers_mut(), &state, &decision);
            response
        }
        Decision::Denied { reason, .. } => {
            let retry_after = decision.retry_after_secs().unwrap_or(0);
            info!(
                identity = %identity,
                reason = %reason,
                blocked_until = %format_epoch_ms(decision.reset_at_ms()),
                "request refused"
            );
            let mut response = (
                StatusCode::TOO_MANY_REQUESTS,
                [(header::RETRY_AFTER, retry_after.to_string())],
                Json(RateLimitErrorBody {
                    error: "Too Many Requests",
                    message: reason.to_string(),
                    retry_after,
                }),
            )
                .into_response();
            apply_rate_headers(response.headers_mut(), &state, &decision);
            response
        }
    }
}

/// Guarded demo endpoint. Anything expensive sits behind the guard the same
/// way; the downstream work itself is not this service's concern.
pub async fn ask() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "accepted" }))
}

fn apply_rate_headers(headers: &mut HeaderMap, state: &AppState, decision: &Decision) {
    let limits = &state.config.limiter;
    headers.insert(LIMIT_MINUTE, HeaderValue::from(limits.max_per_minute));
    headers.insert(LIMIT_HOUR, HeaderValue::from(limits.max_per_hour));
    headers.insert(REMAINING, HeaderValue::from(decision.remaining()));
    headers.insert(RESET, HeaderValue::from(decision.reset_epoch_secs()));
}

/// Wall-clock rendering of an epoch-millisecond instant, for log fields.
fn format_epoch_ms(ms: u64) -> String {
    chrono::DateTime::from_timestamp_millis(ms as i64)
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| ms.to_string())
}
