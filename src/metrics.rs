// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Prometheus instruments for admission outcomes.

use lazy_static::lazy_static;
use prometheus::{
    register_int_counter, register_int_counter_vec, register_int_gauge, Encoder, IntCounter,
    IntCounterVec, IntGauge, TextEncoder,
};

use crate::limiter::{Decision, DenyReason};

lazy_static! {
    pub static ref REQUESTS_ALLOWED: IntCounter = register_int_counter!(
        "admission_allowed_total",
        "Requests admitted by the guard"
    )
    .unwrap();
    pub static ref REQUESTS_DENIED: IntCounterVec = register_int_counter_vec!(
        "admission_denied_total",
        "Requests refused by the guard",
        &["reason"]
    )
    .unwrap();
    pub static ref TRACKED_IDENTITIES: IntGauge = register_int_gauge!(
        "admission_tracked_identities",
        "Identity records currently held"
    )
    .unwrap();
    pub static ref SWEPT_RECORDS: IntCounter = register_int_counter!(
        "admission_swept_records_total",
        "Stale identity records evicted by the sweep"
    )
    .unwrap();
}

/// Count a decision under its outcome.
pub fn record_decision(decision: &Decision) {
    match decision {
        Decision::Allowed { .. } => REQUESTS_ALLOWED.inc(),
        Decision::Denied { reason, .. } => {
            REQUESTS_DENIED.with_label_values(&[reason_label(*reason)]).inc()
        }
    }
}

fn reason_label(reason: DenyReason) -> &'static str {
    match reason {
        DenyReason::AlreadyBlocked => "already_blocked",
        DenyReason::MinuteLimitExceeded => "minute_limit_exceeded",
        DenyReason::HourLimitExceeded => "hour_limit_exceeded",
    }
}

/// Render all registered metrics in the Prometheus text format.
pub fn render() -> String {
    let encoder = TextEncoder::new();
    let families = prometheus::gather();
    let mut buffer = Vec::new();
    if encoder.encode(&families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
