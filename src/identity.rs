// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Client identity extraction.
//!
//! The guard tracks request volume per client identity, normally the client
//! network address. Extraction never fails: requests whose origin cannot be
//! determined all share the [`UNKNOWN_IDENTITY`] bucket. Pooling
//! unidentifiable traffic that way is deliberately coarse — one abusive
//! client behind the sentinel throttles the rest of it — but it keeps such
//! traffic subject to the guard instead of exempt from it.

use axum::http::HeaderMap;
use std::net::SocketAddr;

/// Identity used when no client address can be determined.
pub const UNKNOWN_IDENTITY: &str = "unknown";

/// Derive the tracking identity for a request.
///
/// Proxy headers are consulted only when `trust_proxy` is set: trusting
/// `X-Forwarded-For` without a proxy actually in front lets clients spoof
/// their identity and dodge per-client limits. `X-Forwarded-For` may carry a
/// chain ("client, proxy1, proxy2"); the leftmost entry is the original
/// client when the proxy is trusted to set it.
pub fn client_identity(headers: &HeaderMap, peer: Option<SocketAddr>, trust_proxy: bool) -> String {
    if trust_proxy {
        if let Some(forwarded) = header_str(headers, "x-forwarded-for") {
            let first = forwarded.split(',').next().unwrap_or(forwarded).trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
        if let Some(real_ip) = header_str(headers, "x-real-ip") {
            let real_ip = real_ip.trim();
            if !real_ip.is_empty() {
                return real_ip.to_string();
            }
        }
    }

    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_IDENTITY.to_string())
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}
