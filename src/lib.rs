// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Admission Guard
//!
//! This crate decides, per originating client identity, whether an incoming
//! request may proceed:
//!
//! - Per-minute request cap per identity (10 default)
//! - Per-hour request cap per identity (60 default)
//! - Cooldown block once either cap is crossed (10 minutes default)
//! - Client identity from proxy headers or the peer address, with a shared
//!   "unknown" bucket for unidentifiable traffic
//! - Periodic sweep of stale identity records
//!
//! Request handlers consult the guard before doing any expensive work and
//! surface its decision through `X-RateLimit-*` headers and 429 responses.

pub mod config;
pub mod handlers;
pub mod identity;
pub mod limiter;
pub mod metrics;

pub use config::Config;
pub use limiter::{Decision, DenyReason, Limiter};
