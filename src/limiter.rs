// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Dual-window admission limiter with cooldown blocks.
//!
//! Tracks request volume per client identity over two independent trailing
//! windows (per-minute and per-hour). Crossing either threshold puts the
//! identity into a cooldown block during which every request is refused.
//!
//! Each window is an ascending vector of epoch-millisecond timestamps,
//! pruned lazily on the identity's own checks. A periodic [`Limiter::sweep`]
//! evicts records with no remaining relevance to bound memory.

use dashmap::DashMap;
use tracing::{debug, warn};

use crate::config::LimiterConfig;

/// Current epoch milliseconds.
fn now_millis() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}

/// Why a request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DenyReason {
    /// Identity is inside an active cooldown block
    AlreadyBlocked,
    /// Per-minute window threshold crossed
    MinuteLimitExceeded,
    /// Per-hour window threshold crossed
    HourLimitExceeded,
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyBlocked => write!(f, "Temporarily blocked due to rate limit violation"),
            Self::MinuteLimitExceeded => write!(f, "Per-minute request limit exceeded"),
            Self::HourLimitExceeded => write!(f, "Hourly request limit exceeded"),
        }
    }
}

/// Result of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Request may proceed
    Allowed {
        /// Requests left before the tighter of the two windows fills
        remaining: u32,
        /// Epoch milliseconds when the next window slot frees up
        reset_at_ms: u64,
    },
    /// Request is refused
    Denied {
        /// Reason for the refusal
        reason: DenyReason,
        /// Epoch milliseconds when the block expires
        reset_at_ms: u64,
        /// Milliseconds the caller should wait before retrying
        retry_after_ms: u64,
    },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed { .. })
    }

    /// Remaining quota; 0 when denied.
    pub fn remaining(&self) -> u32 {
        match self {
            Decision::Allowed { remaining, .. } => *remaining,
            Decision::Denied { .. } => 0,
        }
    }

    pub fn reset_at_ms(&self) -> u64 {
        match self {
            Decision::Allowed { reset_at_ms, .. } | Decision::Denied { reset_at_ms, .. } => {
                *reset_at_ms
            }
        }
    }

    /// Reset moment as epoch seconds, the form surfaced in `X-RateLimit-Reset`.
    pub fn reset_epoch_secs(&self) -> u64 {
        self.reset_at_ms() / 1000
    }

    /// Ceiling-rounded whole seconds until a retry can succeed; `None` when allowed.
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            Decision::Allowed { .. } => None,
            Decision::Denied { retry_after_ms, .. } => Some(retry_after_ms.div_ceil(1000)),
        }
    }
}

/// Per-identity tracking state.
///
/// Created lazily on an identity's first check, mutated only by checks on
/// that identity, and deleted only by the sweep once wholly stale.
#[derive(Debug, Default)]
struct Record {
    /// Admission timestamps inside the per-minute window, ascending
    minute_hits: Vec<u64>,
    /// Admission timestamps inside the per-hour window, ascending
    hour_hits: Vec<u64>,
    /// Cooldown expiry; the identity is blocked while this lies in the future
    blocked_until: Option<u64>,
}

impl Record {
    /// Epoch millis of the newest marker that still makes this record matter.
    ///
    /// Admissions append to both windows, so the hour vector's tail is the
    /// latest hit; an unexpired block outlasts any hit.
    fn latest_relevance(&self) -> u64 {
        self.hour_hits
            .last()
            .copied()
            .unwrap_or(0)
            .max(self.blocked_until.unwrap_or(0))
    }
}

/// Admission guard engine.
///
/// Owns the identity → record store. Shareable across tasks; checks on
/// distinct identities proceed in parallel, and the sweep walks the store
/// shard by shard without stalling unrelated admissions.
pub struct Limiter {
    config: LimiterConfig,
    records: DashMap<String, Record>,
}

impl Limiter {
    pub fn new(config: LimiterConfig) -> Self {
        Self {
            config,
            records: DashMap::new(),
        }
    }

    /// Decide whether a request from `identity` may proceed, and record it if so.
    pub fn check(&self, identity: &str) -> Decision {
        self.check_at(identity, now_millis())
    }

    /// Admission decision at an explicit clock reading.
    ///
    /// The record's shard guard is held for the whole read-prune-decide-append
    /// step, so two checks on the same identity cannot interleave.
    pub fn check_at(&self, identity: &str, now: u64) -> Decision {
        let mut entry = self.records.entry(identity.to_string()).or_default();
        let record = entry.value_mut();

        // An active block wins over everything; hit windows stay untouched.
        if let Some(until) = record.blocked_until {
            if now < until {
                debug!(identity, blocked_until_ms = until, "check refused, block active");
                return Decision::Denied {
                    reason: DenyReason::AlreadyBlocked,
                    reset_at_ms: until,
                    retry_after_ms: until - now,
                };
            }
            record.blocked_until = None;
        }

        let minute_window = self.config.minute_window_secs.saturating_mul(1000);
        let hour_window = self.config.hour_window_secs.saturating_mul(1000);

        // Lazy prune: entries older than the window fall out on the next check.
        record.minute_hits.retain(|&ts| ts + minute_window > now);
        record.hour_hits.retain(|&ts| ts + hour_window > now);

        if record.minute_hits.len() >= self.config.max_per_minute as usize {
            return Self::impose_block(
                record,
                identity,
                now,
                self.config.block_duration_ms,
                DenyReason::MinuteLimitExceeded,
            );
        }
        if record.hour_hits.len() >= self.config.max_per_hour as usize {
            return Self::impose_block(
                record,
                identity,
                now,
                self.config.block_duration_ms,
                DenyReason::HourLimitExceeded,
            );
        }

        record.minute_hits.push(now);
        record.hour_hits.push(now);

        let remaining_minute = self.config.max_per_minute - record.minute_hits.len() as u32;
        let remaining_hour = self.config.max_per_hour - record.hour_hits.len() as u32;

        // Both vectors are non-empty after the append; the oldest surviving
        // entry decides when each window frees a slot.
        let minute_reset = record.minute_hits[0] + minute_window;
        let hour_reset = record.hour_hits[0] + hour_window;

        Decision::Allowed {
            remaining: remaining_minute.min(remaining_hour),
            reset_at_ms: minute_reset.min(hour_reset),
        }
    }

    /// Start a cooldown block. The violating request is not recorded as a hit.
    fn impose_block(
        record: &mut Record,
        identity: &str,
        now: u64,
        block_ms: u64,
        reason: DenyReason,
    ) -> Decision {
        let until = now + block_ms;
        record.blocked_until = Some(until);
        warn!(
            identity,
            reason = %reason,
            blocked_until_ms = until,
            "threshold crossed, blocking client"
        );
        Decision::Denied {
            reason,
            reset_at_ms: until,
            retry_after_ms: block_ms,
        }
    }

    /// Evict stale records. Returns the number removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(now_millis())
    }

    /// Sweep at an explicit clock reading.
    ///
    /// A record is stale once its newest hit and its block expiry both lie
    /// further back than the stale horizon; an identity evicted here simply
    /// starts fresh on its next request. Proceeds shard by shard, so
    /// admissions for other identities keep flowing while it runs.
    pub fn sweep_at(&self, now: u64) -> usize {
        let stale_after = self.config.stale_after_secs.saturating_mul(1000);
        let before = self.records.len();
        self.records
            .retain(|_, record| now.saturating_sub(record.latest_relevance()) <= stale_after);
        let evicted = before.saturating_sub(self.records.len());
        if evicted > 0 {
            debug!(
                evicted,
                tracked = self.records.len(),
                "swept stale identity records"
            );
        }
        evicted
    }

    /// Number of identity records currently held.
    pub fn tracked_identities(&self) -> usize {
        self.records.len()
    }
}
