// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Traffic patterns for admission simulation.

use std::time::Duration;

/// Traffic pattern configuration.
#[derive(Debug, Clone)]
pub struct TrafficProfile {
    /// Total number of requests to replay
    pub total_requests: usize,
    /// Requests per second on the simulated clock
    pub requests_per_second: f64,
    /// Number of unique client identities, used round-robin
    pub unique_identities: usize,
    /// Portion of requests arriving with no determinable identity (0.0-1.0)
    pub unidentified_ratio: f64,
}

impl Default for TrafficProfile {
    fn default() -> Self {
        Self {
            total_requests: 100,
            requests_per_second: 10.0,
            unique_identities: 1,
            unidentified_ratio: 0.0,
        }
    }
}

/// Predefined traffic patterns.
impl TrafficProfile {
    /// Single identity flood - basic DoS from one client.
    pub fn single_identity_flood() -> Self {
        Self {
            total_requests: 300,
            requests_per_second: 50.0,
            unique_identities: 1,
            ..Default::default()
        }
    }

    /// Distributed flood - many clients, each under its own limits.
    pub fn distributed_flood() -> Self {
        Self {
            total_requests: 500,
            requests_per_second: 100.0,
            unique_identities: 100,
            ..Default::default()
        }
    }

    /// Slow drip - one client pacing itself under both windows.
    pub fn slow_drip() -> Self {
        Self {
            total_requests: 50,
            requests_per_second: 0.125, // one per 8s: ~7.5/min, 50 total < hour cap
            unique_identities: 1,
            ..Default::default()
        }
    }

    /// Sustained just under the minute cap until the hour cap catches it.
    pub fn sustained_under_minute_cap() -> Self {
        Self {
            total_requests: 70,
            requests_per_second: 0.125,
            unique_identities: 1,
            ..Default::default()
        }
    }

    /// Mixed traffic where half the requests carry no identity.
    pub fn unidentified_pool() -> Self {
        Self {
            total_requests: 100,
            requests_per_second: 20.0,
            unique_identities: 20,
            unidentified_ratio: 0.5,
        }
    }

    /// Expected simulated duration of the pattern.
    pub fn expected_duration(&self) -> Duration {
        Duration::from_secs_f64(self.total_requests as f64 / self.requests_per_second)
    }

    /// Simulated-clock offset of the i-th request, in milliseconds.
    pub fn offset_ms(&self, index: usize) -> u64 {
        (index as f64 * 1000.0 / self.requests_per_second) as u64
    }
}
