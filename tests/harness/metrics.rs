// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Metrics collection for traffic simulation results.

use std::collections::HashMap;

/// Possible outcomes for a simulated request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Allowed,
    MinuteLimited,
    HourLimited,
    Blocked,
}

/// Collects per-request outcomes during a simulation run.
#[derive(Debug, Default)]
pub struct TrafficMetrics {
    /// Count of requests by outcome
    outcomes: HashMap<Outcome, usize>,
    /// Count of requests by identity
    requests_per_identity: HashMap<String, usize>,
    /// Count of refusals by identity
    denials_per_identity: HashMap<String, usize>,
    /// Simulated clock bounds (epoch ms)
    first_at_ms: Option<u64>,
    last_at_ms: Option<u64>,
}

impl TrafficMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a request outcome at a simulated instant.
    pub fn record(&mut self, outcome: Outcome, identity: &str, at_ms: u64) {
        *self.outcomes.entry(outcome).or_insert(0) += 1;
        *self
            .requests_per_identity
            .entry(identity.to_string())
            .or_insert(0) += 1;
        if outcome != Outcome::Allowed {
            *self
                .denials_per_identity
                .entry(identity.to_string())
                .or_insert(0) += 1;
        }
        if self.first_at_ms.is_none() {
            self.first_at_ms = Some(at_ms);
        }
        self.last_at_ms = Some(at_ms);
    }

    pub fn total_requests(&self) -> usize {
        self.outcomes.values().sum()
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        self.outcomes.get(&outcome).copied().unwrap_or(0)
    }

    pub fn total_denied(&self) -> usize {
        self.total_requests() - self.count(Outcome::Allowed)
    }

    /// Ratio of refused to total.
    pub fn block_rate(&self) -> f64 {
        let total = self.total_requests();
        if total == 0 {
            return 0.0;
        }
        self.total_denied() as f64 / total as f64
    }

    pub fn unique_identities(&self) -> usize {
        self.requests_per_identity.len()
    }

    pub fn requests_for(&self, identity: &str) -> usize {
        self.requests_per_identity
            .get(identity)
            .copied()
            .unwrap_or(0)
    }

    pub fn denials_for(&self, identity: &str) -> usize {
        self.denials_per_identity
            .get(identity)
            .copied()
            .unwrap_or(0)
    }

    /// Span of the simulated clock across the run.
    pub fn simulated_duration_ms(&self) -> u64 {
        match (self.first_at_ms, self.last_at_ms) {
            (Some(first), Some(last)) => last.saturating_sub(first),
            _ => 0,
        }
    }

    /// Generate a summary report.
    pub fn report(&self) -> TrafficReport {
        TrafficReport {
            total_requests: self.total_requests(),
            allowed: self.count(Outcome::Allowed),
            minute_limited: self.count(Outcome::MinuteLimited),
            hour_limited: self.count(Outcome::HourLimited),
            blocked: self.count(Outcome::Blocked),
            block_rate: self.block_rate(),
            simulated_duration_ms: self.simulated_duration_ms(),
            unique_identities: self.unique_identities(),
        }
    }
}

/// Summary report of a simulation run.
#[derive(Debug, Clone)]
pub struct TrafficReport {
    pub total_requests: usize,
    pub allowed: usize,
    pub minute_limited: usize,
    pub hour_limited: usize,
    pub blocked: usize,
    pub block_rate: f64,
    pub simulated_duration_ms: u64,
    pub unique_identities: usize,
}

impl std::fmt::Display for TrafficReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Traffic Simulation Report ===")?;
        writeln!(f, "Simulated span:     {} ms", self.simulated_duration_ms)?;
        writeln!(f, "Total Requests:     {}", self.total_requests)?;
        writeln!(f)?;
        writeln!(f, "--- Outcomes ---")?;
        writeln!(
            f,
            "Allowed:            {} ({:.1}%)",
            self.allowed,
            self.allowed as f64 / self.total_requests as f64 * 100.0
        )?;
        writeln!(f, "Minute Limited:     {}", self.minute_limited)?;
        writeln!(f, "Hour Limited:       {}", self.hour_limited)?;
        writeln!(f, "Blocked:            {}", self.blocked)?;
        writeln!(f, "Block Rate:         {:.1}%", self.block_rate * 100.0)?;
        writeln!(f)?;
        writeln!(f, "--- Distribution ---")?;
        writeln!(f, "Unique Identities:  {}", self.unique_identities)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_collection() {
        let mut metrics = TrafficMetrics::new();

        metrics.record(Outcome::Allowed, "10.0.0.1", 1_000);
        metrics.record(Outcome::Allowed, "10.0.0.2", 2_000);
        metrics.record(Outcome::MinuteLimited, "10.0.0.1", 3_000);
        metrics.record(Outcome::Blocked, "10.0.0.1", 4_000);

        assert_eq!(metrics.total_requests(), 4);
        assert_eq!(metrics.count(Outcome::Allowed), 2);
        assert_eq!(metrics.total_denied(), 2);
        assert_eq!(metrics.unique_identities(), 2);
        assert_eq!(metrics.requests_for("10.0.0.1"), 3);
        assert_eq!(metrics.denials_for("10.0.0.1"), 2);
        assert_eq!(metrics.denials_for("10.0.0.2"), 0);
        assert_eq!(metrics.simulated_duration_ms(), 3_000);
    }

    #[test]
    fn test_block_rate() {
        let mut metrics = TrafficMetrics::new();
        for i in 0..3 {
            metrics.record(Outcome::Allowed, "10.0.0.1", i);
        }
        for i in 3..10 {
            metrics.record(Outcome::Blocked, "10.0.0.1", i);
        }

        assert!((metrics.block_rate() - 0.7).abs() < 0.01);
    }
}
