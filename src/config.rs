// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the admission guard.
//!
//! Every knob has a stated default; deployments override the common ones via
//! environment variables. Absent variables fall back to defaults, malformed
//! values are reported as errors rather than silently ignored.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

/// Top-level service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Trust `X-Forwarded-For` / `X-Real-IP` from a fronting proxy
    /// (default: false)
    #[serde(default)]
    pub trust_proxy: bool,

    /// Admission limiter configuration
    #[serde(default)]
    pub limiter: LimiterConfig,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Limiter thresholds and timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimiterConfig {
    /// Maximum admitted requests per identity in the minute window (default: 10)
    #[serde(default = "default_max_per_minute")]
    pub max_per_minute: u32,

    /// Maximum admitted requests per identity in the hour window (default: 60)
    #[serde(default = "default_max_per_hour")]
    pub max_per_hour: u32,

    /// Minute window span in seconds (default: 60)
    #[serde(default = "default_minute_window_secs")]
    pub minute_window_secs: u64,

    /// Hour window span in seconds (default: 3600)
    #[serde(default = "default_hour_window_secs")]
    pub hour_window_secs: u64,

    /// Cooldown block length in milliseconds once a threshold is crossed
    /// (default: 600000, ten minutes)
    #[serde(default = "default_block_duration_ms")]
    pub block_duration_ms: u64,

    /// Period of the stale-record sweep in seconds (default: 60)
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Age past which an idle record is evicted, in seconds (default: 3600).
    /// Keep this at or above the hour window and the block duration so no
    /// live window or block is evicted early.
    #[serde(default = "default_stale_after_secs")]
    pub stale_after_secs: u64,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Expose the Prometheus endpoint (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics endpoint path (default: /metrics)
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

// Default value functions
fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_max_per_minute() -> u32 {
    10
}

fn default_max_per_hour() -> u32 {
    60
}

fn default_minute_window_secs() -> u64 {
    60
}

fn default_hour_window_secs() -> u64 {
    3600
}

fn default_block_duration_ms() -> u64 {
    600_000
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_stale_after_secs() -> u64 {
    3600
}

fn default_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            trust_proxy: false,
            limiter: LimiterConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            max_per_minute: default_max_per_minute(),
            max_per_hour: default_max_per_hour(),
            minute_window_secs: default_minute_window_secs(),
            hour_window_secs: default_hour_window_secs(),
            block_duration_ms: default_block_duration_ms(),
            sweep_interval_secs: default_sweep_interval_secs(),
            stale_after_secs: default_stale_after_secs(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            path: default_metrics_path(),
        }
    }
}

impl LimiterConfig {
    pub fn block_duration(&self) -> Duration {
        Duration::from_millis(self.block_duration_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Ok(addr) = std::env::var("BIND_ADDR") {
            config.bind_addr = addr;
        }
        config.trust_proxy = parse_env("TRUST_PROXY", config.trust_proxy)?;
        config.limiter.max_per_minute =
            parse_env("MAX_PER_MINUTE", config.limiter.max_per_minute)?;
        config.limiter.max_per_hour = parse_env("MAX_PER_HOUR", config.limiter.max_per_hour)?;
        config.limiter.block_duration_ms =
            parse_env("BLOCK_DURATION_MS", config.limiter.block_duration_ms)?;

        Ok(config)
    }
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
        Err(_) => Ok(default),
    }
}
