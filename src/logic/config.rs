//! Detection Configuration
//!
//! Immutable parameters supplied at engine construction. Defaults live in
//! `constants.rs`; `from_env()` picks up the `SENTRY_*` overrides.

use serde::{Deserialize, Serialize};

use crate::constants;

/// Tunables for the detection core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Requests to one domain inside the window before a flood incident fires
    pub rate_flood_threshold: usize,
    /// Rate-flood window (ms)
    pub rate_flood_window_ms: i64,
    /// Prior failures against one URL before an alert fires
    pub auth_failure_threshold: usize,
    /// Auth-failure window (ms)
    pub auth_failure_window_ms: i64,
    /// Ordered sensitive-path fragments, matched against the lower-cased URL
    pub suspicious_patterns: Vec<String>,
    /// Completed details per classifier batch
    pub batch_size: usize,
    /// Classifier dispatch enabled at construction
    pub classifier_enabled: bool,
    /// Capacity of the record buffer and the detail map
    pub store_capacity: usize,
    /// Response size assumed when no content-length header is present.
    /// Provisional stand-in, not a measurement.
    pub default_response_size_bytes: u64,
    /// Ledger retention horizon (ms)
    pub retention_ms: i64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            rate_flood_threshold: constants::DEFAULT_RATE_FLOOD_THRESHOLD,
            rate_flood_window_ms: constants::DEFAULT_RATE_FLOOD_WINDOW_MS,
            auth_failure_threshold: constants::DEFAULT_AUTH_FAILURE_THRESHOLD,
            auth_failure_window_ms: constants::DEFAULT_AUTH_FAILURE_WINDOW_MS,
            suspicious_patterns: default_patterns(),
            batch_size: constants::DEFAULT_BATCH_SIZE,
            classifier_enabled: true,
            store_capacity: constants::DEFAULT_STORE_CAPACITY,
            default_response_size_bytes: constants::DEFAULT_RESPONSE_SIZE_BYTES,
            retention_ms: constants::DEFAULT_RETENTION_MS,
        }
    }
}

impl MonitorConfig {
    /// Defaults with `SENTRY_*` environment overrides applied.
    pub fn from_env() -> Self {
        Self {
            rate_flood_threshold: constants::get_rate_flood_threshold(),
            auth_failure_threshold: constants::get_auth_failure_threshold(),
            batch_size: constants::get_batch_size(),
            classifier_enabled: constants::is_classifier_enabled(),
            ..Default::default()
        }
    }
}

/// Built-in sensitive-path fragments, highest priority first.
pub fn default_patterns() -> Vec<String> {
    [
        "admin",
        "login",
        "password",
        ".env",
        ".git",
        "wp-admin",
        "phpmyadmin",
        "api",
    ]
    .iter()
    .map(|p| p.to_string())
    .collect()
}

/// Engine-level wiring: classifier endpoint and timer periods.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Classifier API base URL; `/analyze-traffic` and `/health` are appended
    pub classifier_url: String,
    /// HTTP timeout for classifier calls (seconds)
    pub http_timeout_secs: u64,
    /// Aggregation sweep period (seconds)
    pub sweep_interval_secs: u64,
    /// Classifier health probe period (seconds)
    pub health_probe_interval_secs: u64,
    /// Detection core tunables
    pub monitor: MonitorConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            classifier_url: constants::DEFAULT_CLASSIFIER_URL.to_string(),
            http_timeout_secs: constants::DEFAULT_HTTP_TIMEOUT_SECS,
            sweep_interval_secs: constants::DEFAULT_SWEEP_INTERVAL_SECS,
            health_probe_interval_secs: constants::DEFAULT_HEALTH_PROBE_INTERVAL_SECS,
            monitor: MonitorConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Defaults with `SENTRY_*` environment overrides applied.
    pub fn from_env() -> Self {
        Self {
            classifier_url: constants::get_classifier_url(),
            sweep_interval_secs: constants::get_sweep_interval(),
            monitor: MonitorConfig::from_env(),
            ..Default::default()
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
