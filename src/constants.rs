//! Central Configuration Constants
//!
//! Single source of truth for all detection defaults.
//! To change a default threshold or the classifier endpoint, only edit this file.

/// Default classifier API base URL
///
/// This is the fallback URL when no environment variable is set.
/// The engine appends `/analyze-traffic` and `/health` to it.
pub const DEFAULT_CLASSIFIER_URL: &str = "http://localhost:5000/api";

/// Default rate-flood threshold (requests to one domain inside the window)
pub const DEFAULT_RATE_FLOOD_THRESHOLD: usize = 100;

/// Default rate-flood window (milliseconds)
pub const DEFAULT_RATE_FLOOD_WINDOW_MS: i64 = 1_000;

/// Default auth-failure alert threshold (prior failures against one URL)
pub const DEFAULT_AUTH_FAILURE_THRESHOLD: usize = 10;

/// Default auth-failure window (milliseconds)
pub const DEFAULT_AUTH_FAILURE_WINDOW_MS: i64 = 60_000;

/// Default batch size for classifier dispatch
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Request store capacity (records and details evict FIFO beyond this)
pub const DEFAULT_STORE_CAPACITY: usize = 1000;

/// Response size assumed when no content-length header is present (bytes).
/// A provisional stand-in, not a measurement; tune per deployment.
pub const DEFAULT_RESPONSE_SIZE_BYTES: u64 = 1000;

/// Ledger retention horizon (milliseconds)
pub const DEFAULT_RETENTION_MS: i64 = 5 * 60 * 1000;

/// Aggregation sweep interval (seconds)
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

/// Classifier health probe interval (seconds)
pub const DEFAULT_HEALTH_PROBE_INTERVAL_SECS: u64 = 60;

/// HTTP timeout for classifier calls (seconds)
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name
pub const APP_NAME: &str = "Net-Sentry";

// ============================================
// Helper functions to read from env with fallback
// ============================================

/// Get classifier base URL from environment or use default
pub fn get_classifier_url() -> String {
    std::env::var("SENTRY_CLASSIFIER_URL").unwrap_or_else(|_| DEFAULT_CLASSIFIER_URL.to_string())
}

/// Get rate-flood threshold from environment or use default
pub fn get_rate_flood_threshold() -> usize {
    std::env::var("SENTRY_RATE_FLOOD_THRESHOLD")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_RATE_FLOOD_THRESHOLD)
}

/// Get auth-failure threshold from environment or use default
pub fn get_auth_failure_threshold() -> usize {
    std::env::var("SENTRY_AUTH_FAILURE_THRESHOLD")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_AUTH_FAILURE_THRESHOLD)
}

/// Get classifier batch size from environment or use default
pub fn get_batch_size() -> usize {
    std::env::var("SENTRY_BATCH_SIZE")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_BATCH_SIZE)
}

/// Get sweep interval from environment or use default
pub fn get_sweep_interval() -> u64 {
    std::env::var("SENTRY_SWEEP_INTERVAL")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_SWEEP_INTERVAL_SECS)
}

/// Check if classifier dispatch is enabled
pub fn is_classifier_enabled() -> bool {
    std::env::var("SENTRY_CLASSIFIER_ENABLED")
        .map(|s| s.to_lowercase() != "false" && s != "0")
        .unwrap_or(true)
}
