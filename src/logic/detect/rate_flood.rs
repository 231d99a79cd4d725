//! Rate-Flood Detector
//!
//! Flags bursts of requests against one destination inside a sliding window.
//! Runs on the ingestion path, so the scan is bounded by the store capacity.

use super::types::{Incident, IncidentKind, Severity};
use crate::logic::store::{RequestRecord, RequestStore};

/// Count requests to the new record's domain inside the window, the new one
/// included. Strictly more than `threshold` appends a high-severity incident;
/// every further over-threshold request appends another.
pub fn check(
    store: &RequestStore,
    record: &RequestRecord,
    now_ms: i64,
    threshold: usize,
    window_ms: i64,
) -> Option<Incident> {
    let count = store.count_recent_for_domain(&record.domain, now_ms, window_ms);
    if count <= threshold {
        return None;
    }

    log::warn!(
        "Rate flood on {}: {} requests in {}ms",
        record.domain,
        count,
        window_ms
    );

    Some(Incident::new(
        now_ms,
        Severity::High,
        IncidentKind::RateFlood {
            target_domain: record.domain.clone(),
            window_request_count: count,
        },
    ))
}

// ============================================================================
// TESTS
// ============================================================================
