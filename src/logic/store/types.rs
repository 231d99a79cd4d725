use serde::{Deserialize, Serialize};

/// Lightweight per-request record. Immutable after creation; lives only while
/// inside the store's capacity window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestRecord {
    pub id: String,
    pub url: String,
    pub method: String,
    pub http_type: String,
    /// Destination host, extracted once so window scans stay cheap
    pub domain: String,
    pub observed_at_ms: i64,
    pub origin_context: Option<String>,
}

/// Enriched per-request detail, keyed by request id. Filled in exactly once
/// by the response-completed handler; eligible for classifier dispatch after.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestDetail {
    pub url: String,
    pub method: String,
    pub domain: String,
    pub observed_at_ms: i64,
    pub start_ms: i64,
    pub request_size_bytes: u64,
    pub status_code: Option<u16>,
    pub duration_ms: Option<i64>,
    pub response_size_bytes: Option<u64>,
}

impl RequestDetail {
    /// A detail is completed once its status code is known.
    pub fn is_completed(&self) -> bool {
        self.status_code.is_some()
    }
}
