//! Ingestion Events
//!
//! Typed request lifecycle events fed by the host adapter. Feeds that carry
//! all kinds over one wire use the tagged [`IngestEvent`] envelope.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A request left the host toward some destination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestStarted {
    pub request_id: String,
    pub url: String,
    pub method: String,
    /// Resource kind as reported by the host (document, script, xhr, ...)
    pub http_type: String,
    pub timestamp_ms: i64,
    /// Originating page or tab, when the host knows it
    #[serde(default)]
    pub origin_context: Option<String>,
    /// Raw request body, consulted only for size estimation
    #[serde(default)]
    pub raw_body: Option<String>,
}

/// A response arrived for an in-flight request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseCompleted {
    pub request_id: String,
    pub status_code: u16,
    /// Response headers, consulted for content-length
    #[serde(default)]
    pub response_headers: Option<HashMap<String, String>>,
}

/// A request failed without producing a response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestErrored {
    pub request_id: String,
    pub error_text: String,
}

/// Tagged envelope over the three lifecycle kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum IngestEvent {
    RequestStarted(RequestStarted),
    ResponseCompleted(ResponseCompleted),
    RequestErrored(RequestErrored),
}

// ============================================================================
// TESTS
// ============================================================================
