//! Request Store - bounded traffic window
//!
//! Insertion-ordered record buffer plus a keyed detail map. Both are capped
//! at the same capacity and evict oldest-first, with independent key spaces:
//! a record falling out of the buffer does not remove its detail, and vice
//! versa.

pub mod types;


pub use types::{RequestDetail, RequestRecord};

use std::collections::{HashMap, VecDeque};

use url::Url;

use crate::logic::events::{RequestStarted, ResponseCompleted};

// ============================================================================
// STORE
// ============================================================================

/// Bounded window over observed traffic.
#[derive(Debug)]
pub struct RequestStore {
    capacity: usize,
    default_response_size: u64,
    records: VecDeque<RequestRecord>,
    details: HashMap<String, RequestDetail>,
    detail_order: VecDeque<String>,
}

impl RequestStore {
    pub fn new(capacity: usize, default_response_size: u64) -> Self {
        Self {
            capacity,
            default_response_size,
            records: VecDeque::with_capacity(capacity.min(1024)),
            details: HashMap::new(),
            detail_order: VecDeque::new(),
        }
    }

    /// Append a record and a fresh detail for a started request, evicting the
    /// oldest entries once over capacity.
    pub fn record_request_started(&mut self, event: &RequestStarted) -> RequestRecord {
        let domain = extract_domain(&event.url);

        let record = RequestRecord {
            id: event.request_id.clone(),
            url: event.url.clone(),
            method: event.method.clone(),
            http_type: event.http_type.clone(),
            domain: domain.clone(),
            observed_at_ms: event.timestamp_ms,
            origin_context: event.origin_context.clone(),
        };
        self.records.push_back(record.clone());
        while self.records.len() > self.capacity {
            self.records.pop_front();
        }

        let detail = RequestDetail {
            url: event.url.clone(),
            method: event.method.clone(),
            domain,
            observed_at_ms: event.timestamp_ms,
            start_ms: event.timestamp_ms,
            request_size_bytes: estimate_request_size(&event.url, event.raw_body.as_deref()),
            status_code: None,
            duration_ms: None,
            response_size_bytes: None,
        };
        if self.details.insert(event.request_id.clone(), detail).is_none() {
            self.detail_order.push_back(event.request_id.clone());
        }
        while self.details.len() > self.capacity {
            match self.detail_order.pop_front() {
                Some(oldest) => {
                    self.details.remove(&oldest);
                }
                None => break,
            }
        }

        record
    }

    /// Fill in the response fields for a still-resident request. Returns None
    /// when the id was already evicted; callers treat that as an expected
    /// race, not an error.
    pub fn record_response_completed(
        &mut self,
        event: &ResponseCompleted,
        now_ms: i64,
    ) -> Option<RequestDetail> {
        let default_size = self.default_response_size;
        let detail = self.details.get_mut(&event.request_id)?;

        detail.status_code = Some(event.status_code);
        detail.duration_ms = Some(now_ms - detail.start_ms);
        detail.response_size_bytes = Some(estimate_response_size(
            event.response_headers.as_ref(),
            default_size,
        ));

        Some(detail.clone())
    }

    /// Most-recent n records, most-recent last.
    pub fn snapshot_recent(&self, n: usize) -> Vec<RequestRecord> {
        let start = self.records.len().saturating_sub(n);
        self.records.iter().skip(start).cloned().collect()
    }

    /// Records for one domain no older than `window_ms` before `now_ms`.
    pub fn count_recent_for_domain(&self, domain: &str, now_ms: i64, window_ms: i64) -> usize {
        self.records
            .iter()
            .filter(|r| r.domain == domain && now_ms - r.observed_at_ms < window_ms)
            .count()
    }

    /// Records strictly newer than `cutoff_ms`, oldest first.
    pub fn records_since(&self, cutoff_ms: i64) -> impl Iterator<Item = &RequestRecord> + '_ {
        self.records.iter().filter(move |r| r.observed_at_ms > cutoff_ms)
    }

    /// Most recent n completed details by insertion order, oldest first.
    pub fn recent_completed_details(&self, n: usize) -> Vec<RequestDetail> {
        let completed: Vec<&RequestDetail> = self
            .detail_order
            .iter()
            .filter_map(|id| self.details.get(id))
            .filter(|d| d.is_completed())
            .collect();
        let start = completed.len().saturating_sub(n);
        completed[start..].iter().map(|d| (*d).clone()).collect()
    }

    /// Detail lookup by request id.
    pub fn get_detail(&self, request_id: &str) -> Option<&RequestDetail> {
        self.details.get(request_id)
    }

    /// Every resident detail, insertion order.
    pub fn export_details(&self) -> Vec<RequestDetail> {
        self.detail_order
            .iter()
            .filter_map(|id| self.details.get(id))
            .cloned()
            .collect()
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    pub fn detail_count(&self) -> usize {
        self.details.len()
    }

    /// Drop every record and detail.
    pub fn clear(&mut self) {
        self.records.clear();
        self.details.clear();
        self.detail_order.clear();
    }
}

// ============================================================================
// PURE HELPERS
// ============================================================================

/// Destination host of a URL. Malformed URLs fall back to the raw string,
/// each acting as its own singleton domain key.
pub fn extract_domain(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => parsed
            .host_str()
            .map(|h| h.to_string())
            .unwrap_or_else(|| url.to_string()),
        Err(_) => url.to_string(),
    }
}

/// URL length plus body length; header overhead is ignored.
pub fn estimate_request_size(url: &str, body: Option<&str>) -> u64 {
    url.len() as u64 + body.map(|b| b.len() as u64).unwrap_or(0)
}

/// Content-length when a header carries one, else the configured default.
pub fn estimate_response_size(
    headers: Option<&HashMap<String, String>>,
    default_size: u64,
) -> u64 {
    headers
        .and_then(|h| {
            h.iter()
                .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                .and_then(|(_, value)| value.trim().parse().ok())
        })
        .unwrap_or(default_size)
}
