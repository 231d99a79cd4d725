//! Attack Ledger
//!
//! Per-category incident sequences, append-only between sweeps. Only the
//! periodic sweep removes entries; no detector prunes another's output.

use serde::Serialize;

use super::detect::types::{AttackCategory, Incident, IncidentKind};

/// Per-category incident counts.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct CategoryCounts {
    pub rate_flood: usize,
    pub auth_failure: usize,
    pub pattern_match: usize,
    pub classifier_verdict: usize,
}

/// Incidents per category, oldest first within each.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AttackSnapshot {
    pub rate_flood: Vec<Incident>,
    pub auth_failure: Vec<Incident>,
    pub pattern_match: Vec<Incident>,
    pub classifier_verdict: Vec<Incident>,
}

/// Ordered incident storage behind the detectors.
#[derive(Debug, Default)]
pub struct AttackLedger {
    rate_flood: Vec<Incident>,
    auth_failure: Vec<Incident>,
    pattern_match: Vec<Incident>,
    classifier_verdict: Vec<Incident>,
}

impl AttackLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, incident: Incident) {
        self.list_mut(incident.category()).push(incident);
    }

    fn list(&self, category: AttackCategory) -> &[Incident] {
        match category {
            AttackCategory::RateFlood => &self.rate_flood,
            AttackCategory::AuthFailure => &self.auth_failure,
            AttackCategory::PatternMatch => &self.pattern_match,
            AttackCategory::ClassifierVerdict => &self.classifier_verdict,
        }
    }

    fn list_mut(&mut self, category: AttackCategory) -> &mut Vec<Incident> {
        match category {
            AttackCategory::RateFlood => &mut self.rate_flood,
            AttackCategory::AuthFailure => &mut self.auth_failure,
            AttackCategory::PatternMatch => &mut self.pattern_match,
            AttackCategory::ClassifierVerdict => &mut self.classifier_verdict,
        }
    }

    /// Prior failures against the same exact URL inside the window.
    pub fn count_auth_failures_for_url(&self, url: &str, now_ms: i64, window_ms: i64) -> usize {
        self.auth_failure
            .iter()
            .filter(|i| now_ms - i.detected_at_ms < window_ms)
            .filter(|i| {
                matches!(&i.kind, IncidentKind::AuthFailure { target_url, .. } if target_url == url)
            })
            .count()
    }

    /// Current per-category totals.
    pub fn counts(&self) -> CategoryCounts {
        CategoryCounts {
            rate_flood: self.rate_flood.len(),
            auth_failure: self.auth_failure.len(),
            pattern_match: self.pattern_match.len(),
            classifier_verdict: self.classifier_verdict.len(),
        }
    }

    /// Counts restricted to incidents strictly newer than `cutoff_ms`.
    pub fn counts_since(&self, cutoff_ms: i64) -> CategoryCounts {
        let windowed = |list: &[Incident]| {
            list.iter().filter(|i| i.detected_at_ms > cutoff_ms).count()
        };
        CategoryCounts {
            rate_flood: windowed(&self.rate_flood),
            auth_failure: windowed(&self.auth_failure),
            pattern_match: windowed(&self.pattern_match),
            classifier_verdict: windowed(&self.classifier_verdict),
        }
    }

    /// Most recent n incidents per category.
    pub fn recent(&self, n: usize) -> AttackSnapshot {
        let tail = |list: &[Incident]| {
            let start = list.len().saturating_sub(n);
            list[start..].to_vec()
        };
        AttackSnapshot {
            rate_flood: tail(&self.rate_flood),
            auth_failure: tail(&self.auth_failure),
            pattern_match: tail(&self.pattern_match),
            classifier_verdict: tail(&self.classifier_verdict),
        }
    }

    /// Full copy of every category.
    pub fn export(&self) -> AttackSnapshot {
        AttackSnapshot {
            rate_flood: self.rate_flood.clone(),
            auth_failure: self.auth_failure.clone(),
            pattern_match: self.pattern_match.clone(),
            classifier_verdict: self.classifier_verdict.clone(),
        }
    }

    /// Drop incidents at or older than `cutoff_ms`. Returns how many fell out.
    pub fn prune_older_than(&mut self, cutoff_ms: i64) -> usize {
        let before = self.total();
        self.rate_flood.retain(|i| i.detected_at_ms > cutoff_ms);
        self.auth_failure.retain(|i| i.detected_at_ms > cutoff_ms);
        self.pattern_match.retain(|i| i.detected_at_ms > cutoff_ms);
        self.classifier_verdict.retain(|i| i.detected_at_ms > cutoff_ms);
        before - self.total()
    }

    pub fn total(&self) -> usize {
        self.rate_flood.len()
            + self.auth_failure.len()
            + self.pattern_match.len()
            + self.classifier_verdict.len()
    }

    pub fn clear(&mut self) {
        self.rate_flood.clear();
        self.auth_failure.clear();
        self.pattern_match.clear();
        self.classifier_verdict.clear();
    }

    /// Most recent incident of a category, if any.
    pub fn latest(&self, category: AttackCategory) -> Option<&Incident> {
        self.list(category).last()
    }
}

// ============================================================================
// TESTS
// ============================================================================
