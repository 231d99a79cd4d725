use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ordered severity scale shared by every detector. Each detector maps its
/// trigger condition to a fixed severity; nothing retrofits it later.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Numeric rank for escalation comparisons.
    pub fn level(&self) -> u8 {
        match self {
            Severity::Low => 1,
            Severity::Medium => 2,
            Severity::High => 3,
            Severity::Critical => 4,
        }
    }
}

/// Incident categories tracked by the ledger.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AttackCategory {
    RateFlood,
    AuthFailure,
    PatternMatch,
    ClassifierVerdict,
}

/// What a detector saw, tagged for external consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IncidentKind {
    RateFlood {
        target_domain: String,
        window_request_count: usize,
    },
    AuthFailure {
        target_url: String,
        consecutive_failure_count: usize,
        status_code: u16,
    },
    PatternMatch {
        target_url: String,
        pattern_index: usize,
        pattern: String,
    },
    ClassifierVerdict {
        target_url: String,
        confidence: f64,
        attack_probability: f64,
    },
}

impl IncidentKind {
    pub fn category(&self) -> AttackCategory {
        match self {
            IncidentKind::RateFlood { .. } => AttackCategory::RateFlood,
            IncidentKind::AuthFailure { .. } => AttackCategory::AuthFailure,
            IncidentKind::PatternMatch { .. } => AttackCategory::PatternMatch,
            IncidentKind::ClassifierVerdict { .. } => AttackCategory::ClassifierVerdict,
        }
    }
}

/// One detected incident.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Incident {
    pub id: Uuid,
    pub detected_at_ms: i64,
    pub severity: Severity,
    #[serde(flatten)]
    pub kind: IncidentKind,
}

impl Incident {
    pub fn new(detected_at_ms: i64, severity: Severity, kind: IncidentKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            detected_at_ms,
            severity,
            kind,
        }
    }

    pub fn category(&self) -> AttackCategory {
        self.kind.category()
    }
}

// ============================================================================
// TESTS
// ============================================================================
