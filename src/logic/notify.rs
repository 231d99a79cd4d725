//! Notification Side-Channel
//!
//! Alert payloads the engine publishes for a host surface. Sinks decide
//! presentation; the engine never blocks on them.

use serde::Serialize;
use tokio::sync::mpsc;

use super::detect::types::{AttackCategory, Incident, IncidentKind, Severity};

/// One alert for a host surface.
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub category: AttackCategory,
    pub title: String,
    pub body: String,
    pub severity: Severity,
}

impl Notification {
    /// Alert for a single detector incident.
    pub fn for_incident(incident: &Incident) -> Self {
        match &incident.kind {
            IncidentKind::RateFlood {
                target_domain,
                window_request_count,
            } => Self {
                category: AttackCategory::RateFlood,
                title: "Rate flood detected".to_string(),
                body: format!(
                    "{} requests to {} inside the window",
                    window_request_count, target_domain
                ),
                severity: incident.severity,
            },
            IncidentKind::AuthFailure {
                target_url,
                consecutive_failure_count,
                ..
            } => Self {
                category: AttackCategory::AuthFailure,
                title: "Repeated auth failures".to_string(),
                body: format!(
                    "{} failed attempts against {}",
                    consecutive_failure_count, target_url
                ),
                severity: incident.severity,
            },
            IncidentKind::PatternMatch {
                target_url, pattern, ..
            } => Self {
                category: AttackCategory::PatternMatch,
                title: "Suspicious URL pattern".to_string(),
                body: format!("'{}' matched {}", pattern, target_url),
                severity: incident.severity,
            },
            IncidentKind::ClassifierVerdict {
                target_url,
                attack_probability,
                ..
            } => Self {
                category: AttackCategory::ClassifierVerdict,
                title: "Classifier flagged traffic".to_string(),
                body: format!(
                    "{} scored {:.2} attack probability",
                    target_url, attack_probability
                ),
                severity: incident.severity,
            },
        }
    }

    /// Roll-up alert for one folded classifier batch.
    pub fn classifier_batch(verdict_count: usize, severity: Severity) -> Self {
        Self {
            category: AttackCategory::ClassifierVerdict,
            title: "Classifier flagged traffic".to_string(),
            body: format!("{} requests labeled attack in the last batch", verdict_count),
            severity,
        }
    }
}

/// Where alerts go. Implementations must not block the engine.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Forwards alerts over an unbounded channel to a host consumer.
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl NotificationSink for ChannelNotifier {
    fn notify(&self, notification: Notification) {
        if self.tx.send(notification).is_err() {
            log::warn!("Notification receiver dropped, alert discarded");
        }
    }
}

/// Logs alerts when no host surface is attached.
pub struct LogNotifier;

impl NotificationSink for LogNotifier {
    fn notify(&self, notification: Notification) {
        log::warn!(
            "⚠️ [{:?}] {}: {}",
            notification.severity,
            notification.title,
            notification.body
        );
    }
}

// ============================================================================
// TESTS
// ============================================================================
