//! Auth-Failure Detector
//!
//! Repeated 401/403 responses against one authentication endpoint. The ledger
//! itself is the failure history: every qualifying failure appends, alerting
//! is debounced until the prior count reaches the threshold, then re-alerts
//! on every further failure with no cooldown.

use once_cell::sync::Lazy;
use regex::Regex;

use super::types::{Incident, IncidentKind, Severity};
use crate::logic::ledger::AttackLedger;

/// Authentication-endpoint heuristic over the URL text.
static AUTH_ENDPOINT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)login|auth|signin|password").expect("auth endpoint regex"));

/// Prior failures beyond which severity escalates from medium to high.
const ESCALATION_FAILURES: usize = 5;

/// One auth-failure finding plus whether to raise an alert for it.
#[derive(Debug)]
pub struct AuthCheck {
    pub incident: Incident,
    pub alert: bool,
}

/// True when the URL looks like an authentication endpoint.
pub fn is_auth_endpoint(url: &str) -> bool {
    AUTH_ENDPOINT_RE.is_match(url)
}

/// Run the brute-force heuristic for one failed response. The caller gates on
/// status 401/403; this returns None when the URL is not an auth endpoint.
pub fn check(
    ledger: &AttackLedger,
    url: &str,
    status_code: u16,
    now_ms: i64,
    threshold: usize,
    window_ms: i64,
) -> Option<AuthCheck> {
    if !is_auth_endpoint(url) {
        return None;
    }

    let prior = ledger.count_auth_failures_for_url(url, now_ms, window_ms);
    let severity = if prior > ESCALATION_FAILURES {
        Severity::High
    } else {
        Severity::Medium
    };

    let incident = Incident::new(
        now_ms,
        severity,
        IncidentKind::AuthFailure {
            target_url: url.to_string(),
            consecutive_failure_count: prior + 1,
            status_code,
        },
    );

    let alert = prior >= threshold;
    if alert {
        log::warn!(
            "Brute force suspected on {}: {} failures in {}ms",
            url,
            prior + 1,
            window_ms
        );
    }

    Some(AuthCheck { incident, alert })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_endpoint_heuristic() {
        assert!(is_auth_endpoint("https://site.com/login"));
        assert!(is_auth_endpoint("https://site.com/api/AUTH/token"));
        assert!(is_auth_endpoint("https://site.com/reset-PASSWORD"));
        assert!(is_auth_endpoint("https://site.com/signin?next=/"));
        assert!(!is_auth_endpoint("https://site.com/images/logo.png"));
    }

    #[test]
    fn test_non_auth_url_is_ignored() {
        let ledger = AttackLedger::new();
        assert!(check(&ledger, "https://site.com/static/app.js", 403, 0, 3, 60_000).is_none());
    }

    #[test]
    fn test_failure_count_runs_up() {
        let mut ledger = AttackLedger::new();
        let url = "https://site.com/login";

        for n in 1..=4 {
            let found = check(&ledger, url, 401, n * 1_000, 3, 60_000).unwrap();
            match &found.incident.kind {
                IncidentKind::AuthFailure {
                    consecutive_failure_count,
                    status_code,
                    ..
                } => {
                    assert_eq!(*consecutive_failure_count, n as usize);
                    assert_eq!(*status_code, 401);
                }
                other => panic!("wrong kind: {:?}", other),
            }
            ledger.append(found.incident);
        }
    }

    #[test]
    fn test_alert_fires_at_threshold_then_keeps_firing() {
        let mut ledger = AttackLedger::new();
        let url = "https://site.com/login";
        let mut alerts = Vec::new();

        for n in 0..6 {
            let found = check(&ledger, url, 401, n * 1_000, 3, 60_000).unwrap();
            alerts.push(found.alert);
            ledger.append(found.incident);
        }

        // Prior counts run 0,1,2,3,4,5 against threshold 3: quiet, quiet,
        // quiet, alert, alert, alert
        assert_eq!(alerts, vec![false, false, false, true, true, true]);
    }

    #[test]
    fn test_severity_escalates_after_five_priors() {
        let mut ledger = AttackLedger::new();
        let url = "https://site.com/auth";

        let mut last_severity = Severity::Low;
        for n in 0..7 {
            let found = check(&ledger, url, 403, n * 100, 10, 60_000).unwrap();
            last_severity = found.incident.severity;
            ledger.append(found.incident);
        }

        // Seventh failure sees 6 priors, past the escalation point
        assert_eq!(last_severity, Severity::High);
        assert_eq!(
            ledger.recent(1).auth_failure[0].severity,
            Severity::High
        );
    }

    #[test]
    fn test_stale_failures_do_not_count() {
        let mut ledger = AttackLedger::new();
        let url = "https://site.com/login";

        let old = check(&ledger, url, 401, 0, 3, 60_000).unwrap();
        ledger.append(old.incident);

        // 2 minutes later the earlier failure is out of the window
        let fresh = check(&ledger, url, 401, 120_000, 3, 60_000).unwrap();
        match &fresh.incident.kind {
            IncidentKind::AuthFailure {
                consecutive_failure_count,
                ..
            } => assert_eq!(*consecutive_failure_count, 1),
            other => panic!("wrong kind: {:?}", other),
        }
        assert_eq!(fresh.incident.severity, Severity::Medium);
    }
}
