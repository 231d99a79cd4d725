//! Suspicious Pattern Detector
//!
//! Informational matches of sensitive-path fragments against the lower-cased
//! URL. First match by list order wins; no alert is raised for this category.

use super::types::{Incident, IncidentKind, Severity};

/// Match the URL against the ordered pattern list. At most one incident is
/// recorded per request, for the highest-priority matching pattern.
pub fn check(url: &str, patterns: &[String], now_ms: i64) -> Option<Incident> {
    let lowered = url.to_lowercase();

    for (index, pattern) in patterns.iter().enumerate() {
        if lowered.contains(pattern.as_str()) {
            log::debug!("Suspicious pattern '{}' in {}", pattern, url);
            return Some(Incident::new(
                now_ms,
                Severity::Low,
                IncidentKind::PatternMatch {
                    target_url: lowered,
                    pattern_index: index,
                    pattern: pattern.clone(),
                },
            ));
        }
    }

    None
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::config::default_patterns;

    #[test]
    fn test_env_file_matches() {
        let incident = check("https://x.com/.env", &default_patterns(), 1_000).unwrap();
        assert_eq!(incident.severity, Severity::Low);
        match incident.kind {
            IncidentKind::PatternMatch { pattern, .. } => assert_eq!(pattern, ".env"),
            other => panic!("wrong kind: {:?}", other),
        }
    }

    #[test]
    fn test_match_is_case_insensitive() {
        // "admin" outranks "wp-admin" and is contained in it
        let incident = check("https://x.com/WP-ADMIN/setup.php", &default_patterns(), 0).unwrap();
        match incident.kind {
            IncidentKind::PatternMatch {
                pattern,
                target_url,
                ..
            } => {
                assert_eq!(pattern, "admin");
                // Recorded target is the lower-cased URL
                assert_eq!(target_url, "https://x.com/wp-admin/setup.php");
            }
            other => panic!("wrong kind: {:?}", other),
        }
    }

    #[test]
    fn test_first_match_wins_by_priority() {
        // /admin/login matches both "admin" and "login"; list order decides
        let patterns = default_patterns();
        let incident = check("https://x.com/admin/login", &patterns, 0).unwrap();
        match incident.kind {
            IncidentKind::PatternMatch {
                pattern,
                pattern_index,
                ..
            } => {
                assert_eq!(pattern, "admin");
                assert_eq!(pattern_index, 0);
            }
            other => panic!("wrong kind: {:?}", other),
        }
    }

    #[test]
    fn test_clean_url_is_quiet() {
        assert!(check("https://x.com/blog/post-1", &default_patterns(), 0).is_none());
    }

    #[test]
    fn test_empty_pattern_list_is_quiet() {
        assert!(check("https://x.com/admin", &[], 0).is_none());
    }
}
