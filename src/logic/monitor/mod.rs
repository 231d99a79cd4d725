//! Traffic Monitor Core
//!
//! Single-threaded detection core. Each ingestion event runs its detectors
//! synchronously against a consistent store snapshot and returns the effects
//! (alerts to emit, a batch to dispatch) for the engine to perform; the
//! monitor itself never spawns or blocks.
//!
//! Architecture:
//! - request-started: store append -> rate-flood check -> pattern check
//! - response-completed: detail fill -> auth-failure check -> batch trigger
//! - sweep tick: ledger prune -> window summary
//! - classifier resolution: verdict fold


use serde::Serialize;

use super::classify::{
    fold_verdicts, BatchDispatcher, ClassifierError, ClassifyResponse, DispatchState,
    DispatchStats,
};
use super::config::MonitorConfig;
use super::detect::{auth_failure, patterns, rate_flood};
use super::events::{RequestErrored, RequestStarted, ResponseCompleted};
use super::ledger::{AttackLedger, AttackSnapshot, CategoryCounts};
use super::notify::Notification;
use super::report::TrafficSummary;
use super::store::{RequestDetail, RequestRecord, RequestStore};

// ============================================================================
// STATE
// ============================================================================

/// Engine-visible counters. Per-category incident counts are always derived
/// from the ledger, never stored here, to avoid drift.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Stats {
    pub total_requests_observed: u64,
    pub suspicious_incident_count: u64,
    pub classifier_invocation_count: u64,
    pub last_updated_ms: i64,
}

impl Stats {
    fn empty(now_ms: i64) -> Self {
        Self {
            total_requests_observed: 0,
            suspicious_incident_count: 0,
            classifier_invocation_count: 0,
            last_updated_ms: now_ms,
        }
    }
}

/// Effects one step asks the engine to perform.
#[derive(Debug, Default)]
pub struct StepEffects {
    pub notifications: Vec<Notification>,
    /// Completed details captured for the classifier at trigger time
    pub dispatch: Option<Vec<RequestDetail>>,
}

/// The detection core: store, ledger, dispatcher and stats behind one value.
pub struct TrafficMonitor {
    config: MonitorConfig,
    store: RequestStore,
    ledger: AttackLedger,
    dispatcher: BatchDispatcher,
    stats: Stats,
}

impl TrafficMonitor {
    pub fn new(config: MonitorConfig) -> Self {
        let store = RequestStore::new(config.store_capacity, config.default_response_size_bytes);
        let dispatcher = BatchDispatcher::new(config.batch_size, config.classifier_enabled);
        Self {
            config,
            store,
            ledger: AttackLedger::new(),
            dispatcher,
            stats: Stats::empty(0),
        }
    }

    // ========================================================================
    // INGESTION PATH
    // ========================================================================

    /// A request began: record it, then run the start-side detectors.
    pub fn handle_request_started(
        &mut self,
        event: &RequestStarted,
        now_ms: i64,
    ) -> StepEffects {
        let mut effects = StepEffects::default();

        let record = self.store.record_request_started(event);
        self.stats.total_requests_observed += 1;
        self.stats.last_updated_ms = now_ms;

        if let Some(incident) = rate_flood::check(
            &self.store,
            &record,
            now_ms,
            self.config.rate_flood_threshold,
            self.config.rate_flood_window_ms,
        ) {
            effects.notifications.push(Notification::for_incident(&incident));
            self.stats.suspicious_incident_count += 1;
            self.ledger.append(incident);
        }

        if let Some(incident) =
            patterns::check(&record.url, &self.config.suspicious_patterns, now_ms)
        {
            // Informational only: recorded, never alerted
            self.ledger.append(incident);
        }

        effects
    }

    /// A response arrived: complete the detail, run the auth detector, and
    /// step the batch dispatcher.
    pub fn handle_response_completed(
        &mut self,
        event: &ResponseCompleted,
        now_ms: i64,
    ) -> StepEffects {
        let mut effects = StepEffects::default();

        let detail = match self.store.record_response_completed(event, now_ms) {
            Some(detail) => detail,
            None => {
                // Record already evicted; an expected race, not an error
                log::debug!("Response for unknown request {} dropped", event.request_id);
                return effects;
            }
        };
        self.stats.last_updated_ms = now_ms;

        if event.status_code == 401 || event.status_code == 403 {
            if let Some(found) = auth_failure::check(
                &self.ledger,
                &detail.url,
                event.status_code,
                now_ms,
                self.config.auth_failure_threshold,
                self.config.auth_failure_window_ms,
            ) {
                if found.alert {
                    self.stats.suspicious_incident_count += 1;
                    effects
                        .notifications
                        .push(Notification::for_incident(&found.incident));
                }
                self.ledger.append(found.incident);
            }
        }

        if self.dispatcher.on_completion() {
            let batch = self.store.recent_completed_details(self.config.batch_size);
            if !batch.is_empty() {
                self.dispatcher.begin_dispatch();
                effects.dispatch = Some(batch);
            }
        }

        effects
    }

    /// A request failed without a response. Its detail stays incomplete and
    /// never becomes eligible for dispatch.
    pub fn handle_request_errored(&mut self, event: &RequestErrored) {
        log::debug!("Request {} errored: {}", event.request_id, event.error_text);
    }

    // ========================================================================
    // CLASSIFIER FOLD
    // ========================================================================

    /// Fold a resolved classifier call back into the ledger.
    pub fn fold_classifier_result(
        &mut self,
        result: Result<ClassifyResponse, ClassifierError>,
        now_ms: i64,
    ) -> StepEffects {
        let mut effects = StepEffects::default();

        match result {
            Ok(response) => {
                self.dispatcher.finish_dispatch(true);
                self.stats.classifier_invocation_count += response.total_requests;
                self.stats.last_updated_ms = now_ms;

                let verdicts = fold_verdicts(&response, now_ms);
                log::info!(
                    "Classifier batch resolved: {} scored, {} flagged (threat level: {})",
                    response.predictions.len(),
                    verdicts.len(),
                    response.summary.threat_level
                );

                if let Some(top) = verdicts.iter().max_by_key(|i| i.severity.level()) {
                    effects
                        .notifications
                        .push(Notification::classifier_batch(verdicts.len(), top.severity));
                }
                for incident in verdicts {
                    self.ledger.append(incident);
                }
            }
            Err(e) => {
                self.dispatcher.finish_dispatch(false);
                log::warn!("Classifier batch failed: {}", e);
            }
        }

        effects
    }

    // ========================================================================
    // SWEEP
    // ========================================================================

    /// Periodic sweep: prune the ledger to the retention horizon, then
    /// summarize the window. The only place ledger entries are removed.
    pub fn sweep(&mut self, now_ms: i64) -> TrafficSummary {
        let cutoff = now_ms - self.config.retention_ms;

        let removed = self.ledger.prune_older_than(cutoff);
        if removed > 0 {
            log::debug!("Pruned {} stale incidents", removed);
        }

        let mut request_count = 0usize;
        let mut domains = std::collections::HashSet::new();
        for record in self.store.records_since(cutoff) {
            request_count += 1;
            domains.insert(record.domain.as_str());
        }
        let unique_domain_count = domains.len();
        drop(domains);

        let counts = self.ledger.counts_since(cutoff);
        self.stats.last_updated_ms = now_ms;

        let window_minutes = self.config.retention_ms as f64 / 60_000.0;
        TrafficSummary {
            request_count,
            requests_per_minute: request_count as f64 / window_minutes.max(1.0 / 60.0),
            unique_domain_count,
            rate_flood_count: counts.rate_flood,
            auth_failure_count: counts.auth_failure,
            pattern_match_count: counts.pattern_match,
            timestamp_ms: now_ms,
        }
    }

    // ========================================================================
    // QUERY + CONTROL
    // ========================================================================

    pub fn stats(&self) -> Stats {
        self.stats
    }

    pub fn counts(&self) -> CategoryCounts {
        self.ledger.counts()
    }

    pub fn recent_requests(&self, n: usize) -> Vec<RequestRecord> {
        self.store.snapshot_recent(n)
    }

    pub fn recent_attacks(&self, n: usize) -> AttackSnapshot {
        self.ledger.recent(n)
    }

    pub fn export_details(&self) -> Vec<RequestDetail> {
        self.store.export_details()
    }

    pub fn export_ledger(&self) -> AttackSnapshot {
        self.ledger.export()
    }

    pub fn record_count(&self) -> usize {
        self.store.record_count()
    }

    pub fn detail_count(&self) -> usize {
        self.store.detail_count()
    }

    pub fn dispatch_state(&self) -> DispatchState {
        self.dispatcher.state()
    }

    pub fn dispatch_stats(&self) -> DispatchStats {
        self.dispatcher.stats()
    }

    pub fn classifier_enabled(&self) -> bool {
        self.dispatcher.is_enabled()
    }

    /// Toggle classifier dispatch. Recorded data is untouched.
    pub fn set_classifier_enabled(&mut self, enabled: bool) {
        self.dispatcher.set_enabled(enabled);
    }

    /// Abandon an unresolved dispatch whose result will never arrive.
    pub fn abandon_dispatch(&mut self) {
        self.dispatcher.abandon_outstanding();
    }

    /// Reset store, ledger and stats to empty. An in-flight classifier call
    /// is not cancelled; its verdicts will fold into the fresh state.
    pub fn clear(&mut self, now_ms: i64) {
        self.store.clear();
        self.ledger.clear();
        self.stats = Stats::empty(now_ms);
        self.dispatcher.reset();
        log::info!("Monitor state cleared");
    }
}
