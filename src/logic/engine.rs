//! Traffic Engine
//!
//! Owns the monitor behind a lock and serializes every mutation through one
//! consumer task. Ingestion is fire-and-forget: events enter an unbounded
//! queue, the consumer applies them in arrival order and performs the
//! returned effects. Classifier calls run on their own tasks and re-enter
//! the queue as resolution events, so the monitor never waits on the
//! network.
//!
//! Background tasks:
//! - event consumer (the only writer on the hot path)
//! - sweep timer (retention pruning + window summaries)
//! - classifier health probe (reachability only, no monitor state)

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use super::classify::{ClassifierClient, ClassifierConfig, ClassifierError, ClassifyResponse};
use super::config::EngineConfig;
use super::events::{IngestEvent, RequestErrored, RequestStarted, ResponseCompleted};
use super::monitor::{Stats, StepEffects, TrafficMonitor};
use super::notify::NotificationSink;
use super::report::SummarySink;

// ============================================================================
// TYPES
// ============================================================================

#[derive(Debug)]
pub struct EngineError(pub String);

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EngineError: {}", self.0)
    }
}

impl std::error::Error for EngineError {}

/// Classifier reachability as seen by the periodic probe.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ClassifierStatus {
    pub reachable: bool,
    pub last_check_ms: Option<i64>,
    pub consecutive_failures: u32,
    pub last_error: Option<String>,
}

/// Everything the consumer task can be asked to apply.
enum EngineEvent {
    Ingest(IngestEvent),
    SweepTick,
    ClassifierResolved(Result<ClassifyResponse, ClassifierError>),
}

// ============================================================================
// ENGINE
// ============================================================================

struct EngineInner {
    monitor: RwLock<TrafficMonitor>,
    classifier_status: RwLock<ClassifierStatus>,
    running: AtomicBool,
    /// Present only while running; cleared on stop so late sends drop
    tx: RwLock<Option<mpsc::UnboundedSender<EngineEvent>>>,
    notifier: Arc<dyn NotificationSink>,
    summary_sink: Option<Arc<dyn SummarySink>>,
    client: ClassifierClient,
}

impl EngineInner {
    fn send(&self, event: EngineEvent) {
        match &*self.tx.read() {
            Some(tx) => {
                if tx.send(event).is_err() {
                    log::debug!("Engine consumer gone, event dropped");
                }
            }
            None => log::debug!("Engine not running, event dropped"),
        }
    }

    fn perform_effects(self: &Arc<Self>, effects: StepEffects) {
        for notification in effects.notifications {
            self.notifier.notify(notification);
        }

        if let Some(batch) = effects.dispatch {
            log::info!("Dispatching batch of {} requests to classifier", batch.len());
            let inner = Arc::clone(self);
            tokio::spawn(async move {
                let result = inner.client.classify(batch).await;
                inner.send(EngineEvent::ClassifierResolved(result));
            });
        }
    }
}

/// Handle to one running detection engine. Cheap to share; all ingestion
/// methods are non-blocking.
pub struct TrafficEngine {
    inner: Arc<EngineInner>,
    config: EngineConfig,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl TrafficEngine {
    pub fn new(
        config: EngineConfig,
        notifier: Arc<dyn NotificationSink>,
        summary_sink: Option<Arc<dyn SummarySink>>,
    ) -> Self {
        let client = ClassifierClient::new(ClassifierConfig {
            base_url: config.classifier_url.clone(),
            timeout_seconds: config.http_timeout_secs,
        });
        let inner = Arc::new(EngineInner {
            monitor: RwLock::new(TrafficMonitor::new(config.monitor.clone())),
            classifier_status: RwLock::new(ClassifierStatus::default()),
            running: AtomicBool::new(false),
            tx: RwLock::new(None),
            notifier,
            summary_sink,
            client,
        });
        Self {
            inner,
            config,
            tasks: Mutex::new(Vec::new()),
        }
    }

    // ========================================================================
    // LIFECYCLE
    // ========================================================================

    pub fn start(&self) -> Result<(), EngineError> {
        if self.inner.running.swap(true, Ordering::SeqCst) {
            return Err(EngineError("Engine already running".to_string()));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        *self.inner.tx.write() = Some(tx);

        // A dispatch left unresolved by a previous run will never fold
        self.inner.monitor.write().abandon_dispatch();

        let mut tasks = self.tasks.lock();
        tasks.push(tokio::spawn(consume_events(Arc::clone(&self.inner), rx)));
        tasks.push(tokio::spawn(sweep_timer(
            Arc::clone(&self.inner),
            self.config.sweep_interval_secs,
        )));
        tasks.push(tokio::spawn(health_probe(
            Arc::clone(&self.inner),
            self.config.health_probe_interval_secs,
        )));

        log::info!("Traffic engine started");
        log::info!("  Classifier: {}", self.config.classifier_url);
        log::info!("  Sweep interval: {}s", self.config.sweep_interval_secs);
        Ok(())
    }

    /// Stop ingestion and background work. Queued events are dropped; an
    /// in-flight classifier call resolves into nowhere.
    pub fn stop(&self) -> Result<(), EngineError> {
        if !self.inner.running.swap(false, Ordering::SeqCst) {
            return Err(EngineError("Engine not running".to_string()));
        }

        *self.inner.tx.write() = None;
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }

        log::info!("Traffic engine stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ========================================================================
    // INGESTION
    // ========================================================================

    /// Enqueue one lifecycle event. Drops with a debug log when stopped.
    pub fn ingest(&self, event: IngestEvent) {
        self.inner.send(EngineEvent::Ingest(event));
    }

    pub fn record_request_started(&self, event: RequestStarted) {
        self.ingest(IngestEvent::RequestStarted(event));
    }

    pub fn record_response_completed(&self, event: ResponseCompleted) {
        self.ingest(IngestEvent::ResponseCompleted(event));
    }

    pub fn record_request_errored(&self, event: RequestErrored) {
        self.ingest(IngestEvent::RequestErrored(event));
    }

    // ========================================================================
    // CONTROL + QUERIES
    // ========================================================================

    /// Reset all recorded state. Runs immediately, ahead of queued events.
    pub fn clear(&self) {
        self.inner.monitor.write().clear(Utc::now().timestamp_millis());
    }

    pub fn set_classifier_enabled(&self, enabled: bool) {
        self.inner.monitor.write().set_classifier_enabled(enabled);
        log::info!(
            "Classifier dispatch {}",
            if enabled { "enabled" } else { "disabled" }
        );
    }

    pub fn stats(&self) -> Stats {
        self.inner.monitor.read().stats()
    }

    pub fn classifier_status(&self) -> ClassifierStatus {
        self.inner.classifier_status.read().clone()
    }

    /// Run a closure against a consistent monitor snapshot.
    pub(crate) fn with_monitor<R>(&self, f: impl FnOnce(&TrafficMonitor) -> R) -> R {
        f(&self.inner.monitor.read())
    }
}

// ============================================================================
// BACKGROUND TASKS
// ============================================================================

/// The single writer: applies queued events in arrival order.
async fn consume_events(
    inner: Arc<EngineInner>,
    mut rx: mpsc::UnboundedReceiver<EngineEvent>,
) {
    while let Some(event) = rx.recv().await {
        match event {
            EngineEvent::Ingest(IngestEvent::RequestStarted(e)) => {
                // The event's own clock keeps replayed feeds faithful
                let now_ms = e.timestamp_ms;
                let effects = inner.monitor.write().handle_request_started(&e, now_ms);
                inner.perform_effects(effects);
            }
            EngineEvent::Ingest(IngestEvent::ResponseCompleted(e)) => {
                let now_ms = Utc::now().timestamp_millis();
                let effects = inner.monitor.write().handle_response_completed(&e, now_ms);
                inner.perform_effects(effects);
            }
            EngineEvent::Ingest(IngestEvent::RequestErrored(e)) => {
                inner.monitor.write().handle_request_errored(&e);
            }
            EngineEvent::SweepTick => {
                let now_ms = Utc::now().timestamp_millis();
                let summary = inner.monitor.write().sweep(now_ms);
                log::debug!(
                    "Sweep: {} requests, {} domains in window",
                    summary.request_count,
                    summary.unique_domain_count
                );
                if let Some(sink) = &inner.summary_sink {
                    sink.publish(&summary);
                }
            }
            EngineEvent::ClassifierResolved(result) => {
                let now_ms = Utc::now().timestamp_millis();
                let effects = inner.monitor.write().fold_classifier_result(result, now_ms);
                inner.perform_effects(effects);
            }
        }
    }
    log::debug!("Event consumer exited");
}

async fn sweep_timer(inner: Arc<EngineInner>, interval_secs: u64) {
    loop {
        sleep(Duration::from_secs(interval_secs)).await;
        if !inner.running.load(Ordering::SeqCst) {
            break;
        }
        inner.send(EngineEvent::SweepTick);
    }
}

/// Probes classifier reachability. Writes only its own status cell, so a
/// slow or dead classifier never touches the detection path.
async fn health_probe(inner: Arc<EngineInner>, interval_secs: u64) {
    loop {
        let was_reachable = inner.classifier_status.read().reachable;
        match inner.client.health_check().await {
            Ok(health) => {
                if !was_reachable {
                    log::info!(
                        "Classifier reachable (model: {})",
                        health.model.as_deref().unwrap_or("unknown")
                    );
                }
                *inner.classifier_status.write() = ClassifierStatus {
                    reachable: true,
                    last_check_ms: Some(Utc::now().timestamp_millis()),
                    consecutive_failures: 0,
                    last_error: None,
                };
            }
            Err(e) => {
                log::warn!("Classifier health check failed: {}", e);
                let mut status = inner.classifier_status.write();
                status.reachable = false;
                status.last_check_ms = Some(Utc::now().timestamp_millis());
                status.consecutive_failures += 1;
                status.last_error = Some(e.to_string());
            }
        }

        sleep(Duration::from_secs(interval_secs)).await;
        if !inner.running.load(Ordering::SeqCst) {
            break;
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::config::MonitorConfig;
    use crate::logic::notify::{ChannelNotifier, LogNotifier};
    use crate::logic::report::MemorySink;

    fn test_engine_config() -> EngineConfig {
        EngineConfig {
            // Reserved port: connection refused fast, never a live service
            classifier_url: "http://127.0.0.1:9/api".to_string(),
            http_timeout_secs: 1,
            sweep_interval_secs: 3_600,
            health_probe_interval_secs: 3_600,
            monitor: MonitorConfig {
                rate_flood_threshold: 3,
                rate_flood_window_ms: 60_000,
                batch_size: 2,
                classifier_enabled: false,
                ..MonitorConfig::default()
            },
        }
    }

    fn started(id: &str, url: &str) -> RequestStarted {
        RequestStarted {
            request_id: id.to_string(),
            url: url.to_string(),
            method: "GET".to_string(),
            http_type: "xhr".to_string(),
            timestamp_ms: Utc::now().timestamp_millis(),
            origin_context: None,
            raw_body: None,
        }
    }

    async fn wait_until(mut check: impl FnMut() -> bool) {
        for _ in 0..200 {
            if check() {
                return;
            }
            sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached within 2s");
    }

    #[tokio::test]
    async fn test_lifecycle_guards() {
        let engine = TrafficEngine::new(test_engine_config(), Arc::new(LogNotifier), None);
        assert!(!engine.is_running());
        assert!(engine.stop().is_err());

        engine.start().unwrap();
        assert!(engine.is_running());
        assert!(engine.start().is_err());

        engine.stop().unwrap();
        assert!(!engine.is_running());
    }

    #[tokio::test]
    async fn test_ingest_flows_through_the_queue() {
        let engine = TrafficEngine::new(test_engine_config(), Arc::new(LogNotifier), None);

        // Dropped while stopped
        engine.record_request_started(started("early", "https://a.com/"));

        engine.start().unwrap();
        engine.record_request_started(started("r1", "https://a.com/"));
        engine.record_request_errored(RequestErrored {
            request_id: "r1".to_string(),
            error_text: "net::ERR_CONNECTION_RESET".to_string(),
        });
        engine.record_request_started(started("r2", "https://b.com/"));

        // The queue is ordered, so once r2 lands the error has been applied;
        // it records nothing
        wait_until(|| engine.stats().total_requests_observed == 2).await;
        assert_eq!(engine.with_monitor(|m| m.record_count()), 2);
        engine.stop().unwrap();
    }

    #[tokio::test]
    async fn test_flood_alert_reaches_the_notifier() {
        let (notifier, mut rx) = ChannelNotifier::new();
        let engine =
            TrafficEngine::new(test_engine_config(), Arc::new(notifier), None);
        engine.start().unwrap();

        // Threshold 3: the fourth request to one domain goes over
        for i in 0..4 {
            engine.record_request_started(started(&format!("r{}", i), "https://burst.com/a"));
        }

        let notification =
            tokio::time::timeout(Duration::from_secs(2), rx.recv()).await.unwrap().unwrap();
        assert_eq!(notification.title, "Rate flood detected");
        engine.stop().unwrap();
    }

    #[tokio::test]
    async fn test_failed_dispatch_is_counted_and_recovered() {
        let mut config = test_engine_config();
        config.monitor.classifier_enabled = true;
        let engine = TrafficEngine::new(config, Arc::new(LogNotifier), None);
        engine.start().unwrap();

        engine.record_request_started(started("r1", "https://a.com/"));
        engine.record_request_started(started("r2", "https://a.com/"));
        engine.record_response_completed(ResponseCompleted {
            request_id: "r1".to_string(),
            status_code: 200,
            response_headers: None,
        });
        engine.record_response_completed(ResponseCompleted {
            request_id: "r2".to_string(),
            status_code: 200,
            response_headers: None,
        });

        // Nothing listens on the reserved port, so the batch fails and the
        // dispatcher frees itself
        wait_until(|| engine.with_monitor(|m| m.dispatch_stats().failed_batches) == 1).await;
        assert_eq!(engine.stats().classifier_invocation_count, 0);
        engine.stop().unwrap();
    }

    #[tokio::test]
    async fn test_clear_resets_while_running() {
        let engine = TrafficEngine::new(test_engine_config(), Arc::new(LogNotifier), None);
        engine.start().unwrap();

        engine.record_request_started(started("r1", "https://a.com/"));
        wait_until(|| engine.stats().total_requests_observed == 1).await;

        engine.clear();
        assert_eq!(engine.stats().total_requests_observed, 0);
        assert_eq!(engine.with_monitor(|m| m.record_count()), 0);
        engine.stop().unwrap();
    }

    #[tokio::test]
    async fn test_sweep_publishes_to_the_summary_sink() {
        let mut config = test_engine_config();
        config.sweep_interval_secs = 1;
        let sink = Arc::new(MemorySink::new());
        let engine = TrafficEngine::new(
            config,
            Arc::new(LogNotifier),
            Some(sink.clone() as Arc<dyn SummarySink>),
        );
        engine.start().unwrap();

        engine.record_request_started(started("r1", "https://a.com/"));
        wait_until(|| !sink.is_empty()).await;

        let summaries = sink.take();
        assert_eq!(summaries[0].request_count, 1);
        engine.stop().unwrap();
    }

    #[tokio::test]
    async fn test_toggle_classifier_from_the_engine() {
        let engine = TrafficEngine::new(test_engine_config(), Arc::new(LogNotifier), None);
        assert!(!engine.with_monitor(|m| m.classifier_enabled()));

        engine.set_classifier_enabled(true);
        assert!(engine.with_monitor(|m| m.classifier_enabled()));
    }
}
