//! Query Commands
//!
//! Host-facing facade over a running [`TrafficEngine`]. Every query takes one
//! consistent snapshot under the monitor's read lock; none of them block on
//! ingestion or the classifier.

use chrono::Utc;
use serde::Serialize;

use crate::constants::APP_VERSION;
use crate::logic::classify::DispatchStats;
use crate::logic::engine::{ClassifierStatus, TrafficEngine};
use crate::logic::ledger::{AttackSnapshot, CategoryCounts};
use crate::logic::monitor::Stats;
use crate::logic::store::{RequestDetail, RequestRecord};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Recent requests carried by a stats report
pub const RECENT_REQUEST_LIMIT: usize = 50;

/// Per-category incidents carried by an attacks report
pub const RECENT_ATTACK_LIMIT: usize = 10;

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// Live counters plus a tail of recent traffic.
#[derive(Debug, Clone, Serialize)]
pub struct StatsReport {
    pub stats: Stats,
    pub attacks: CategoryCounts,
    pub recent_requests: Vec<RequestRecord>,
}

/// Complete recorded state, for offline analysis.
#[derive(Debug, Clone, Serialize)]
pub struct ExportSnapshot {
    pub traffic: Vec<RequestDetail>,
    pub stats: Stats,
    pub attacks: AttackSnapshot,
    pub exported_at: String,
}

/// Operational status for a host dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub running: bool,
    pub version: String,
    pub classifier_enabled: bool,
    pub classifier: ClassifierStatus,
    pub dispatch: DispatchStats,
    pub store_records: usize,
    pub store_details: usize,
}

// ============================================================================
// COMMANDS
// ============================================================================

/// Counters, per-category totals and the latest requests in one snapshot.
pub fn get_stats(engine: &TrafficEngine) -> StatsReport {
    engine.with_monitor(|m| StatsReport {
        stats: m.stats(),
        attacks: m.counts(),
        recent_requests: m.recent_requests(RECENT_REQUEST_LIMIT),
    })
}

/// The most recent incidents of every category.
pub fn get_attacks(engine: &TrafficEngine) -> AttackSnapshot {
    engine.with_monitor(|m| m.recent_attacks(RECENT_ATTACK_LIMIT))
}

/// Reset all recorded traffic, incidents and counters.
pub fn clear(engine: &TrafficEngine) {
    engine.clear();
}

/// Gate classifier dispatch on or off. Recorded data is untouched.
pub fn set_classifier_enabled(engine: &TrafficEngine, enabled: bool) {
    engine.set_classifier_enabled(enabled);
}

/// Everything currently recorded, stamped with the export time.
pub fn export_snapshot(engine: &TrafficEngine) -> ExportSnapshot {
    engine.with_monitor(|m| ExportSnapshot {
        traffic: m.export_details(),
        stats: m.stats(),
        attacks: m.export_ledger(),
        exported_at: Utc::now().to_rfc3339(),
    })
}

/// Engine, store and classifier health in one view.
pub fn engine_status(engine: &TrafficEngine) -> EngineStatus {
    engine.with_monitor(|m| EngineStatus {
        running: engine.is_running(),
        version: APP_VERSION.to_string(),
        classifier_enabled: m.classifier_enabled(),
        classifier: engine.classifier_status(),
        dispatch: m.dispatch_stats(),
        store_records: m.record_count(),
        store_details: m.detail_count(),
    })
}

// ============================================================================
// TESTS
// ============================================================================
