//! Batch Dispatcher
//!
//! Accumulates completed request details and hands them to the external
//! classifier one exclusive batch at a time. A failed batch returns the
//! dispatcher to Idle; it never disables future dispatch.

pub mod client;

pub use client::{
    ClassifierClient, ClassifierConfig, ClassifierError, ClassifyResponse, HealthResponse,
    Prediction,
};

use serde::Serialize;

use super::detect::types::{Incident, IncidentKind, Severity};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Attack-probability floor for folding a prediction into the ledger.
const VERDICT_PROBABILITY_FLOOR: f64 = 0.7;

/// Attack-probability above which a verdict is critical rather than high.
const CRITICAL_PROBABILITY: f64 = 0.9;

// ============================================================================
// STATE MACHINE
// ============================================================================

/// Dispatch lifecycle. Dispatching is exclusive: while one call is
/// outstanding, no second batch may leave the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchState {
    Idle,
    Accumulating,
    Dispatching,
}

/// Counters surfaced alongside the state for status queries.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DispatchStats {
    pub state: DispatchState,
    pub pending_completed: usize,
    pub dispatched_batches: u64,
    pub failed_batches: u64,
}

/// Tracks accumulation toward the next classifier batch.
#[derive(Debug)]
pub struct BatchDispatcher {
    state: DispatchState,
    batch_size: usize,
    enabled: bool,
    /// Completions seen since the last dispatch began
    pending_completed: usize,
    dispatched_batches: u64,
    failed_batches: u64,
}

impl BatchDispatcher {
    pub fn new(batch_size: usize, enabled: bool) -> Self {
        Self {
            state: DispatchState::Idle,
            batch_size: batch_size.max(1),
            enabled,
            pending_completed: 0,
            dispatched_batches: 0,
            failed_batches: 0,
        }
    }

    pub fn state(&self) -> DispatchState {
        self.state
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Toggle dispatch. Disabling gates new batches only; an outstanding call
    /// still resolves.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Record one completed detail. Returns true when a batch should be
    /// captured and dispatched now.
    pub fn on_completion(&mut self) -> bool {
        self.pending_completed += 1;
        if self.state == DispatchState::Idle {
            self.state = DispatchState::Accumulating;
        }
        self.enabled
            && self.state != DispatchState::Dispatching
            && self.pending_completed >= self.batch_size
    }

    /// Mark the captured batch as in flight and restart accumulation.
    pub fn begin_dispatch(&mut self) {
        self.state = DispatchState::Dispatching;
        self.pending_completed = 0;
        self.dispatched_batches += 1;
    }

    /// Resolve the outstanding call. Success or failure, the dispatcher keeps
    /// accepting future batches.
    pub fn finish_dispatch(&mut self, success: bool) {
        if !success {
            self.failed_batches += 1;
        }
        self.state = if self.pending_completed > 0 {
            DispatchState::Accumulating
        } else {
            DispatchState::Idle
        };
    }

    /// Drop accumulated progress. An outstanding dispatch stays exclusive
    /// until its resolution folds.
    pub fn reset(&mut self) {
        self.pending_completed = 0;
        if self.state != DispatchState::Dispatching {
            self.state = DispatchState::Idle;
        }
    }

    /// Abandon an unresolved call whose result will never arrive (engine
    /// restart). Counted as a failure.
    pub fn abandon_outstanding(&mut self) {
        if self.state == DispatchState::Dispatching {
            log::warn!("Abandoning unresolved classifier dispatch");
            self.finish_dispatch(false);
        }
    }

    pub fn stats(&self) -> DispatchStats {
        DispatchStats {
            state: self.state,
            pending_completed: self.pending_completed,
            dispatched_batches: self.dispatched_batches,
            failed_batches: self.failed_batches,
        }
    }
}

// ============================================================================
// VERDICT FOLD
// ============================================================================

/// Convert classifier predictions into ledger incidents. Only attack labels
/// above the probability floor cross; the rest are dropped.
pub fn fold_verdicts(response: &ClassifyResponse, now_ms: i64) -> Vec<Incident> {
    response
        .predictions
        .iter()
        .filter(|p| p.is_attack() && p.attack_probability > VERDICT_PROBABILITY_FLOOR)
        .map(|p| {
            let severity = if p.attack_probability > CRITICAL_PROBABILITY {
                Severity::Critical
            } else {
                Severity::High
            };
            Incident::new(
                now_ms,
                severity,
                IncidentKind::ClassifierVerdict {
                    target_url: p.url.clone(),
                    confidence: p.confidence,
                    attack_probability: p.attack_probability,
                },
            )
        })
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================
