//! Rule Detectors
//!
//! Three independent detectors over the request store and the attack ledger,
//! each with a fixed severity policy:
//!
//! - rate_flood: over-threshold bursts per domain, always high
//! - auth_failure: repeated 401/403 against auth endpoints, medium escalating
//!   to high
//! - patterns: sensitive-path fragments, always low, never alerts
//!
//! All checks are pure over their inputs; appending to the ledger and
//! emitting alerts stay with the caller.

pub mod auth_failure;
pub mod patterns;
pub mod rate_flood;
pub mod types;

pub use types::{AttackCategory, Incident, IncidentKind, Severity};
