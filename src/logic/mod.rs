//! Logic Module - Detection Core & Engines
//!
//! Everything between raw lifecycle events and host-facing reports:
//! - `store/` - bounded traffic window (records + details)
//! - `detect/` - rate-flood, auth-failure and URL-pattern detectors
//! - `classify/` - batch dispatcher + external classifier client
//! - `monitor/` - the synchronous detection core
//! - `engine` - async orchestration around the monitor

// Core modules
pub mod config;
pub mod engine;
pub mod events;
pub mod ledger;
pub mod monitor;
pub mod notify;
pub mod report;

// Detection pipeline
pub mod classify;
pub mod detect;
pub mod store;
