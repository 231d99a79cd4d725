//! API Module
//!
//! Query facade for hosts embedding the engine. Everything a dashboard or
//! control surface needs goes through here; nothing reaches into the monitor
//! directly.

pub mod queries;

pub use queries::*;
