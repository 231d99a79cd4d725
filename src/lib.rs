//! Net-Sentry Core - Traffic Anomaly Detection Engine
//!
//! Watches a stream of network-request lifecycle events for hostile traffic:
//! request floods against one destination, repeated authentication failures,
//! probes for sensitive paths, and batches of completed requests scored by an
//! external classifier service.
//!
//! Hosts embed [`TrafficEngine`], feed it lifecycle events, and read back
//! stats, incidents and exports through [`api`].

pub mod api;
pub mod constants;
pub mod logic;

pub use logic::config::{EngineConfig, MonitorConfig};
pub use logic::engine::{ClassifierStatus, EngineError, TrafficEngine};
pub use logic::events::{IngestEvent, RequestErrored, RequestStarted, ResponseCompleted};
pub use logic::notify::{ChannelNotifier, LogNotifier, Notification, NotificationSink};
pub use logic::report::{JsonlSummaryWriter, MemorySink, SummarySink, TrafficSummary};
