//! Net-Sentry - NDJSON Feed Adapter
//!
//! Reads lifecycle events from stdin, one JSON object per line, and feeds
//! them to the engine. Alerts go to the log as they fire; on end of input a
//! stats report is printed to stdout.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};

use net_sentry_core::api;
use net_sentry_core::constants::{APP_NAME, APP_VERSION};
use net_sentry_core::{
    ChannelNotifier, EngineConfig, IngestEvent, JsonlSummaryWriter, SummarySink, TrafficEngine,
};

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting {} v{} (NDJSON feed)...", APP_NAME, APP_VERSION);

    let config = EngineConfig::from_env();

    let summary_sink: Option<Arc<dyn SummarySink>> = match JsonlSummaryWriter::new(None) {
        Ok(writer) => Some(Arc::new(writer)),
        Err(e) => {
            log::warn!("Summary writer init failed: {} - summaries will not be recorded", e);
            None
        }
    };

    let (notifier, mut alerts) = ChannelNotifier::new();
    tokio::spawn(async move {
        while let Some(alert) = alerts.recv().await {
            log::warn!("⚠️ [{:?}] {}: {}", alert.severity, alert.title, alert.body);
        }
    });

    let engine = TrafficEngine::new(config, Arc::new(notifier), summary_sink);
    if let Err(e) = engine.start() {
        log::error!("Failed to start engine: {}", e);
        return;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut malformed = 0u64;
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match serde_json::from_str::<IngestEvent>(line) {
                    Ok(event) => engine.ingest(event),
                    Err(e) => {
                        malformed += 1;
                        log::warn!("Malformed event skipped: {}", e);
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                log::error!("Feed read failed: {}", e);
                break;
            }
        }
    }
    if malformed > 0 {
        log::info!("{} malformed lines skipped", malformed);
    }

    // Give the consumer a beat to drain the queue before reporting
    tokio::time::sleep(Duration::from_millis(200)).await;

    let report = api::get_stats(&engine);
    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{}", json),
        Err(e) => log::error!("Failed to render stats report: {}", e),
    }

    if let Err(e) = engine.stop() {
        log::warn!("{}", e);
    }
}
