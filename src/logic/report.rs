//! Traffic Summaries
//!
//! The rolling window report the sweep produces, and the sinks it is
//! published to. The JSONL writer is append-only with size-based rotation.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{Datelike, Timelike, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Default maximum summary file size before rotation (50 MB)
const MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// Default summary directory name
const SUMMARY_DIR: &str = "traffic_summaries";

/// Summary file extension
const SUMMARY_EXT: &str = ".jsonl";

// ============================================================================
// SUMMARY
// ============================================================================

/// Rolling window report produced by each sweep.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrafficSummary {
    pub request_count: usize,
    pub requests_per_minute: f64,
    pub unique_domain_count: usize,
    pub rate_flood_count: usize,
    pub auth_failure_count: usize,
    pub pattern_match_count: usize,
    pub timestamp_ms: i64,
}

/// Where sweep summaries are published.
pub trait SummarySink: Send + Sync {
    fn publish(&self, summary: &TrafficSummary);
}

// ============================================================================
// JSONL WRITER
// ============================================================================

/// Append-only JSONL summary writer with size-based rotation.
pub struct JsonlSummaryWriter {
    inner: Mutex<WriterState>,
}

struct WriterState {
    writer: BufWriter<File>,
    current_file: PathBuf,
    current_size: u64,
    base_dir: PathBuf,
    max_file_size: u64,
}

impl JsonlSummaryWriter {
    /// Create a writer in the given directory, or the platform data dir.
    pub fn new(base_dir: Option<PathBuf>) -> std::io::Result<Self> {
        Self::with_max_size(base_dir, MAX_FILE_SIZE)
    }

    /// Create a writer that rotates once a file would grow past
    /// `max_file_size` bytes.
    pub fn with_max_size(
        base_dir: Option<PathBuf>,
        max_file_size: u64,
    ) -> std::io::Result<Self> {
        let dir = base_dir.unwrap_or_else(default_summary_dir);
        std::fs::create_dir_all(&dir)?;
        let (file_path, file) = open_new_file(&dir)?;

        Ok(Self {
            inner: Mutex::new(WriterState {
                writer: BufWriter::new(file),
                current_file: file_path,
                current_size: 0,
                base_dir: dir,
                max_file_size,
            }),
        })
    }

    /// Current summary file path
    pub fn current_file(&self) -> PathBuf {
        self.inner.lock().current_file.clone()
    }

    /// Append one summary line, rotating first when the file is full.
    pub fn write(&self, summary: &TrafficSummary) -> std::io::Result<()> {
        let line = serde_json::to_string(summary)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        let bytes = line.as_bytes();

        let mut state = self.inner.lock();

        if state.current_size + bytes.len() as u64 > state.max_file_size {
            state.rotate()?;
        }

        state.writer.write_all(bytes)?;
        state.writer.write_all(b"\n")?;
        state.current_size += bytes.len() as u64 + 1;

        // Flush for durability
        state.writer.flush()?;
        Ok(())
    }
}

impl WriterState {
    fn rotate(&mut self) -> std::io::Result<()> {
        self.writer.flush()?;

        let (new_path, new_file) = open_new_file(&self.base_dir)?;
        self.writer = BufWriter::new(new_file);

        log::info!("Rotated from {:?} to {:?}", self.current_file, new_path);
        self.current_file = new_path;
        self.current_size = 0;

        Ok(())
    }
}

impl SummarySink for JsonlSummaryWriter {
    fn publish(&self, summary: &TrafficSummary) {
        if let Err(e) = self.write(summary) {
            log::error!("Failed to persist traffic summary: {}", e);
        }
    }
}

fn default_summary_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("net-sentry")
        .join(SUMMARY_DIR)
}

/// Open a new summary file with a timestamped name
fn open_new_file(base_dir: &Path) -> std::io::Result<(PathBuf, File)> {
    let now = Utc::now();
    let stem = format!(
        "traffic_{}_{:02}_{:02}_{:02}{:02}{:02}",
        now.year(),
        now.month(),
        now.day(),
        now.hour(),
        now.minute(),
        now.second()
    );

    // Same-second rotations get a numbered suffix so the full file survives
    let mut file_path = base_dir.join(format!("{}{}", stem, SUMMARY_EXT));
    let mut n = 1u32;
    while file_path.exists() {
        file_path = base_dir.join(format!("{}_{}{}", stem, n, SUMMARY_EXT));
        n += 1;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&file_path)?;

    log::info!("Opened summary file: {:?}", file_path);
    Ok((file_path, file))
}

/// Read every summary from a file (diagnostics and tests).
pub fn read_summaries(file_path: &Path) -> std::io::Result<Vec<TrafficSummary>> {
    let file = File::open(file_path)?;
    let reader = BufReader::new(file);
    let mut summaries = Vec::new();

    for line in reader.lines() {
        let line = line?;
        if !line.is_empty() {
            if let Ok(summary) = serde_json::from_str::<TrafficSummary>(&line) {
                summaries.push(summary);
            }
        }
    }

    Ok(summaries)
}

// ============================================================================
// MEMORY SINK
// ============================================================================

/// Collects summaries in memory for hosts that poll, and for tests.
#[derive(Default)]
pub struct MemorySink {
    summaries: Mutex<Vec<TrafficSummary>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.summaries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.summaries.lock().is_empty()
    }

    /// Take everything collected so far.
    pub fn take(&self) -> Vec<TrafficSummary> {
        std::mem::take(&mut *self.summaries.lock())
    }
}

impl SummarySink for MemorySink {
    fn publish(&self, summary: &TrafficSummary) {
        self.summaries.lock().push(summary.clone());
    }
}

// ============================================================================
// TESTS
// ============================================================================
