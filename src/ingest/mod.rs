use anyhow::Result;
use chrono::NaiveDate;
use crossbeam_channel::{bounded, Sender};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use crate::error::{ChatStatsError, FileFailure};
use crate::markup::LogDocument;
use crate::metrics::Metrics;
use crate::record::{parse_entries, Record};
use crate::scanner::DAY_STAMP;

/// Calendar day encoded as `YYYY-MM-DD` in the file name.
pub fn base_day(path: &Path) -> Result<NaiveDate, ChatStatsError> {
    let invalid = || ChatStatsError::InvalidFilename { path: path.to_path_buf() };
    let name = path.file_name().and_then(|s| s.to_str()).ok_or_else(invalid)?;
    let caps = DAY_STAMP.captures(name).ok_or_else(invalid)?;
    let y: i32 = caps[1].parse().map_err(|_| invalid())?;
    let m: u32 = caps[2].parse().map_err(|_| invalid())?;
    let d: u32 = caps[3].parse().map_err(|_| invalid())?;
    NaiveDate::from_ymd_opt(y, m, d).ok_or_else(invalid)
}

/// Parse one already-read log document. Lines are folded strictly in order.
pub fn ingest_document(path: &Path, content: &str) -> Result<Vec<Record>, ChatStatsError> {
    parse_document(base_day(path)?, content)
}

fn parse_document(day: NaiveDate, content: &str) -> Result<Vec<Record>, ChatStatsError> {
    let entries = LogDocument::parse(content).log_entries();
    parse_entries(day, &entries)
}

pub fn ingest_file(path: &Path) -> Result<Vec<Record>, ChatStatsError> {
    ingest_file_with_metrics(path, &Metrics::new())
}

/// [`ingest_file`], recording read and parse timings into `metrics`.
pub fn ingest_file_with_metrics(path: &Path, metrics: &Metrics) -> Result<Vec<Record>, ChatStatsError> {
    // check the name before paying for the read
    let day = base_day(path)?;

    let t0 = Instant::now();
    let content = fs::read_to_string(path).map_err(|source| ChatStatsError::ReadLog {
        path: path.to_path_buf(),
        source,
    })?;
    metrics.add_read_time(t0.elapsed().as_nanos() as u64);
    metrics.inc_input_bytes(content.len() as u64);

    let t1 = Instant::now();
    let records = parse_document(day, &content);
    metrics.add_parse_time(t1.elapsed().as_nanos() as u64);
    records
}

/// Outcome of ingesting one file.
#[derive(Debug)]
pub struct FileBatch {
    pub path: PathBuf,
    pub result: Result<Vec<Record>, ChatStatsError>,
}

/// All records that parsed, plus one failure per file that did not.
#[derive(Debug, Default)]
pub struct Ingested {
    pub records: Vec<Record>,
    pub failures: Vec<FileFailure>,
}

/// Reader pool: each worker walks a contiguous slice of the file list and
/// sends one [`FileBatch`] per file.
pub struct IngestPool {
    handles: Vec<JoinHandle<()>>,
}

impl IngestPool {
    pub fn new(
        files: Arc<Vec<PathBuf>>,
        read_workers: usize,
        metrics: Arc<Metrics>,
        output_tx: Sender<FileBatch>,
    ) -> Self {
        let read_workers = read_workers.max(1).min(files.len().max(1));
        tracing::info!(read_workers = read_workers, files_count = files.len(), "Starting ingest pool");

        let handles = (0..read_workers)
            .map(|worker_id| {
                let files = files.clone();
                let metrics = metrics.clone();
                let output_tx = output_tx.clone();

                std::thread::spawn(move || {
                    tracing::debug!("Ingest worker {} started", worker_id);

                    let files_per_worker = (files.len() + read_workers - 1) / read_workers;
                    let start_idx = (worker_id * files_per_worker).min(files.len());
                    let end_idx = ((worker_id + 1) * files_per_worker).min(files.len());

                    for path in &files[start_idx..end_idx] {
                        let batch = ingest_one(path, &metrics);
                        if output_tx.send(batch).is_err() {
                            tracing::warn!(file = ?path, "collector closed while sending file batch");
                            return;
                        }
                    }

                    tracing::debug!("Ingest worker {} finished", worker_id);
                })
            })
            .collect();

        Self { handles }
    }

    pub fn wait_all(self) -> Result<()> {
        for handle in self.handles {
            if handle.join().is_err() {
                anyhow::bail!("ingest worker panicked");
            }
        }
        Ok(())
    }
}

fn ingest_one(path: &Path, metrics: &Metrics) -> FileBatch {
    metrics.inc_files(1);
    let result = ingest_file_with_metrics(path, metrics);
    if let Ok(records) = &result {
        metrics.inc_entries(records.len() as u64);
        tracing::debug!(file = ?path, records = records.len(), "file ingested");
    }
    FileBatch { path: path.to_path_buf(), result }
}

/// Ingest every file concurrently and concatenate the per-file records.
///
/// A failing file contributes no records at all; its siblings are unaffected.
pub fn ingest_all(files: Vec<PathBuf>, read_workers: usize, queue_cap: usize, metrics: Arc<Metrics>) -> Result<Ingested> {
    let files = Arc::new(files);
    let (tx, rx) = bounded::<FileBatch>(queue_cap.max(2));
    let pool = IngestPool::new(files.clone(), read_workers, metrics.clone(), tx);

    let mut out = Ingested::default();
    for batch in rx.iter() {
        match batch.result {
            Ok(mut records) => {
                metrics.inc_records(records.len() as u64);
                out.records.append(&mut records);
            }
            Err(error) => {
                metrics.inc_failed_files(1);
                tracing::warn!(file = ?batch.path, error = %error, "file ingestion failed");
                out.failures.push(FileFailure { path: batch.path, error });
            }
        }
    }
    pool.wait_all()?;

    tracing::info!(
        files = files.len(),
        records = out.records.len(),
        failed_files = out.failures.len(),
        "ingestion complete"
    );
    Ok(out)
}
