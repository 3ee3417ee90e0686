use anyhow::{Context, Result};
use crossbeam_channel::bounded;
use rayon::prelude::*;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::error::{ChatStatsError, FileFailure};
use crate::ingest::ingest_all;
use crate::jobs::catalog;
use crate::mapreduce::AnyJob;
use crate::metrics::{spawn_stdout_reporter, Metrics};
use crate::record::Record;
use crate::report::{render, ReportRow};
use crate::tokenizer::StopWords;

/// Result of one job: its rows and, unless `--no-write`, where they were written.
#[derive(Debug)]
pub struct JobOutcome {
    pub name: String,
    pub rows: Vec<ReportRow>,
    pub output: Option<PathBuf>,
}

/// Everything a run produced, successes and failures alike.
#[derive(Debug, Default)]
pub struct RunReport {
    pub records: usize,
    pub jobs: Vec<JobOutcome>,
    pub file_failures: Vec<FileFailure>,
    pub job_failures: Vec<ChatStatsError>,
}

impl RunReport {
    pub fn failure_count(&self) -> usize {
        self.file_failures.len() + self.job_failures.len()
    }
}

/// Selected catalog jobs with configured caps applied.
pub fn select_jobs(cfg: &Config, stop_words: Arc<StopWords>) -> Vec<Box<dyn AnyJob>> {
    catalog(stop_words)
        .into_iter()
        .filter(|j| cfg.wants_job(&j.spec().name))
        .map(|mut j| {
            if let Some(&max) = cfg.limits.get(&j.spec().name) {
                j.spec_mut().max = Some(max);
            }
            j
        })
        .collect()
}

/// Run every job over the same records, concurrently. Each job's failure is
/// returned in its own slot and does not touch the others.
pub fn run_jobs(
    jobs: &[Box<dyn AnyJob>],
    records: &[Record],
    cfg: &Config,
    metrics: &Metrics,
) -> Vec<Result<JobOutcome, ChatStatsError>> {
    jobs.par_iter()
        .map(|job| -> Result<JobOutcome, ChatStatsError> {
            let spec = job.spec();
            let t0 = Instant::now();
            let rows = job.execute(records, metrics)?;
            tracing::info!(job = spec.name.as_str(), rows = rows.len(), elapsed_ms = t0.elapsed().as_millis() as u64, "job finished");

            let output = if cfg.no_write {
                None
            } else {
                let t1 = Instant::now();
                let path = render(&cfg.output_dir, spec, &rows).map_err(|e| ChatStatsError::render(&spec.name, e))?;
                metrics.add_render_time(t1.elapsed().as_nanos() as u64);
                tracing::info!(job = spec.name.as_str(), output = ?path, "report written");
                Some(path)
            };
            Ok(JobOutcome { name: spec.name.clone(), rows, output })
        })
        .collect()
}

pub fn run(cfg: Config, files: Vec<PathBuf>) -> Result<RunReport> {
    // fatal: no tokenization can happen without it
    let stop_words = Arc::new(StopWords::load(&cfg.stop_words)?);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(cfg.workers)
        .thread_name(|i| format!("chatstats-worker-{}", i))
        .build()
        .context("build worker pool")?;
    let read_workers = cfg.read_workers.unwrap_or_else(|| 4.min(files.len()).max(1));
    tracing::info!(workers = cfg.workers, read_workers = read_workers, files = files.len(), "pipeline configuration");

    let metrics = Arc::new(Metrics::new());
    let (shutdown_tx, shutdown_rx) = bounded::<()>(1);
    let reporter_handle = if cfg.metrics_interval > 0 {
        Some(spawn_stdout_reporter(metrics.clone(), Duration::from_secs(cfg.metrics_interval), shutdown_rx))
    } else {
        None
    };

    let ingested = ingest_all(files, read_workers, cfg.queue_cap, metrics.clone())?;
    let jobs = select_jobs(&cfg, stop_words);

    let mut report = RunReport {
        records: ingested.records.len(),
        file_failures: ingested.failures,
        ..RunReport::default()
    };

    let results = pool.install(|| run_jobs(&jobs, &ingested.records, &cfg, &metrics));
    for res in results {
        metrics.inc_jobs(1);
        match res {
            Ok(outcome) => report.jobs.push(outcome),
            Err(e) => {
                metrics.inc_failed_jobs(1);
                report.job_failures.push(e);
            }
        }
    }

    if let Some(h) = reporter_handle {
        let _ = shutdown_tx.send(());
        let _ = h.join();
    }

    for f in &report.file_failures {
        tracing::error!(file = ?f.path, error = %f.error, "file skipped");
    }
    for e in &report.job_failures {
        tracing::error!(error = %e, "job failed");
    }
    print_final_summary(&metrics);
    Ok(report)
}

fn print_final_summary(metrics: &Metrics) {
    let elapsed_precise = metrics.elapsed_precise();
    let records = metrics.records_total.load(Ordering::Relaxed);
    let records_per_sec = if elapsed_precise > 0.0 { records as f64 / elapsed_precise } else { 0.0 };

    tracing::info!(
        component = "summary",
        elapsed_ms = metrics.uptime_millis() as u64,
        elapsed_secs = format!("{:.3}", elapsed_precise).as_str(),
        files_total = metrics.files_total.load(Ordering::Relaxed),
        failed_files_total = metrics.failed_files_total.load(Ordering::Relaxed),
        records_total = records,
        jobs_total = metrics.jobs_total.load(Ordering::Relaxed),
        failed_jobs_total = metrics.failed_jobs_total.load(Ordering::Relaxed),
        records_per_sec = format!("{:.0}", records_per_sec).as_str(),
        "run summary"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Args;
    use crate::config::FileConfig;
    use crate::jobs::top_speakers;
    use crate::mapreduce::{Job, JobSpec, OutputKind};
    use chrono::NaiveDate;
    use clap::Parser;

    fn speaker_label(k: &String) -> String {
        k.clone()
    }

    fn failing_job() -> Job<String, u64, u64> {
        let spec = JobSpec {
            name: "broken".into(),
            title: "Broken".into(),
            x_label: "x".into(),
            y_label: "y".into(),
            kind: OutputKind::Table,
            max: None,
            outfile: "broken".into(),
        };
        Job::new(
            spec,
            |_r: &Record| -> anyhow::Result<Vec<(String, u64)>> { anyhow::bail!("cannot map record") },
            |_k: &String, vs: &[u64]| Ok(vs.iter().sum()),
            speaker_label,
        )
    }

    #[test]
    fn limits_override_catalog_caps() {
        let args = Args::try_parse_from(["chatstats", "--input-dir", "x", "--jobs", "top-words,thanks"]).unwrap();
        let file = FileConfig::from_toml_str("[limits]\nthanks = 3\n").unwrap();
        let cfg = Config::resolve(&args, file).unwrap();
        let jobs = select_jobs(&cfg, Arc::new(StopWords::default()));
        let caps: Vec<_> = jobs.iter().map(|j| (j.spec().name.clone(), j.spec().max)).collect();
        assert_eq!(caps, vec![("top-words".to_string(), Some(100)), ("thanks".to_string(), Some(3))]);
    }

    #[test]
    fn a_failing_job_does_not_affect_its_siblings() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("charts");
        let out_arg = out.to_string_lossy().into_owned();
        let args = Args::try_parse_from(["chatstats", "--input-dir", "x", "--output-dir", out_arg.as_str()]).unwrap();
        let cfg = Config::resolve(&args, FileConfig::default()).unwrap();

        let t = NaiveDate::from_ymd_opt(2010, 1, 1).unwrap().and_hms_opt(10, 0, 0).unwrap();
        let records = vec![
            Record { time: t, text: "one".into(), user: Some("a".into()) },
            Record { time: t, text: "two".into(), user: Some("b".into()) },
            Record { time: t, text: "three".into(), user: Some("a".into()) },
        ];
        let jobs: Vec<Box<dyn AnyJob>> = vec![Box::new(top_speakers()), Box::new(failing_job()), Box::new(top_speakers())];

        let results = run_jobs(&jobs, &records, &cfg, &Metrics::new());
        assert_eq!(results.len(), 3);
        for i in [0, 2] {
            let outcome = results[i].as_ref().unwrap();
            assert_eq!(outcome.name, "top-speakers");
            assert_eq!(outcome.rows[0].label, "a");
            assert_eq!(outcome.rows[0].display, "2");
            assert_eq!(outcome.output.as_deref(), Some(out.join("top-speakers.txt").as_path()));
        }
        match &results[1] {
            Err(ChatStatsError::JobExecution { job, reason }) => {
                assert_eq!(job, "broken");
                assert!(reason.contains("cannot map record"), "{reason}");
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(out.join("top-speakers.txt").exists());
        assert!(!out.join("broken.txt").exists());
    }
}
