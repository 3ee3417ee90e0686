use crate::cli::Args;
use crate::jobs::JOB_NAMES;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Defaults read from `--config`. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub input_dir: Option<String>,
    pub pattern: Option<String>,
    pub stop_words: Option<String>,
    pub output_dir: Option<String>,
    pub jobs: Option<Vec<String>>,
    pub workers: Option<usize>,
    pub read_workers: Option<usize>,
    /// Per-job result-size cap overrides.
    #[serde(default)]
    pub limits: BTreeMap<String, usize>,
}

impl FileConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("parse config TOML")
    }

    pub fn load(path: &str) -> Result<Self> {
        let raw = std::fs::read_to_string(path).with_context(|| format!("read config: {}", path))?;
        Self::from_toml_str(&raw).with_context(|| format!("in {}", path))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub input_dir: PathBuf,
    pub pattern: String,
    pub stop_words: PathBuf,
    pub output_dir: PathBuf,
    /// Jobs to run, in catalog order. Empty means all.
    pub jobs: Vec<String>,
    pub workers: usize,
    pub read_workers: Option<usize>,
    pub queue_cap: usize,
    pub metrics_interval: u64,
    pub no_write: bool,
    pub limits: BTreeMap<String, usize>,
}

impl Config {
    pub fn from_args(a: &Args) -> Result<Self> {
        let file = match &a.config {
            Some(p) => FileConfig::load(p)?,
            None => FileConfig::default(),
        };
        Self::resolve(a, file)
    }

    /// Merge flags over file defaults and validate.
    pub fn resolve(a: &Args, file: FileConfig) -> Result<Self> {
        let input_dir = a.input_dir.clone().or(file.input_dir).unwrap_or_default();
        if input_dir.is_empty() { bail!("--input-dir must not be empty"); }
        let pattern = a.pattern.clone().or(file.pattern).unwrap_or_else(|| "*.html".to_string());
        if let Err(e) = glob::Pattern::new(&pattern) { bail!("--pattern {:?} is not a valid glob: {}", pattern, e); }
        let stop_words = a.stop_words.clone().or(file.stop_words).unwrap_or_else(|| "stopwords.txt".to_string());
        if stop_words.is_empty() { bail!("--stop-words must not be empty"); }
        let output_dir = a.output_dir.clone().or(file.output_dir).unwrap_or_else(|| "charts".to_string());
        if output_dir.is_empty() { bail!("--output-dir must not be empty"); }

        let jobs: Vec<String> = match &a.jobs {
            Some(list) => list.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect(),
            None => file.jobs.unwrap_or_default(),
        };
        for name in jobs.iter().chain(file.limits.keys()) {
            if !JOB_NAMES.contains(&name.as_str()) {
                bail!("unknown job {:?}; known jobs: {}", name, JOB_NAMES.join(", "));
            }
        }

        let workers = a.workers.or(file.workers).unwrap_or_else(|| std::cmp::max(1, num_cpus::get().saturating_sub(2)));
        if workers == 0 { bail!("--workers must be greater than 0"); }
        let read_workers = a.read_workers.or(file.read_workers);
        if read_workers == Some(0) { bail!("--read-workers must be greater than 0"); }
        if a.queue_cap == 0 { bail!("--queue-cap must be greater than 0"); }

        Ok(Self {
            input_dir: PathBuf::from(input_dir),
            pattern,
            stop_words: PathBuf::from(stop_words),
            output_dir: PathBuf::from(output_dir),
            jobs,
            workers,
            read_workers,
            queue_cap: a.queue_cap,
            metrics_interval: a.metrics_interval,
            no_write: a.no_write,
            limits: file.limits,
        })
    }

    pub fn wants_job(&self, name: &str) -> bool {
        self.jobs.is_empty() || self.jobs.iter().any(|j| j == name)
    }
}
