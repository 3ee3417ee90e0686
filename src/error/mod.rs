use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures raised while ingesting logs, running jobs, or writing reports.
///
/// Ingestion errors are scoped to one file and job errors to one job; the
/// pipeline keeps going past them and reports everything at the end.
#[derive(Debug, Error)]
pub enum ChatStatsError {
    #[error("log entry does not start with HH:MM: {line:?}")]
    MalformedLine { line: String },
    #[error("no YYYY-MM-DD date in file name: {}", path.display())]
    InvalidFilename { path: PathBuf },
    #[error("read log {}: {source}", path.display())]
    ReadLog {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("job '{job}' failed: {reason}")]
    JobExecution { job: String, reason: String },
    #[error("render report for job '{job}': {reason}")]
    Render { job: String, reason: String },
    #[error("stop-word file {} could not be loaded: {source}", path.display())]
    MissingStopWordFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ChatStatsError {
    pub fn job_execution(job: &str, err: anyhow::Error) -> Self {
        Self::JobExecution { job: job.to_string(), reason: format!("{:#}", err) }
    }

    pub fn render(job: &str, err: anyhow::Error) -> Self {
        Self::Render { job: job.to_string(), reason: format!("{:#}", err) }
    }
}

/// An ingestion failure together with the file it happened in.
#[derive(Debug)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: ChatStatsError,
}

impl std::fmt::Display for FileFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.error)
    }
}
