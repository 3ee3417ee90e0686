//! Day-partitioned chat log statistics: rebuild speaker-attributed records
//! from HTML logs, then run map-reduce jobs over them.

pub mod cli;
pub mod config;
pub mod error;
pub mod ingest;
pub mod jobs;
pub mod mapreduce;
pub mod markup;
pub mod metrics;
pub mod pipeline;
pub mod record;
pub mod report;
pub mod scanner;
pub mod tokenizer;

pub use error::{ChatStatsError, FileFailure};
pub use mapreduce::{run, AggregationResult, AnyJob, Job, JobSpec, OutputKind};
pub use record::{parse_line, Record};
