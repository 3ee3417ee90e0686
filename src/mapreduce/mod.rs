use rayon::prelude::*;
use std::collections::HashMap;
use std::hash::Hash;
use std::time::Instant;

use crate::error::ChatStatsError;
use crate::metrics::Metrics;
use crate::record::Record;

pub mod job;
pub use job::{AnyJob, Job, JobSpec, Mapper, OutputKind, Reducer, Scalar};

/// Reduced scalar per key. Iteration order carries no meaning.
pub type AggregationResult<K, S> = HashMap<K, S>;

pub fn run<K, V, S>(job: &Job<K, V, S>, records: &[Record]) -> Result<AggregationResult<K, S>, ChatStatsError>
where
    K: Hash + Eq + Send + Sync,
    V: Send + Sync,
    S: Send,
{
    run_with_metrics(job, records, &Metrics::new())
}

/// Parallel map, single-threaded grouping, parallel reduce.
///
/// The first mapper or reducer error aborts the job; nothing partial is
/// returned. Runs on whichever rayon pool the caller is installed in.
pub fn run_with_metrics<K, V, S>(
    job: &Job<K, V, S>,
    records: &[Record],
    metrics: &Metrics,
) -> Result<AggregationResult<K, S>, ChatStatsError>
where
    K: Hash + Eq + Send + Sync,
    V: Send + Sync,
    S: Send,
{
    let name = job.spec.name.as_str();

    let t_map = Instant::now();
    let mapped: Vec<Vec<(K, V)>> = records
        .par_iter()
        .map(|r| (job.mapper)(r))
        .collect::<anyhow::Result<_>>()
        .map_err(|e| ChatStatsError::job_execution(name, e.context("map stage")))?;
    metrics.add_map_time(t_map.elapsed().as_nanos() as u64);

    let t_group = Instant::now();
    let mut pairs = 0u64;
    let mut groups: HashMap<K, Vec<V>> = HashMap::new();
    for (k, v) in mapped.into_iter().flatten() {
        pairs += 1;
        groups.entry(k).or_default().push(v);
    }
    metrics.add_group_time(t_group.elapsed().as_nanos() as u64);
    metrics.inc_pairs(pairs);
    metrics.inc_keys(groups.len() as u64);

    let t_reduce = Instant::now();
    let result = groups
        .into_par_iter()
        .map(|(k, values)| -> anyhow::Result<(K, S)> {
            let s = (job.reducer)(&k, values.as_slice())?;
            Ok((k, s))
        })
        .collect::<anyhow::Result<AggregationResult<K, S>>>()
        .map_err(|e| ChatStatsError::job_execution(name, e.context("reduce stage")))?;
    metrics.add_reduce_time(t_reduce.elapsed().as_nanos() as u64);

    tracing::debug!(job = name, records = records.len(), pairs = pairs, keys = result.len(), "job reduced");
    Ok(result)
}
