use std::fmt;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use crate::error::ChatStatsError;
use crate::metrics::Metrics;
use crate::record::Record;
use crate::report::{rank, ReportRow};

/// Expands one record into zero or more keyed contributions. Must be pure.
pub type Mapper<K, V> = Box<dyn Fn(&Record) -> anyhow::Result<Vec<(K, V)>> + Send + Sync>;
/// Collapses every value seen under a key into one scalar. Must be pure and
/// must not depend on the order of `values`.
pub type Reducer<K, V, S> = Box<dyn Fn(&K, &[V]) -> anyhow::Result<S> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputKind {
    /// Ranked text listing, highest scalar first.
    Table,
    /// Bar chart over keys in ascending order.
    Chart,
}

/// Output metadata for a job. The engine only reads `name`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSpec {
    pub name: String,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub kind: OutputKind,
    pub max: Option<usize>,
    pub outfile: String,
}

/// Reduced value of a key.
pub trait Scalar: Copy + PartialOrd + fmt::Debug + Send + Sync + 'static {
    fn as_f64(self) -> f64;
    fn display(self) -> String;
}

impl Scalar for u64 {
    fn as_f64(self) -> f64 { self as f64 }
    fn display(self) -> String { self.to_string() }
}

impl Scalar for f64 {
    fn as_f64(self) -> f64 { self }
    fn display(self) -> String { format!("{:.2}", self) }
}

pub struct Job<K, V, S> {
    pub spec: JobSpec,
    pub mapper: Mapper<K, V>,
    pub reducer: Reducer<K, V, S>,
    pub label: fn(&K) -> String,
}

impl<K, V, S> Job<K, V, S> {
    pub fn new(
        spec: JobSpec,
        mapper: impl Fn(&Record) -> anyhow::Result<Vec<(K, V)>> + Send + Sync + 'static,
        reducer: impl Fn(&K, &[V]) -> anyhow::Result<S> + Send + Sync + 'static,
        label: fn(&K) -> String,
    ) -> Self {
        Self { spec, mapper: Box::new(mapper), reducer: Box::new(reducer), label }
    }
}

/// Type-erased job so a catalog can mix key and value types.
pub trait AnyJob: Send + Sync {
    fn spec(&self) -> &JobSpec;
    fn spec_mut(&mut self) -> &mut JobSpec;
    /// Run the job and return its ranked, capped, labelled rows.
    fn execute(&self, records: &[Record], metrics: &Metrics) -> Result<Vec<ReportRow>, ChatStatsError>;
}

impl<K, V, S> AnyJob for Job<K, V, S>
where
    K: Hash + Eq + Ord + Send + Sync,
    V: Send + Sync,
    S: Scalar,
{
    fn spec(&self) -> &JobSpec { &self.spec }

    fn spec_mut(&mut self) -> &mut JobSpec { &mut self.spec }

    fn execute(&self, records: &[Record], metrics: &Metrics) -> Result<Vec<ReportRow>, ChatStatsError> {
        let result = super::run_with_metrics(self, records, metrics)?;
        let rows = rank(result, self.spec.kind, self.spec.max)
            .into_iter()
            .map(|(k, s)| ReportRow { label: (self.label)(&k), value: s.as_f64(), display: s.display() })
            .collect();
        Ok(rows)
    }
}
