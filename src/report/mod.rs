use anyhow::{Context, Result};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::mapreduce::{JobSpec, OutputKind, Scalar};

pub mod chart;

/// One rendered line of a report.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub label: String,
    pub value: f64,
    pub display: String,
}

/// Order a job result for output and apply the size cap.
///
/// Tables go highest scalar first with ties broken by ascending key; charts
/// go by ascending key.
pub fn rank<K: Ord, S: Scalar>(result: HashMap<K, S>, kind: OutputKind, max: Option<usize>) -> Vec<(K, S)> {
    let mut rows: Vec<(K, S)> = result.into_iter().collect();
    match kind {
        OutputKind::Table => rows.sort_by(|a, b| {
            b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal).then_with(|| a.0.cmp(&b.0))
        }),
        OutputKind::Chart => rows.sort_by(|a, b| a.0.cmp(&b.0)),
    }
    if let Some(max) = max {
        rows.truncate(max);
    }
    rows
}

pub fn output_path(output_dir: &Path, spec: &JobSpec) -> PathBuf {
    let ext = match spec.kind {
        OutputKind::Table => "txt",
        OutputKind::Chart => "png",
    };
    output_dir.join(format!("{}.{}", spec.outfile, ext))
}

/// Write the report for one job and return where it landed.
pub fn render(output_dir: &Path, spec: &JobSpec, rows: &[ReportRow]) -> Result<PathBuf> {
    fs::create_dir_all(output_dir).with_context(|| format!("create output dir: {:?}", output_dir))?;
    let path = output_path(output_dir, spec);
    match spec.kind {
        OutputKind::Table => write_table(&path, spec, rows)?,
        OutputKind::Chart => chart::write_bar_chart(&path, spec, rows)?,
    }
    Ok(path)
}

pub fn write_table(path: &Path, spec: &JobSpec, rows: &[ReportRow]) -> Result<()> {
    let f = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(path)
        .with_context(|| format!("open table: {:?}", path))?;
    let mut w = BufWriter::new(f);
    writeln!(w, "{}", spec.title)?;
    writeln!(w, "{}\t{}", spec.x_label, spec.y_label)?;
    for (i, row) in rows.iter().enumerate() {
        writeln!(w, "{}. {}\t{}", i + 1, row.label, row.display)?;
    }
    w.flush().with_context(|| format!("flush table: {:?}", path))?;
    Ok(())
}
