use anyhow::{anyhow, Result};
use plotters::prelude::*;
use std::path::Path;

use crate::mapreduce::JobSpec;
use super::ReportRow;

const CHART_SIZE: (u32, u32) = (1024, 600);

/// One bar per row, in row order, labelled by `row.label`.
pub fn write_bar_chart(path: &Path, spec: &JobSpec, rows: &[ReportRow]) -> Result<()> {
    let draw_err = |e: &dyn std::fmt::Display| anyhow!("draw chart {:?}: {}", path, e);

    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(|e| draw_err(&e))?;

    let n = rows.len().max(1) as u32;
    let y_max = rows.iter().map(|r| r.value).fold(0f64, f64::max).max(1.0) * 1.1;
    let label_of = |x: &SegmentValue<u32>| match x {
        SegmentValue::CenterOf(i) => rows.get(*i as usize).map(|r| r.label.clone()).unwrap_or_default(),
        _ => String::new(),
    };

    let mut chart = ChartBuilder::on(&root)
        .caption(spec.title.as_str(), ("sans-serif", 28))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d((0u32..n).into_segmented(), 0f64..y_max)
        .map_err(|e| draw_err(&e))?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(rows.len().max(1))
        .x_label_formatter(&label_of)
        .x_desc(spec.x_label.as_str())
        .y_desc(spec.y_label.as_str())
        .draw()
        .map_err(|e| draw_err(&e))?;

    chart
        .draw_series(
            Histogram::vertical(&chart)
                .style(BLUE.mix(0.7).filled())
                .margin(4)
                .data(rows.iter().enumerate().map(|(i, r)| (i as u32, r.value))),
        )
        .map_err(|e| draw_err(&e))?;

    root.present().map_err(|e| draw_err(&e))?;
    Ok(())
}
