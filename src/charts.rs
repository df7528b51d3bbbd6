//! Charting facility boundary.
//!
//! Each panel hands this module a chart kind with axis/color bindings and a
//! small table of pre-formatted cells. Rendering is a terminal surface: the
//! bindings plus a markdown-style table. Histogram bucketing lives on this
//! side of the boundary; the aggregators only supply raw values.

use crate::util::format_int;
use log::debug;
use serde::Serialize;
use tabled::builder::Builder;
use tabled::settings::Style;

/// Rows shown per panel; the rest is summarized with a count line.
const PREVIEW_ROWS: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Line,
    Bar,
    Scatter,
    Histogram,
    Heatmap,
}

impl ChartKind {
    fn label(self) -> &'static str {
        match self {
            ChartKind::Line => "line",
            ChartKind::Bar => "bar",
            ChartKind::Scatter => "scatter",
            ChartKind::Histogram => "histogram",
            ChartKind::Heatmap => "heatmap",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub title: String,
    pub x: String,
    pub y: String,
    pub color: Option<String>,
}

impl ChartSpec {
    pub fn new(kind: ChartKind, title: impl Into<String>, x: &str, y: &str) -> Self {
        ChartSpec {
            kind,
            title: title.into(),
            x: x.to_string(),
            y: y.to_string(),
            color: None,
        }
    }

    pub fn with_color(mut self, color: &str) -> Self {
        self.color = Some(color.to_string());
        self
    }
}

/// The derived table backing one chart: column labels plus formatted cells.
#[derive(Debug, Clone)]
pub struct ChartTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ChartTable {
    pub fn new(columns: Vec<String>) -> Self {
        ChartTable {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }
}

#[derive(Serialize)]
struct ChartPayload<'a> {
    #[serde(flatten)]
    spec: &'a ChartSpec,
    columns: &'a [String],
    row_count: usize,
}

/// Render one panel. An empty table renders as `(no rows)`; an empty city
/// subset must never fail a render pass.
pub fn render(spec: &ChartSpec, table: &ChartTable) {
    println!("[{}] {}", spec.kind.label(), spec.title);
    match &spec.color {
        Some(color) => println!("x: {} | y: {} | color: {}", spec.x, spec.y, color),
        None => println!("x: {} | y: {}", spec.x, spec.y),
    }
    let payload = ChartPayload {
        spec,
        columns: &table.columns,
        row_count: table.rows.len(),
    };
    if let Ok(json) = serde_json::to_string(&payload) {
        debug!("chart payload: {}", json);
    }
    if table.rows.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let mut builder = Builder::default();
    builder.push_record(table.columns.clone());
    for row in table.rows.iter().take(PREVIEW_ROWS) {
        builder.push_record(row.clone());
    }
    println!("{}", builder.build().with(Style::markdown()).to_string());
    if table.rows.len() > PREVIEW_ROWS {
        println!(
            "({} more rows)",
            format_int((table.rows.len() - PREVIEW_ROWS) as i64)
        );
    }
    println!();
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Bucket values into `bins` equal-width bins spanning min..max. The upper
/// edge of the last bin is inclusive so the maximum lands in a bin. All-
/// equal input collapses to a single bin holding every value.
pub fn histogram_bins(values: &[f64], bins: usize) -> Vec<HistogramBin> {
    if values.is_empty() || bins == 0 {
        return Vec::new();
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max <= min {
        return vec![HistogramBin {
            lower: min,
            upper: max,
            count: values.len(),
        }];
    }
    let width = (max - min) / bins as f64;
    let mut out: Vec<HistogramBin> = (0..bins)
        .map(|i| HistogramBin {
            lower: min + i as f64 * width,
            upper: min + (i + 1) as f64 * width,
            count: 0,
        })
        .collect();
    for v in values {
        let idx = (((v - min) / width) as usize).min(bins - 1);
        out[idx].count += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bins_cover_range_and_counts_sum() {
        let values: Vec<f64> = (0..90).map(|i| i as f64).collect();
        let bins = histogram_bins(&values, 30);
        assert_eq!(bins.len(), 30);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), values.len());
        assert_eq!(bins[0].lower, 0.0);
        assert!((bins[29].upper - 89.0).abs() < 1e-9);
    }

    #[test]
    fn maximum_value_lands_in_last_bin() {
        let bins = histogram_bins(&[1.0, 2.0, 3.0, 4.0], 2);
        assert_eq!(bins[0].count, 2);
        assert_eq!(bins[1].count, 2);
    }

    #[test]
    fn constant_values_collapse_to_one_bin() {
        let bins = histogram_bins(&[5.0, 5.0, 5.0], 30);
        assert_eq!(bins.len(), 1);
        assert_eq!(bins[0].count, 3);
    }

    #[test]
    fn empty_input_yields_no_bins() {
        assert!(histogram_bins(&[], 30).is_empty());
    }
}
