//! Result shaping for display: ordered slot rows, scalar summaries and
//! cumulative series.

use crate::domain::selector::{RankMetric, RankedSlot, rank_all};
use crate::domain::slot::SlotTable;
use crate::domain::walk_forward::{Mode, WalkForwardReport};
use chrono::NaiveDateTime;
use std::collections::BTreeMap;

/// Slot rows ordered best first by `metric`.
pub fn display_rows(stats: &SlotTable, metric: RankMetric) -> Vec<RankedSlot> {
    rank_all(stats, metric)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerformanceSummary {
    pub mean_pnl: f64,
    pub mean_pcr: f64,
    pub rows: usize,
}

impl PerformanceSummary {
    /// Mean of the row-level PnL and PCR values; `None` for no rows.
    pub fn of(rows: &[RankedSlot]) -> Option<Self> {
        if rows.is_empty() {
            return None;
        }
        let n = rows.len() as f64;
        Some(Self {
            mean_pnl: rows.iter().map(|r| r.stats.mean_pnl).sum::<f64>() / n,
            mean_pcr: rows.iter().map(|r| r.stats.mean_pcr).sum::<f64>() / n,
            rows: rows.len(),
        })
    }
}

/// `(forward segment end, cumulative PnL)` for one mode.
pub fn series_pairs(report: &WalkForwardReport, mode: Mode) -> Vec<(NaiveDateTime, f64)> {
    report
        .series
        .get(&mode)
        .map(|points| {
            points
                .iter()
                .map(|p| (p.forward.end, p.cumulative))
                .collect()
        })
        .unwrap_or_default()
}

/// One row of the anchored/unanchored side-by-side view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComparisonRow {
    pub timestamp: NaiveDateTime,
    pub anchored: Option<f64>,
    pub unanchored: Option<f64>,
}

pub fn compare_series(report: &WalkForwardReport) -> Vec<ComparisonRow> {
    let mut rows: BTreeMap<NaiveDateTime, ComparisonRow> = BTreeMap::new();
    for (timestamp, value) in series_pairs(report, Mode::Anchored) {
        rows.entry(timestamp)
            .or_insert_with(|| empty_row(timestamp))
            .anchored = Some(value);
    }
    for (timestamp, value) in series_pairs(report, Mode::Unanchored) {
        rows.entry(timestamp)
            .or_insert_with(|| empty_row(timestamp))
            .unanchored = Some(value);
    }
    rows.into_values().collect()
}

fn empty_row(timestamp: NaiveDateTime) -> ComparisonRow {
    ComparisonRow {
        timestamp,
        anchored: None,
        unanchored: None,
    }
}

/// Fixed-width text table of slot rows.
pub fn format_slot_table(rows: &[RankedSlot]) -> String {
    if rows.is_empty() {
        return "  (no slots)\n".to_string();
    }
    let mut output = String::new();
    output.push_str(&format!(
        "  {:<4} {:<28} {:>12} {:>10} {:>7}\n",
        "#", "Slot", "Mean PnL", "Mean PCR", "Count"
    ));
    for (i, row) in rows.iter().enumerate() {
        output.push_str(&format!(
            "  {:<4} {:<28} {:>12.2} {:>10.4} {:>7}\n",
            i + 1,
            row.key.to_string(),
            row.stats.mean_pnl,
            row.stats.mean_pcr,
            row.stats.count
        ));
    }
    output
}

/// Fixed-width text table of the cumulative series, one column per mode.
pub fn format_series_table(report: &WalkForwardReport) -> String {
    let mut output = String::new();

    if let Some(points) = report.series.get(&Mode::Fixed) {
        for p in points {
            output.push_str(&format!(
                "  fixed  {}  trades {:>5}  PnL {:>12.2}\n",
                p.forward, p.trades, p.cumulative
            ));
        }
    }

    let rows = compare_series(report);
    if rows.is_empty() {
        return output;
    }
    output.push_str(&format!(
        "  {:<16} {:>14} {:>14}\n",
        "Forward end", "Anchored", "Unanchored"
    ));
    for row in rows {
        output.push_str(&format!(
            "  {:<16} {:>14} {:>14}\n",
            row.timestamp.format("%Y-%m-%d %H:%M").to_string(),
            format_cell(row.anchored),
            format_cell(row.unanchored)
        ));
    }
    output
}

fn format_cell(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}", v),
        None => "-".to_string(),
    }
}
