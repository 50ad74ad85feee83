//! CSV report adapter.
//!
//! Writes one file per result table into an output directory:
//! `lookback.csv` (slots chosen on the lookback window), `forward.csv`
//! (fixed mode only) and `series.csv` (one row per cycle per mode).

use crate::domain::error::SlotwalkError;
use crate::domain::selector::RankedSlot;
use crate::domain::walk_forward::{CyclePoint, Mode, WalkForwardReport};
use crate::ports::report_port::ReportPort;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Default)]
pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Serialize)]
struct SlotRow {
    rank: usize,
    period: String,
    day: String,
    time: String,
    mean_pnl: f64,
    mean_pcr: f64,
    count: usize,
}

impl SlotRow {
    fn from_ranked(rank: usize, slot: &RankedSlot) -> Self {
        Self {
            rank,
            period: slot.key.period.map(|p| p.to_string()).unwrap_or_default(),
            day: slot.key.day.map(|d| d.to_string()).unwrap_or_default(),
            time: slot.key.time.to_string(),
            mean_pnl: slot.stats.mean_pnl,
            mean_pcr: slot.stats.mean_pcr,
            count: slot.stats.count,
        }
    }
}

#[derive(Serialize)]
struct SeriesRow {
    mode: String,
    cycle: usize,
    lookback_start: String,
    lookback_end: String,
    forward_start: String,
    forward_end: String,
    selected: String,
    trades: usize,
    pnl: f64,
    cumulative: f64,
}

impl SeriesRow {
    fn from_point(mode: Mode, p: &CyclePoint) -> Self {
        Self {
            mode: mode.to_string(),
            cycle: p.cycle,
            lookback_start: p.lookback.start.format(TIMESTAMP_FORMAT).to_string(),
            lookback_end: p.lookback.end.format(TIMESTAMP_FORMAT).to_string(),
            forward_start: p.forward.start.format(TIMESTAMP_FORMAT).to_string(),
            forward_end: p.forward.end.format(TIMESTAMP_FORMAT).to_string(),
            selected: p
                .selected
                .iter()
                .map(|k| k.to_string())
                .collect::<Vec<_>>()
                .join("; "),
            trades: p.trades,
            pnl: p.pnl,
            cumulative: p.cumulative,
        }
    }
}

fn write_rows<T: Serialize>(path: &Path, rows: &[T], headers: &[&str]) -> Result<(), SlotwalkError> {
    let to_data = |e: csv::Error| SlotwalkError::Data {
        reason: format!("failed to write {}: {}", path.display(), e),
    };
    // serde derives the header from the first record, so empty tables need it spelled out.
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(!rows.is_empty())
        .from_path(path)
        .map_err(to_data)?;
    if rows.is_empty() {
        wtr.write_record(headers).map_err(to_data)?;
    }
    for row in rows {
        wtr.serialize(row).map_err(to_data)?;
    }
    wtr.flush()?;
    Ok(())
}

const SLOT_HEADERS: &[&str] = &["rank", "period", "day", "time", "mean_pnl", "mean_pcr", "count"];
const SERIES_HEADERS: &[&str] = &[
    "mode",
    "cycle",
    "lookback_start",
    "lookback_end",
    "forward_start",
    "forward_end",
    "selected",
    "trades",
    "pnl",
    "cumulative",
];

fn slot_rows(slots: &[RankedSlot]) -> Vec<SlotRow> {
    slots
        .iter()
        .enumerate()
        .map(|(i, s)| SlotRow::from_ranked(i + 1, s))
        .collect()
}

impl ReportPort for CsvReportAdapter {
    fn write(
        &self,
        report: &WalkForwardReport,
        output: &Path,
    ) -> Result<Vec<PathBuf>, SlotwalkError> {
        fs::create_dir_all(output)?;
        let mut written = Vec::new();

        let lookback = output.join("lookback.csv");
        write_rows(&lookback, &slot_rows(&report.lookback.slots), SLOT_HEADERS)?;
        written.push(lookback);

        if let Some(forward_table) = &report.forward_table {
            let forward = output.join("forward.csv");
            write_rows(&forward, &slot_rows(forward_table), SLOT_HEADERS)?;
            written.push(forward);
        }

        let series: Vec<SeriesRow> = report
            .series
            .iter()
            .flat_map(|(mode, points)| points.iter().map(|p| SeriesRow::from_point(*mode, p)))
            .collect();
        let series_path = output.join("series.csv");
        write_rows(&series_path, &series, SERIES_HEADERS)?;
        written.push(series_path);

        tracing::info!(dir = %output.display(), files = written.len(), "report written");
        Ok(written)
    }
}
