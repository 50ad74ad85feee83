//! Walk-forward evaluation.
//!
//! Each cycle selects slots on a lookback window and books the PnL of the
//! following forward segment. Anchored and unanchored cycles match forward
//! trades on time of day alone.
//!
//! - Fixed: one lookback, one explicit forward window; forward trades match
//!   on the full selected key (weekday included when slots are keyed by it).
//! - Anchored: lookback start fixed, lookback end advances one step per cycle.
//! - Unanchored: lookback start and end both advance one step per cycle.
//!
//! Cycle boundaries are `b_k = lookback.end + k steps`, measured from the
//! original end so month-end clamping never accumulates. Cycle `k` books
//! trades with `b_k < entry_time <= b_{k+1}` and only runs when
//! `b_{k+1}` is not past the last trade.

use crate::domain::aggregate::aggregate;
use crate::domain::error::SlotwalkError;
use crate::domain::normalize::NormalizedTable;
use crate::domain::selector::{RankMetric, RankedSlot, Selection, SelectionConfig, rank_all};
use crate::domain::slot::SlotKey;
use crate::domain::trade::{NormalizedTrade, TimeSlot};
use crate::domain::window::{Period, WindowSpec};
use chrono::{Duration, NaiveDateTime};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Mode {
    Fixed,
    Anchored,
    Unanchored,
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fixed" => Ok(Mode::Fixed),
            "anchored" | "expanding" => Ok(Mode::Anchored),
            "unanchored" | "rolling" => Ok(Mode::Unanchored),
            other => Err(format!(
                "unknown mode '{}' (expected fixed, anchored or unanchored)",
                other
            )),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Fixed => f.write_str("fixed"),
            Mode::Anchored => f.write_str("anchored"),
            Mode::Unanchored => f.write_str("unanchored"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WalkForwardConfig {
    pub lookback: WindowSpec,
    /// Required for [`Mode::Fixed`], ignored otherwise.
    pub forward: Option<WindowSpec>,
    pub modes: BTreeSet<Mode>,
    pub selection: SelectionConfig,
    pub step: Period,
}

impl WalkForwardConfig {
    pub fn new(lookback: WindowSpec, selection: SelectionConfig) -> Self {
        Self {
            lookback,
            forward: None,
            modes: BTreeSet::from([Mode::Anchored]),
            selection,
            step: Period::Month,
        }
    }

    pub fn with_modes(self, modes: &[Mode]) -> Self {
        Self {
            modes: modes.iter().copied().collect(),
            ..self
        }
    }

    pub fn with_forward(self, forward: WindowSpec) -> Self {
        Self {
            forward: Some(forward),
            ..self
        }
    }

    pub fn with_step(self, step: Period) -> Self {
        Self { step, ..self }
    }

    /// Checks the parameters against the data span before anything runs.
    pub fn validate(&self, table: &NormalizedTable) -> Result<(), SlotwalkError> {
        self.selection.validate()?;
        if self.modes.is_empty() {
            return Err(SlotwalkError::configuration("no walk-forward mode requested"));
        }
        let Some(max) = table.max_entry_time() else {
            return Err(SlotwalkError::configuration("trade log is empty"));
        };
        if self.lookback.is_empty() {
            return Err(SlotwalkError::configuration(format!(
                "lookback window {} ends before it starts",
                self.lookback
            )));
        }
        let cycles = self.modes.iter().any(|m| *m != Mode::Fixed);
        if cycles && !self.lookback.spans(self.step) {
            return Err(SlotwalkError::configuration(format!(
                "lookback window {} is shorter than one {}",
                self.lookback, self.step
            )));
        }

        if self.modes.contains(&Mode::Fixed) {
            match self.forward {
                None => {
                    return Err(SlotwalkError::configuration(
                        "fixed mode requires a forward window",
                    ));
                }
                Some(fw) if fw.is_empty() => {
                    return Err(SlotwalkError::configuration(format!(
                        "forward window {} ends before it starts",
                        fw
                    )));
                }
                Some(_) => {}
            }
        }

        if cycles {
            let first_forward_end = self.boundary(1);
            if first_forward_end.is_none_or(|end| end > max) {
                return Err(SlotwalkError::configuration(format!(
                    "data ends {} which leaves less than one {} after the lookback window",
                    max.format("%Y-%m-%d %H:%M"),
                    self.step
                )));
            }
        }
        Ok(())
    }

    /// `b_k`: the lookback end moved `k` steps forward.
    fn boundary(&self, k: u32) -> Option<NaiveDateTime> {
        let tick = Duration::nanoseconds(1);
        self.step
            .advance(self.lookback.end + tick, k)
            .map(|t| t - tick)
    }

    fn lookback_for(&self, mode: Mode, k: u32, boundary: NaiveDateTime) -> Option<WindowSpec> {
        let start = match mode {
            Mode::Unanchored => self.step.advance(self.lookback.start, k)?,
            Mode::Fixed | Mode::Anchored => self.lookback.start,
        };
        Some(WindowSpec::new(start, boundary))
    }
}

/// One lookback → forward cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CyclePoint {
    pub cycle: usize,
    pub lookback: WindowSpec,
    pub forward: WindowSpec,
    pub selected: Vec<SlotKey>,
    /// Forward trades at a selected time of day.
    pub trades: usize,
    pub pnl: f64,
    pub cumulative: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WalkForwardReport {
    pub metric: RankMetric,
    pub lookback_window: WindowSpec,
    /// Selection on the configured lookback window.
    pub lookback: Selection,
    /// Fixed mode only: forward statistics of the selected slots, best first.
    pub forward_table: Option<Vec<RankedSlot>>,
    pub series: BTreeMap<Mode, Vec<CyclePoint>>,
}

impl WalkForwardReport {
    pub fn final_cumulative(&self, mode: Mode) -> Option<f64> {
        self.series
            .get(&mode)
            .and_then(|points| points.last())
            .map(|p| p.cumulative)
    }
}

/// Runs every requested mode over `table`.
pub fn run_walk_forward(
    table: &NormalizedTable,
    config: &WalkForwardConfig,
) -> Result<WalkForwardReport, SlotwalkError> {
    config.validate(table)?;
    let max = table
        .max_entry_time()
        .ok_or_else(|| SlotwalkError::configuration("trade log is empty"))?;

    let lookback = config.selection.select(table, &config.lookback);
    let mut report = WalkForwardReport {
        metric: config.selection.metric,
        lookback_window: config.lookback,
        lookback,
        forward_table: None,
        series: BTreeMap::new(),
    };

    for &mode in &config.modes {
        let points = match mode {
            Mode::Fixed => {
                let (point, forward_table) = run_fixed(table, config, &report.lookback)?;
                report.forward_table = Some(forward_table);
                vec![point]
            }
            Mode::Anchored | Mode::Unanchored => run_cycles(table, config, mode, max),
        };
        tracing::info!(
            mode = %mode,
            cycles = points.len(),
            cumulative = points.last().map(|p| p.cumulative).unwrap_or(0.0),
            "walk-forward complete"
        );
        report.series.insert(mode, points);
    }
    Ok(report)
}

fn run_fixed(
    table: &NormalizedTable,
    config: &WalkForwardConfig,
    selection: &Selection,
) -> Result<(CyclePoint, Vec<RankedSlot>), SlotwalkError> {
    let forward = config
        .forward
        .ok_or_else(|| SlotwalkError::configuration("fixed mode requires a forward window"))?;

    let keys = selection.keys();
    let schema = config.selection.schema();
    let (pnl, trades) = table
        .in_window(&forward)
        .iter()
        .filter(|t| keys.contains(&schema.key_for(t)))
        .fold((0.0, 0), |(sum, n), t| (sum + t.pnl(), n + 1));
    let point = CyclePoint {
        cycle: 0,
        lookback: config.lookback,
        forward,
        selected: selection.slots.iter().map(|s| s.key).collect(),
        trades,
        pnl,
        cumulative: pnl,
    };

    let mut forward_stats = aggregate(table, &forward, schema);
    forward_stats.retain(|key, _| keys.contains(key));
    Ok((point, rank_all(&forward_stats, config.selection.metric)))
}

fn run_cycles(
    table: &NormalizedTable,
    config: &WalkForwardConfig,
    mode: Mode,
    max: NaiveDateTime,
) -> Vec<CyclePoint> {
    let mut points = Vec::new();
    let mut cumulative = 0.0;
    let mut k: u32 = 0;

    loop {
        let (Some(boundary), Some(next)) = (config.boundary(k), config.boundary(k + 1)) else {
            break;
        };
        if next > max {
            break;
        }
        let Some(lookback) = config.lookback_for(mode, k, boundary) else {
            break;
        };

        let selection = config.selection.select(table, &lookback);
        let forward = WindowSpec::new(boundary + Duration::nanoseconds(1), next);
        let (pnl, trades) = forward_pnl(table.in_window(&forward), &selection.times());
        cumulative += pnl;

        tracing::debug!(
            mode = %mode,
            cycle = k,
            lookback = %lookback,
            forward = %forward,
            selected = selection.len(),
            trades,
            pnl,
            "cycle"
        );

        points.push(CyclePoint {
            cycle: k as usize,
            lookback,
            forward,
            selected: selection.slots.iter().map(|s| s.key).collect(),
            trades,
            pnl,
            cumulative,
        });
        k += 1;
    }
    points
}

/// Sum of PnL and count of trades whose time of day is in `times`.
fn forward_pnl(trades: &[NormalizedTrade], times: &BTreeSet<TimeSlot>) -> (f64, usize) {
    trades
        .iter()
        .filter(|t| times.contains(&t.calendar.time_of_day))
        .fold((0.0, 0), |(sum, n), t| (sum + t.pnl(), n + 1))
}
