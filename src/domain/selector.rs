//! Top-slot selection.
//!
//! Ranks aggregated slots by mean PnL or mean PCR. Ties on the metric are
//! broken by ascending [`SlotKey`], so selections are reproducible.

use crate::domain::aggregate::aggregate;
use crate::domain::error::SlotwalkError;
use crate::domain::normalize::NormalizedTable;
use crate::domain::slot::{KeySchema, MeanAccumulator, SlotKey, SlotStats, SlotTable};
use crate::domain::trade::TimeSlot;
use crate::domain::window::{Period, PeriodKey, WindowSpec};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RankMetric {
    Pnl,
    Pcr,
}

impl RankMetric {
    pub fn value(self, stats: &SlotStats) -> f64 {
        match self {
            RankMetric::Pnl => stats.mean_pnl,
            RankMetric::Pcr => stats.mean_pcr,
        }
    }
}

impl FromStr for RankMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pnl" => Ok(RankMetric::Pnl),
            "pcr" => Ok(RankMetric::Pcr),
            other => Err(format!("unknown rank metric '{}' (expected PnL or PCR)", other)),
        }
    }
}

impl fmt::Display for RankMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RankMetric::Pnl => f.write_str("PnL"),
            RankMetric::Pcr => f.write_str("PCR"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedSlot {
    pub key: SlotKey,
    pub stats: SlotStats,
}

/// Descending by metric, then ascending by key.
pub fn rank_order(metric: RankMetric, a: &RankedSlot, b: &RankedSlot) -> Ordering {
    metric
        .value(&b.stats)
        .total_cmp(&metric.value(&a.stats))
        .then_with(|| a.key.cmp(&b.key))
}

/// Every slot of `stats`, best first.
pub fn rank_all(stats: &SlotTable, metric: RankMetric) -> Vec<RankedSlot> {
    let mut ranked: Vec<RankedSlot> = stats
        .iter()
        .map(|(key, stats)| RankedSlot {
            key: *key,
            stats: *stats,
        })
        .collect();
    ranked.sort_by(|a, b| rank_order(metric, a, b));
    ranked
}

/// The best `n` slots of `stats`; length is `min(n, stats.len())`.
pub fn select_top(stats: &SlotTable, metric: RankMetric, n: usize) -> Vec<RankedSlot> {
    let mut ranked = rank_all(stats, metric);
    ranked.truncate(n);
    ranked
}

/// Parameters of the "top per period, then pool" reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TwoStage {
    pub period: Period,
    pub top_per_period: usize,
}

/// Two-stage selection over a period-keyed table.
///
/// Keeps the best `top_per_period` slots inside each period, pools the
/// survivors by their key without the period, and averages the period means
/// (mean of means, each period weighted equally). The pooled `count` is the
/// number of periods that contributed. Returns the best `n` pooled slots.
pub fn select_top_two_stage(
    period_stats: &SlotTable,
    metric: RankMetric,
    n: usize,
    top_per_period: usize,
) -> Vec<RankedSlot> {
    let mut by_period: BTreeMap<Option<PeriodKey>, SlotTable> = BTreeMap::new();
    for (key, stats) in period_stats {
        by_period
            .entry(key.period)
            .or_default()
            .insert(*key, *stats);
    }

    let mut pooled: BTreeMap<SlotKey, MeanAccumulator> = BTreeMap::new();
    for local in by_period.values() {
        for slot in select_top(local, metric, top_per_period) {
            pooled
                .entry(slot.key.without_period())
                .or_default()
                .push(slot.stats.mean_pnl, slot.stats.mean_pcr);
        }
    }

    let pooled: SlotTable = pooled
        .into_iter()
        .map(|(key, acc)| (key, acc.finish()))
        .collect();
    select_top(&pooled, metric, n)
}

/// Everything needed to pick slots from a lookback window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionConfig {
    pub metric: RankMetric,
    pub top_n: usize,
    pub by_weekday: bool,
    pub two_stage: Option<TwoStage>,
}

impl SelectionConfig {
    pub fn new(metric: RankMetric, top_n: usize) -> Self {
        Self {
            metric,
            top_n,
            by_weekday: false,
            two_stage: None,
        }
    }

    pub fn by_weekday(self, by_weekday: bool) -> Self {
        Self { by_weekday, ..self }
    }

    pub fn two_stage(self, period: Period, top_per_period: usize) -> Self {
        Self {
            two_stage: Some(TwoStage {
                period,
                top_per_period,
            }),
            ..self
        }
    }

    /// Key schema of the selected slots (never carries a period).
    pub fn schema(&self) -> KeySchema {
        KeySchema {
            by_weekday: self.by_weekday,
            period: None,
        }
    }

    pub fn validate(&self) -> Result<(), SlotwalkError> {
        if self.top_n == 0 {
            return Err(SlotwalkError::configuration("top_n must be at least 1"));
        }
        if let Some(ts) = self.two_stage {
            if ts.top_per_period == 0 {
                return Err(SlotwalkError::configuration(
                    "top_per_period must be at least 1",
                ));
            }
        }
        Ok(())
    }

    pub fn select(&self, table: &NormalizedTable, window: &WindowSpec) -> Selection {
        let slots = match self.two_stage {
            None => {
                let stats = aggregate(table, window, self.schema());
                select_top(&stats, self.metric, self.top_n)
            }
            Some(ts) => {
                let stats = aggregate(table, window, self.schema().with_period(ts.period));
                select_top_two_stage(&stats, self.metric, self.top_n, ts.top_per_period)
            }
        };
        tracing::debug!(window = %window, selected = slots.len(), "selected slots");
        Selection { slots }
    }
}

/// Slots chosen on one lookback window, best first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub slots: Vec<RankedSlot>,
}

impl Selection {
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn keys(&self) -> BTreeSet<SlotKey> {
        self.slots.iter().map(|s| s.key).collect()
    }

    pub fn times(&self) -> BTreeSet<TimeSlot> {
        self.slots.iter().map(|s| s.key.time).collect()
    }
}
