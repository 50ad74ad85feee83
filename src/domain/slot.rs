//! Slot keys, key schemas and per-slot statistics.

use crate::domain::trade::{DayOfWeek, NormalizedTrade, TimeSlot};
use crate::domain::window::{Period, PeriodKey};
use std::collections::BTreeMap;
use std::fmt;

/// Grouping key for aggregation.
///
/// Field order gives the ordering used to break ranking ties: period, then
/// day (Monday first), then time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotKey {
    pub period: Option<PeriodKey>,
    pub day: Option<DayOfWeek>,
    pub time: TimeSlot,
}

impl SlotKey {
    pub fn time_only(time: TimeSlot) -> Self {
        Self {
            period: None,
            day: None,
            time,
        }
    }

    pub fn day_time(day: DayOfWeek, time: TimeSlot) -> Self {
        Self {
            period: None,
            day: Some(day),
            time,
        }
    }

    /// The same key with the period dropped.
    pub fn without_period(self) -> Self {
        Self {
            period: None,
            ..self
        }
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(period) = self.period {
            write!(f, "{} ", period)?;
        }
        if let Some(day) = self.day {
            write!(f, "{} ", day)?;
        }
        write!(f, "{}", self.time)
    }
}

/// Which fields make up a [`SlotKey`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeySchema {
    pub by_weekday: bool,
    pub period: Option<Period>,
}

impl KeySchema {
    pub fn time_only() -> Self {
        Self::default()
    }

    pub fn day_time() -> Self {
        Self {
            by_weekday: true,
            period: None,
        }
    }

    pub fn with_period(self, period: Period) -> Self {
        Self {
            period: Some(period),
            ..self
        }
    }

    pub fn without_period(self) -> Self {
        Self {
            period: None,
            ..self
        }
    }

    pub fn key_for(&self, trade: &NormalizedTrade) -> SlotKey {
        let cal = &trade.calendar;
        SlotKey {
            period: self.period.map(|p| p.key_of(cal)),
            day: self.by_weekday.then_some(cal.day_of_week),
            time: cal.time_of_day,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlotStats {
    pub mean_pnl: f64,
    pub mean_pcr: f64,
    pub count: usize,
}

/// Aggregated statistics for one window, keyed and iterated in key order.
pub type SlotTable = BTreeMap<SlotKey, SlotStats>;

/// Running sums used to build a [`SlotStats`].
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct MeanAccumulator {
    pnl_sum: f64,
    pcr_sum: f64,
    count: usize,
}

impl MeanAccumulator {
    pub(crate) fn push(&mut self, pnl: f64, pcr: f64) {
        self.pnl_sum += pnl;
        self.pcr_sum += pcr;
        self.count += 1;
    }

    pub(crate) fn finish(self) -> SlotStats {
        let n = self.count as f64;
        SlotStats {
            mean_pnl: self.pnl_sum / n,
            mean_pcr: self.pcr_sum / n,
            count: self.count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::trade::TradeRecord;
    use chrono::NaiveDate;

    fn trade_at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NormalizedTrade {
        NormalizedTrade::new(TradeRecord {
            entry_time: NaiveDate::from_ymd_opt(y, m, d)
                .unwrap()
                .and_hms_opt(h, min, 12)
                .unwrap(),
            premium: 100.0,
            profit_loss_after_slippage: 1.0,
            commission_fees: 0.0,
        })
    }

    #[test]
    fn time_only_schema_drops_day_and_period() {
        let t = trade_at(2024, 1, 8, 9, 30);
        let key = KeySchema::time_only().key_for(&t);
        assert_eq!(key, SlotKey::time_only(TimeSlot::from_hm(9, 30).unwrap()));
    }

    #[test]
    fn day_time_schema_keeps_weekday() {
        let t = trade_at(2024, 1, 9, 10, 0);
        let key = KeySchema::day_time().key_for(&t);
        assert_eq!(key.day, Some(DayOfWeek::Tuesday));
        assert_eq!(key.period, None);
    }

    #[test]
    fn period_schema_adds_period_key() {
        let t = trade_at(2024, 3, 4, 15, 45);
        let key = KeySchema::time_only().with_period(Period::Month).key_for(&t);
        assert_eq!(key.period, Some(PeriodKey::Month { year: 2024, month: 3 }));
        assert_eq!(key.to_string(), "2024-03 03:45 PM");
        assert_eq!(key.without_period(), SlotKey::time_only(key.time));
    }

    #[test]
    fn keys_order_by_day_before_time() {
        let mon_late = SlotKey::day_time(DayOfWeek::Monday, TimeSlot::from_hm(15, 0).unwrap());
        let tue_early = SlotKey::day_time(DayOfWeek::Tuesday, TimeSlot::from_hm(9, 0).unwrap());
        assert!(mon_late < tue_early);
    }

    #[test]
    fn accumulator_means() {
        let mut acc = MeanAccumulator::default();
        acc.push(10.0, 0.1);
        acc.push(30.0, 0.5);
        let stats = acc.finish();
        assert_eq!(stats.count, 2);
        assert!((stats.mean_pnl - 20.0).abs() < f64::EPSILON);
        assert!((stats.mean_pcr - 0.3).abs() < 1e-12);
    }
}
