//! Slot aggregation over a time window.

use crate::domain::normalize::NormalizedTable;
use crate::domain::slot::{KeySchema, MeanAccumulator, SlotTable};
use crate::domain::trade::NormalizedTrade;
use crate::domain::window::WindowSpec;
use std::collections::BTreeMap;

/// Mean PnL and mean PCR per slot for trades inside `window` (inclusive).
///
/// PCR is averaged per trade, not recomputed from summed PnL and premium.
/// An empty or inverted window yields an empty table.
pub fn aggregate(table: &NormalizedTable, window: &WindowSpec, schema: KeySchema) -> SlotTable {
    aggregate_trades(table.in_window(window), schema)
}

pub fn aggregate_trades(trades: &[NormalizedTrade], schema: KeySchema) -> SlotTable {
    let mut groups: BTreeMap<_, MeanAccumulator> = BTreeMap::new();
    for trade in trades {
        groups
            .entry(schema.key_for(trade))
            .or_default()
            .push(trade.pnl(), trade.pcr());
    }
    groups
        .into_iter()
        .map(|(key, acc)| (key, acc.finish()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::slot::SlotKey;
    use crate::domain::trade::{DayOfWeek, TimeSlot, TradeRecord};
    use crate::domain::window::{Period, PeriodKey};
    use approx::assert_relative_eq;
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, d)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn rec(t: NaiveDateTime, premium: f64, pl: f64) -> TradeRecord {
        TradeRecord {
            entry_time: t,
            premium,
            profit_loss_after_slippage: pl,
            commission_fees: 0.0,
        }
    }

    fn sample() -> NormalizedTable {
        NormalizedTable::from_records(vec![
            rec(at(8, 9, 30), 100.0, 1.0),  // Mon, pnl 100, pcr 1.0
            rec(at(15, 9, 30), 400.0, 3.0), // Mon, pnl 300, pcr 0.75
            rec(at(9, 9, 30), 50.0, -1.0),  // Tue, pnl -100, pcr -2.0
            rec(at(9, 10, 0), 200.0, 2.0),  // Tue, pnl 200, pcr 1.0
        ])
    }

    fn all_january() -> WindowSpec {
        WindowSpec::from_dates(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        )
    }

    #[test]
    fn day_time_groups() {
        let stats = aggregate(&sample(), &all_january(), KeySchema::day_time());
        assert_eq!(stats.len(), 3);
        let mon = stats[&SlotKey::day_time(DayOfWeek::Monday, TimeSlot::from_hm(9, 30).unwrap())];
        assert_eq!(mon.count, 2);
        assert_relative_eq!(mon.mean_pnl, 200.0);
        assert_relative_eq!(mon.mean_pcr, 0.875);
    }

    #[test]
    fn pcr_is_mean_of_ratios() {
        let stats = aggregate(&sample(), &all_january(), KeySchema::time_only());
        let slot = stats[&SlotKey::time_only(TimeSlot::from_hm(9, 30).unwrap())];
        assert_eq!(slot.count, 3);
        // (1.0 + 0.75 - 2.0) / 3, not (100 + 300 - 100) / (100 + 400 + 50)
        assert_relative_eq!(slot.mean_pcr, -0.25 / 3.0);
        assert_relative_eq!(slot.mean_pnl, 100.0);
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let w = WindowSpec::new(at(8, 9, 30), at(9, 9, 30));
        let stats = aggregate(&sample(), &w, KeySchema::time_only());
        let slot = stats[&SlotKey::time_only(TimeSlot::from_hm(9, 30).unwrap())];
        assert_eq!(slot.count, 2);
        assert_relative_eq!(slot.mean_pnl, 0.0);
        assert_eq!(stats.len(), 1);
    }

    #[test]
    fn inverted_window_is_empty_not_error() {
        let w = WindowSpec::new(at(20, 0, 0), at(1, 0, 0));
        assert!(aggregate(&sample(), &w, KeySchema::day_time()).is_empty());
    }

    #[test]
    fn window_without_trades_is_empty() {
        let w = WindowSpec::from_dates(
            NaiveDate::from_ymd_opt(2023, 6, 1).unwrap(),
            NaiveDate::from_ymd_opt(2023, 6, 30).unwrap(),
        );
        assert!(aggregate(&sample(), &w, KeySchema::time_only()).is_empty());
    }

    #[test]
    fn period_schema_splits_by_week() {
        let schema = KeySchema::time_only().with_period(Period::Week);
        let stats = aggregate(&sample(), &all_january(), schema);
        let week2 = SlotKey {
            period: Some(PeriodKey::Week { year: 2024, week: 2 }),
            day: None,
            time: TimeSlot::from_hm(9, 30).unwrap(),
        };
        assert_eq!(stats[&week2].count, 2);
        assert_relative_eq!(stats[&week2].mean_pnl, 0.0);
        assert_eq!(stats.len(), 3);
    }
}
