//! Trade records, per-trade metrics and calendar features.

use chrono::{Datelike, NaiveDateTime, NaiveTime, Timelike, Weekday};
use std::fmt;

/// Contract multiplier applied to `ProfitLossAfterSlippage`.
pub const CONTRACT_MULTIPLIER: f64 = 100.0;

/// One executed trade as read from the log.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeRecord {
    pub entry_time: NaiveDateTime,
    pub premium: f64,
    pub profit_loss_after_slippage: f64,
    pub commission_fees: f64,
}

impl TradeRecord {
    /// pnl = profit_loss_after_slippage * 100 - commission_fees; pcr = pnl / premium
    pub fn metrics(&self) -> DerivedMetrics {
        let pnl = self.profit_loss_after_slippage * CONTRACT_MULTIPLIER - self.commission_fees;
        DerivedMetrics {
            pnl,
            pcr: pnl / self.premium,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedMetrics {
    pub pnl: f64,
    pub pcr: f64,
}

/// Day of week, ordered Monday first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl From<Weekday> for DayOfWeek {
    fn from(day: Weekday) -> Self {
        match day {
            Weekday::Mon => DayOfWeek::Monday,
            Weekday::Tue => DayOfWeek::Tuesday,
            Weekday::Wed => DayOfWeek::Wednesday,
            Weekday::Thu => DayOfWeek::Thursday,
            Weekday::Fri => DayOfWeek::Friday,
            Weekday::Sat => DayOfWeek::Saturday,
            Weekday::Sun => DayOfWeek::Sunday,
        }
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DayOfWeek::Monday => "Monday",
            DayOfWeek::Tuesday => "Tuesday",
            DayOfWeek::Wednesday => "Wednesday",
            DayOfWeek::Thursday => "Thursday",
            DayOfWeek::Friday => "Friday",
            DayOfWeek::Saturday => "Saturday",
            DayOfWeek::Sunday => "Sunday",
        };
        f.write_str(name)
    }
}

/// Wall-clock time of day truncated to the minute.
///
/// Displays as a 12-hour label (`09:30 AM`). The label and the truncated time
/// are one-to-one, so ordering and grouping on the time is the same as
/// grouping on the label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeSlot(NaiveTime);

impl TimeSlot {
    pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(TimeSlot)
    }

    pub fn of(timestamp: NaiveDateTime) -> Self {
        let time = timestamp.time();
        // hour/minute taken from a valid time always form a valid time
        TimeSlot(NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap_or(time))
    }

    pub fn time(&self) -> NaiveTime {
        self.0
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%I:%M %p"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarFeatures {
    pub day_of_week: DayOfWeek,
    pub time_of_day: TimeSlot,
    pub year: i32,
    pub month: u32,
    pub iso_year: i32,
    pub iso_week: u32,
}

impl CalendarFeatures {
    pub fn of(timestamp: NaiveDateTime) -> Self {
        let iso = timestamp.iso_week();
        Self {
            day_of_week: timestamp.weekday().into(),
            time_of_day: TimeSlot::of(timestamp),
            year: timestamp.year(),
            month: timestamp.month(),
            iso_year: iso.year(),
            iso_week: iso.week(),
        }
    }
}

/// A trade together with everything derived from it.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTrade {
    pub record: TradeRecord,
    pub metrics: DerivedMetrics,
    pub calendar: CalendarFeatures,
}

impl NormalizedTrade {
    pub fn new(record: TradeRecord) -> Self {
        let metrics = record.metrics();
        let calendar = CalendarFeatures::of(record.entry_time);
        Self {
            record,
            metrics,
            calendar,
        }
    }

    pub fn entry_time(&self) -> NaiveDateTime {
        self.record.entry_time
    }

    pub fn pnl(&self) -> f64 {
        self.metrics.pnl
    }

    pub fn pcr(&self) -> f64 {
        self.metrics.pcr
    }
}
