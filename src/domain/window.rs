//! Time windows and calendar periods.

use crate::domain::trade::CalendarFeatures;
use chrono::{Duration, Months, NaiveDate, NaiveDateTime, NaiveTime};
use std::fmt;
use std::str::FromStr;

/// A time range, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSpec {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl WindowSpec {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    /// `[start 00:00:00, end 23:59:59.999999999]`.
    pub fn from_dates(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: start.and_time(NaiveTime::MIN),
            end: end_of_day(end),
        }
    }

    /// The window covering `months` calendar months from the start of `first`'s day.
    pub fn leading_months(first: NaiveDateTime, months: u32) -> Option<Self> {
        let start = first.date().and_time(NaiveTime::MIN);
        let end = start.checked_add_months(Months::new(months))? - Duration::nanoseconds(1);
        Some(Self { start, end })
    }

    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    pub fn contains(&self, t: NaiveDateTime) -> bool {
        self.start <= t && t <= self.end
    }

    /// True when the window is at least one `period` long.
    pub fn spans(&self, period: Period) -> bool {
        match period.advance(self.start, 1) {
            Some(next) => next <= self.end + Duration::nanoseconds(1),
            None => false,
        }
    }
}

impl fmt::Display for WindowSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to {}",
            self.start.format("%Y-%m-%d %H:%M"),
            self.end.format("%Y-%m-%d %H:%M")
        )
    }
}

pub fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN) + Duration::days(1) - Duration::nanoseconds(1)
}

/// Calendar granularity used for two-stage selection and walk-forward steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Period {
    Month,
    Week,
}

impl Period {
    /// `t` moved forward by `n` whole periods. Month steps clamp to the last
    /// day of shorter months.
    pub fn advance(self, t: NaiveDateTime, n: u32) -> Option<NaiveDateTime> {
        match self {
            Period::Month => t.checked_add_months(Months::new(n)),
            Period::Week => t.checked_add_signed(Duration::weeks(i64::from(n))),
        }
    }

    pub fn key_of(self, calendar: &CalendarFeatures) -> PeriodKey {
        match self {
            Period::Month => PeriodKey::Month {
                year: calendar.year,
                month: calendar.month,
            },
            Period::Week => PeriodKey::Week {
                year: calendar.iso_year,
                week: calendar.iso_week,
            },
        }
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "month" | "monthly" => Ok(Period::Month),
            "week" | "weekly" => Ok(Period::Week),
            other => Err(format!("unknown period '{}' (expected month or week)", other)),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Month => f.write_str("month"),
            Period::Week => f.write_str("week"),
        }
    }
}

/// A concrete calendar period a trade falls in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PeriodKey {
    Month { year: i32, month: u32 },
    /// ISO week-year and week number.
    Week { year: i32, week: u32 },
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeriodKey::Month { year, month } => write!(f, "{}-{:02}", year, month),
            PeriodKey::Week { year, week } => write!(f, "{}-W{:02}", year, week),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn from_dates_covers_whole_days() {
        let w = WindowSpec::from_dates(date(2024, 1, 1), date(2024, 1, 31));
        assert!(w.contains(date(2024, 1, 1).and_hms_opt(0, 0, 0).unwrap()));
        assert!(w.contains(date(2024, 1, 31).and_hms_opt(23, 59, 59).unwrap()));
        assert!(!w.contains(date(2024, 2, 1).and_hms_opt(0, 0, 0).unwrap()));
    }

    #[test]
    fn inverted_window_is_empty() {
        let w = WindowSpec::from_dates(date(2024, 2, 1), date(2024, 1, 1));
        assert!(w.is_empty());
    }

    #[test]
    fn full_calendar_month_spans_a_month() {
        let w = WindowSpec::from_dates(date(2024, 1, 1), date(2024, 1, 31));
        assert!(w.spans(Period::Month));
        let short = WindowSpec::from_dates(date(2024, 1, 1), date(2024, 1, 30));
        assert!(!short.spans(Period::Month));
    }

    #[test]
    fn week_span() {
        assert!(WindowSpec::from_dates(date(2024, 1, 1), date(2024, 1, 7)).spans(Period::Week));
        assert!(!WindowSpec::from_dates(date(2024, 1, 1), date(2024, 1, 6)).spans(Period::Week));
    }

    #[test]
    fn leading_months_ends_just_before_next_month() {
        let first = date(2024, 1, 15).and_hms_opt(9, 30, 0).unwrap();
        let w = WindowSpec::leading_months(first, 2).unwrap();
        assert_eq!(w.start, date(2024, 1, 15).and_hms_opt(0, 0, 0).unwrap());
        assert_eq!(w.end.date(), date(2024, 3, 14));
        assert!(w.spans(Period::Month));
    }

    #[test]
    fn month_advance_clamps_to_month_end() {
        let t = end_of_day(date(2024, 1, 31));
        let feb = Period::Month.advance(t, 1).unwrap();
        assert_eq!(feb.date(), date(2024, 2, 29));
        let mar = Period::Month.advance(t, 2).unwrap();
        assert_eq!(mar.date(), date(2024, 3, 31));
    }

    #[test]
    fn week_advance() {
        let t = date(2024, 1, 1).and_hms_opt(0, 0, 0).unwrap();
        assert_eq!(Period::Week.advance(t, 3).unwrap().date(), date(2024, 1, 22));
    }

    #[test]
    fn period_keys() {
        let t = date(2024, 12, 30).and_hms_opt(10, 0, 0).unwrap();
        let cal = CalendarFeatures::of(t);
        assert_eq!(
            Period::Month.key_of(&cal),
            PeriodKey::Month { year: 2024, month: 12 }
        );
        assert_eq!(
            Period::Week.key_of(&cal),
            PeriodKey::Week { year: 2025, week: 1 }
        );
        assert_eq!(Period::Week.key_of(&cal).to_string(), "2025-W01");
        assert_eq!(t.year(), 2024);
    }

    #[test]
    fn period_from_str() {
        assert_eq!("Month".parse::<Period>().unwrap(), Period::Month);
        assert_eq!(" weekly ".parse::<Period>().unwrap(), Period::Week);
        assert!("quarter".parse::<Period>().is_err());
    }
}
