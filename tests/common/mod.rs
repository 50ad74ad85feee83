#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use slotwalk::domain::error::SlotwalkError;
use slotwalk::domain::normalize::{ENTRY_TIME_FORMAT, REQUIRED_COLUMNS, RawTable};
use slotwalk::domain::trade::TradeRecord;
use slotwalk::ports::data_port::DataPort;

pub struct MockDataPort {
    pub table: RawTable,
    pub error: Option<String>,
}

impl MockDataPort {
    pub fn new(table: RawTable) -> Self {
        Self { table, error: None }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            table: RawTable::default(),
            error: Some(reason.to_string()),
        }
    }
}

impl DataPort for MockDataPort {
    fn load_trades(&self) -> Result<RawTable, SlotwalkError> {
        match &self.error {
            Some(reason) => Err(SlotwalkError::Data {
                reason: reason.clone(),
            }),
            None => Ok(self.table.clone()),
        }
    }

    fn describe(&self) -> String {
        "mock".to_string()
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    date(y, m, d).and_hms_opt(h, min, 0).unwrap()
}

/// A record whose PnL is exactly `pnl` (no fees) on a premium of 100.
pub fn record(entry_time: NaiveDateTime, pnl: f64) -> TradeRecord {
    TradeRecord {
        entry_time,
        premium: 100.0,
        profit_loss_after_slippage: pnl / 100.0,
        commission_fees: 0.0,
    }
}

/// One raw row in the required column order.
pub fn trade_row(entry_time: NaiveDateTime, premium: f64, pl: f64, fees: f64) -> Vec<String> {
    vec![
        entry_time.format(ENTRY_TIME_FORMAT).to_string(),
        premium.to_string(),
        pl.to_string(),
        fees.to_string(),
    ]
}

pub fn raw_table(rows: Vec<Vec<String>>) -> RawTable {
    let mut raw = RawTable::new(REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect());
    for row in rows {
        raw.push_row(row);
    }
    raw
}

/// Raw rows with PnL `pnl` each: `PL = pnl / 100`, no fees.
pub fn pnl_rows(trades: &[(NaiveDateTime, f64)]) -> RawTable {
    raw_table(
        trades
            .iter()
            .map(|(t, pnl)| trade_row(*t, 100.0, pnl / 100.0, 0.0))
            .collect(),
    )
}

pub fn to_csv(raw: &RawTable) -> String {
    let mut out = raw.headers.join(",");
    out.push('\n');
    for row in &raw.rows {
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}
