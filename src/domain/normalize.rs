//! Trade log normalization: raw rows to typed, time-ordered trades.

use crate::domain::error::SlotwalkError;
use crate::domain::trade::{NormalizedTrade, TradeRecord};
use crate::domain::window::WindowSpec;
use chrono::NaiveDateTime;

pub const ENTRY_TIME: &str = "EntryTime";
pub const PREMIUM: &str = "Premium";
pub const PROFIT_LOSS_AFTER_SLIPPAGE: &str = "ProfitLossAfterSlippage";
pub const COMMISSION_FEES: &str = "CommissionFees";

pub const REQUIRED_COLUMNS: [&str; 4] = [
    ENTRY_TIME,
    PREMIUM,
    PROFIT_LOSS_AFTER_SLIPPAGE,
    COMMISSION_FEES,
];

/// `MM/DD/YYYY hh:mm:ss AM/PM`
pub const ENTRY_TIME_FORMAT: &str = "%m/%d/%Y %I:%M:%S %p";

/// Untyped tabular input: a header row and string cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim() == name)
    }
}

/// Normalized trades in entry-time order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedTable {
    trades: Vec<NormalizedTrade>,
}

impl NormalizedTable {
    /// Builds a table from already-typed records, sorting by entry time.
    pub fn from_records(records: Vec<TradeRecord>) -> Self {
        let mut trades: Vec<NormalizedTrade> =
            records.into_iter().map(NormalizedTrade::new).collect();
        trades.sort_by_key(|t| t.entry_time());
        Self { trades }
    }

    pub fn trades(&self) -> &[NormalizedTrade] {
        &self.trades
    }

    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    pub fn min_entry_time(&self) -> Option<NaiveDateTime> {
        self.trades.first().map(|t| t.entry_time())
    }

    pub fn max_entry_time(&self) -> Option<NaiveDateTime> {
        self.trades.last().map(|t| t.entry_time())
    }

    /// Trades with `window.start <= entry_time <= window.end`.
    pub fn in_window(&self, window: &WindowSpec) -> &[NormalizedTrade] {
        if window.is_empty() {
            return &[];
        }
        let lo = self.trades.partition_point(|t| t.entry_time() < window.start);
        let hi = self.trades.partition_point(|t| t.entry_time() <= window.end);
        &self.trades[lo..hi.max(lo)]
    }

    /// Renders the table back into the raw input schema.
    pub fn to_raw(&self) -> RawTable {
        let mut raw = RawTable::new(REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect());
        for t in &self.trades {
            raw.push_row(vec![
                t.record.entry_time.format(ENTRY_TIME_FORMAT).to_string(),
                t.record.premium.to_string(),
                t.record.profit_loss_after_slippage.to_string(),
                t.record.commission_fees.to_string(),
            ]);
        }
        raw
    }
}

/// Validates the schema of `raw` and types every row.
///
/// Fails as a whole on the first problem; no partial table is returned.
pub fn normalize(raw: &RawTable) -> Result<NormalizedTable, SlotwalkError> {
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| raw.column_index(c).is_none())
        .map(|c| c.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(SlotwalkError::Schema { missing });
    }

    // Columns are known to exist past the check above.
    let idx = |name: &str| raw.column_index(name).unwrap_or(usize::MAX);
    let entry_idx = idx(ENTRY_TIME);
    let premium_idx = idx(PREMIUM);
    let pl_idx = idx(PROFIT_LOSS_AFTER_SLIPPAGE);
    let fees_idx = idx(COMMISSION_FEES);

    let mut records = Vec::with_capacity(raw.rows.len());
    for (i, row) in raw.rows.iter().enumerate() {
        let row_no = i + 1;
        let entry_time = parse_entry_time(cell(row, entry_idx), row_no)?;
        let premium = parse_number(cell(row, premium_idx), row_no, PREMIUM)?;
        if premium <= 0.0 {
            return Err(SlotwalkError::InvalidPremium {
                row: row_no,
                value: premium,
            });
        }
        let profit_loss_after_slippage =
            parse_number(cell(row, pl_idx), row_no, PROFIT_LOSS_AFTER_SLIPPAGE)?;
        let commission_fees = parse_number(cell(row, fees_idx), row_no, COMMISSION_FEES)?;

        records.push(TradeRecord {
            entry_time,
            premium,
            profit_loss_after_slippage,
            commission_fees,
        });
    }

    let table = NormalizedTable::from_records(records);
    tracing::debug!(trades = table.len(), "normalized trade log");
    Ok(table)
}

fn cell(row: &[String], idx: usize) -> &str {
    row.get(idx).map(|s| s.trim()).unwrap_or("")
}

pub fn parse_entry_time(value: &str, row: usize) -> Result<NaiveDateTime, SlotwalkError> {
    NaiveDateTime::parse_from_str(value, ENTRY_TIME_FORMAT).map_err(|e| SlotwalkError::Parse {
        row,
        column: ENTRY_TIME.to_string(),
        value: value.to_string(),
        reason: e.to_string(),
    })
}

/// Finite decimal; `NaN` and infinities are rejected.
fn parse_number(value: &str, row: usize, column: &str) -> Result<f64, SlotwalkError> {
    let error = |reason: String| SlotwalkError::Parse {
        row,
        column: column.to_string(),
        value: value.to_string(),
        reason,
    };
    let number = value.parse::<f64>().map_err(|e| error(e.to_string()))?;
    if !number.is_finite() {
        return Err(error("not a finite number".to_string()));
    }
    Ok(number)
}
