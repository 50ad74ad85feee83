//! CSV trade log adapter.

use crate::domain::error::SlotwalkError;
use crate::domain::normalize::RawTable;
use crate::ports::data_port::DataPort;
use std::fs;
use std::path::PathBuf;

pub struct CsvAdapter {
    path: PathBuf,
}

impl CsvAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Parses CSV text with a header row into a [`RawTable`].
    pub fn parse(content: &str) -> Result<RawTable, SlotwalkError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(content.as_bytes());

        let headers = rdr
            .headers()
            .map_err(|e| SlotwalkError::Data {
                reason: format!("CSV header error: {}", e),
            })?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').to_string())
            .collect();

        let mut table = RawTable::new(headers);
        for result in rdr.records() {
            let record = result.map_err(|e| SlotwalkError::Data {
                reason: format!("CSV parse error: {}", e),
            })?;
            table.push_row(record.iter().map(str::to_string).collect());
        }
        Ok(table)
    }
}

impl DataPort for CsvAdapter {
    fn load_trades(&self) -> Result<RawTable, SlotwalkError> {
        let content = fs::read_to_string(&self.path).map_err(|e| SlotwalkError::Data {
            reason: format!("failed to read {}: {}", self.path.display(), e),
        })?;
        let table = Self::parse(&content)?;
        tracing::debug!(
            path = %self.path.display(),
            rows = table.rows.len(),
            "loaded trade log"
        );
        Ok(table)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::normalize::normalize;
    use tempfile::TempDir;

    const LOG: &str = "EntryTime,Premium,ProfitLossAfterSlippage,CommissionFees,Legs\n\
        01/08/2024 09:30:00 AM,125.5,0.85,4.68,\"STO 1 4700P\"\n\
        01/08/2024 10:00:00 AM,98,-1.2,4.68,\"STO 1 4725C\"\n";

    #[test]
    fn load_trades_reads_headers_and_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("trades.csv");
        fs::write(&path, LOG).unwrap();

        let raw = CsvAdapter::new(path).load_trades().unwrap();
        assert_eq!(raw.headers.len(), 5);
        assert_eq!(raw.rows.len(), 2);
        assert_eq!(raw.rows[1][2], "-1.2");
        assert_eq!(raw.rows[0][4], "STO 1 4700P");
    }

    #[test]
    fn loaded_table_normalizes() {
        let raw = CsvAdapter::parse(LOG).unwrap();
        let table = normalize(&raw).unwrap();
        assert_eq!(table.len(), 2);
        assert!((table.trades()[1].pnl() - (-124.68)).abs() < 1e-9);
    }

    #[test]
    fn byte_order_mark_is_stripped() {
        let raw = CsvAdapter::parse("\u{feff}EntryTime,Premium\n").unwrap();
        assert_eq!(raw.column_index("EntryTime"), Some(0));
    }

    #[test]
    fn missing_file_is_error() {
        let dir = TempDir::new().unwrap();
        let adapter = CsvAdapter::new(dir.path().join("absent.csv"));
        assert!(matches!(
            adapter.load_trades().unwrap_err(),
            SlotwalkError::Data { .. }
        ));
    }

    #[test]
    fn describe_names_the_path() {
        let adapter = CsvAdapter::new(PathBuf::from("data/log.csv"));
        assert_eq!(adapter.describe(), "data/log.csv");
    }
}
