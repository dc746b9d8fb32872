//! CSV bar files, one file per symbol: `<base>/<symbol>.csv`.
//!
//! Columns are positional: `timestamp,open,high,low,close,volume`, with a
//! header row. Timestamps are `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS`
//! or a bare `YYYY-MM-DD` (midnight). Rows are kept in file order; ordering
//! problems surface later as integrity errors.

use crate::domain::error::TradesimError;
use crate::domain::ohlcv::Bar;
use crate::domain::series::MarketSeries;
use crate::ports::data_port::DataPort;
use chrono::{NaiveDate, NaiveDateTime};
use std::fs;
use std::path::{Path, PathBuf};

const TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    /// Adapter for the directory holding `path`, plus the symbol `path` names.
    pub fn for_file(path: &Path) -> Result<(Self, String), TradesimError> {
        let symbol = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| TradesimError::Data {
                reason: format!("{} does not name a CSV file", path.display()),
            })?;
        let base = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Ok((Self::new(base), symbol))
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{symbol}.csv"))
    }
}

pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn field(record: &csv::StringRecord, index: usize, name: &str, line: u64) -> Result<f64, TradesimError> {
    let raw = record.get(index).ok_or_else(|| TradesimError::Data {
        reason: format!("line {line}: missing {name} column"),
    })?;
    raw.trim().parse().map_err(|e| TradesimError::Data {
        reason: format!("line {line}: invalid {name} value '{raw}': {e}"),
    })
}

/// Parses bars from CSV text.
pub fn parse_bars(content: &str) -> Result<Vec<Bar>, TradesimError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());
    let mut bars = Vec::new();

    for result in rdr.records() {
        let record = result.map_err(|e| TradesimError::Data {
            reason: format!("CSV parse error: {e}"),
        })?;
        let line = record.position().map_or(0, |p| p.line());

        let raw_ts = record.get(0).ok_or_else(|| TradesimError::Data {
            reason: format!("line {line}: missing timestamp column"),
        })?;
        let timestamp = parse_timestamp(raw_ts).ok_or_else(|| TradesimError::Data {
            reason: format!("line {line}: invalid timestamp '{raw_ts}'"),
        })?;

        bars.push(Bar::new(
            timestamp,
            field(&record, 1, "open", line)?,
            field(&record, 2, "high", line)?,
            field(&record, 3, "low", line)?,
            field(&record, 4, "close", line)?,
            field(&record, 5, "volume", line)?,
        ));
    }
    Ok(bars)
}

impl DataPort for CsvAdapter {
    fn load_series(&self, symbol: &str) -> Result<MarketSeries, TradesimError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path).map_err(|e| TradesimError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;
        let bars = parse_bars(&content)?;
        Ok(MarketSeries::new(symbol, bars))
    }

    fn list_symbols(&self) -> Result<Vec<String>, TradesimError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| TradesimError::Data {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| TradesimError::Data {
                reason: format!("directory entry error: {e}"),
            })?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if let Some(symbol) = name.strip_suffix(".csv") {
                symbols.push(symbol.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_test_data() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        let csv_content = "timestamp,open,high,low,close,volume\n\
            2024-01-15 10:00:00,100.0,110.0,90.0,105.0,50000\n\
            2024-01-15 10:05:00,105.0,115.0,100.0,110.0,60000\n\
            2024-01-16,110.0,120.0,105.0,115.0,55000.5\n";

        fs::write(path.join("WIN.csv"), csv_content).unwrap();
        fs::write(path.join("DOL.csv"), "timestamp,open,high,low,close,volume\n").unwrap();
        fs::write(path.join("notes.txt"), "not data").unwrap();

        (dir, path)
    }

    #[test]
    fn load_series_returns_bars_in_file_order() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let series = adapter.load_series("WIN").unwrap();
        assert_eq!(series.symbol(), "WIN");
        assert_eq!(series.len(), 3);

        let first = &series.bars()[0];
        assert_eq!(first.timestamp, parse_timestamp("2024-01-15T10:00:00").unwrap());
        assert_eq!(first.open, 100.0);
        assert_eq!(first.high, 110.0);
        assert_eq!(first.low, 90.0);
        assert_eq!(first.close, 105.0);
        assert_eq!(first.volume, 50000.0);
        assert_eq!(series.bars()[2].volume, 55000.5);
    }

    #[test]
    fn empty_file_gives_empty_series() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        assert!(adapter.load_series("DOL").unwrap().is_empty());
    }

    #[test]
    fn missing_file_is_a_data_error() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        let err = adapter.load_series("XYZ").unwrap_err();
        assert!(matches!(err, TradesimError::Data { .. }));
    }

    #[test]
    fn bad_values_are_reported_with_line() {
        let err = parse_bars("timestamp,open,high,low,close,volume\n2024-01-02,1,2,abc,1,1\n").unwrap_err();
        match err {
            TradesimError::Data { reason } => {
                assert!(reason.contains("line 2"), "{reason}");
                assert!(reason.contains("low"), "{reason}");
            }
            other => panic!("unexpected error {other:?}"),
        }

        assert!(parse_bars("timestamp,open,high,low,close,volume\nyesterday,1,1,1,1,1\n").is_err());
    }

    #[test]
    fn nan_prices_are_loaded_for_integrity_checks() {
        let bars = parse_bars("timestamp,open,high,low,close,volume\n2024-01-02,1,1,1,NaN,1\n").unwrap();
        assert!(!bars[0].has_finite_prices());
    }

    #[test]
    fn timestamp_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        assert_eq!(parse_timestamp("2024-03-01 09:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01T09:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01 09:30"), Some(expected));
        assert_eq!(
            parse_timestamp("2024-03-01"),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_hms_opt(0, 0, 0)
        );
        assert_eq!(parse_timestamp("03/01/2024"), None);
    }

    #[test]
    fn list_symbols_returns_csv_stems() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        assert_eq!(adapter.list_symbols().unwrap(), vec!["DOL", "WIN"]);
    }

    #[test]
    fn for_file_splits_directory_and_symbol() {
        let (_dir, path) = setup_test_data();
        let (adapter, symbol) = CsvAdapter::for_file(&path.join("WIN.csv")).unwrap();
        assert_eq!(symbol, "WIN");
        assert_eq!(adapter.load_series(&symbol).unwrap().len(), 3);
    }
}
