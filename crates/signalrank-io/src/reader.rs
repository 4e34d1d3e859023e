//! CSV price reader with full input validation.

use std::path::{Path, PathBuf};

use signalrank_features::PriceHistory;
use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::InstrumentId;

/// Reads a closing-price series (and optional volumes) from a CSV file.
///
/// Expected CSV format:
/// - Header row required
/// - A `close` column (case-insensitive); other columns such as dates are ignored
/// - An optional `volume` column (case-insensitive)
/// - One row per time step, oldest first
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::MissingColumn`] | Header has no `close` column |
/// | [`IoError::EmptyDataset`] | Zero data rows after header |
/// | [`IoError::InconsistentRowLength`] | Row too short to hold `close` or `volume` |
/// | [`IoError::InvalidValue`] | Close not a positive finite float, or volume negative/non-finite |
pub struct PriceReader {
    path: PathBuf,
}

impl PriceReader {
    /// Create a new reader for the given CSV file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Identifier of the instrument, from the file stem.
    #[must_use]
    pub fn instrument_id(&self) -> InstrumentId {
        InstrumentId::from_path(&self.path)
    }

    /// Read and validate the CSV file, returning a [`PriceHistory`].
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<PriceHistory, IoError> {
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        // flexible(true) lets short rows reach our own InconsistentRowLength
        // check instead of a low-level CsvParse error.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let header = rdr.headers().map_err(|e| self.csv_error(e))?;
        let expected_cols = header.len();
        let find = |name: &str| header.iter().position(|h| h.eq_ignore_ascii_case(name));
        let close_col = find("close").ok_or_else(|| IoError::MissingColumn {
            path: self.path.clone(),
            column: "close",
        })?;
        let volume_col = find("volume");
        debug!(expected_cols, close_col, ?volume_col, "read CSV header");

        let mut prices = Vec::new();
        let mut volumes = volume_col.map(|_| Vec::new());

        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| self.csv_error(e))?;

            let needed = close_col.max(volume_col.unwrap_or(0)) + 1;
            if record.len() < needed {
                return Err(IoError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    expected: expected_cols,
                    got: record.len(),
                });
            }

            let raw = record.get(close_col).unwrap_or("");
            prices.push(self.parse_cell(raw, row_index, "close", |v| v > 0.0, "must be positive")?);

            if let (Some(col), Some(volumes)) = (volume_col, volumes.as_mut()) {
                let raw = record.get(col).unwrap_or("");
                volumes.push(self.parse_cell(
                    raw,
                    row_index,
                    "volume",
                    |v| v >= 0.0,
                    "must be non-negative",
                )?);
            }
        }

        if prices.is_empty() {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }

        let n_rows = prices.len();
        let history = PriceHistory::new(prices, volumes).map_err(|e| IoError::InvalidHistory {
            path: self.path.clone(),
            source: e,
        })?;

        info!(
            n_rows,
            with_volumes = history.has_volumes(),
            "price history loaded"
        );
        Ok(history)
    }

    fn parse_cell(
        &self,
        raw: &str,
        row_index: usize,
        column: &'static str,
        in_domain: impl Fn(f64) -> bool,
        domain: &'static str,
    ) -> Result<f64, IoError> {
        let invalid = |reason| IoError::InvalidValue {
            path: self.path.clone(),
            row_index,
            column,
            raw: raw.to_string(),
            reason,
        };
        let value: f64 = raw.parse().map_err(|_| invalid("not a number"))?;
        if !value.is_finite() {
            return Err(invalid("not finite"));
        }
        if !in_domain(value) {
            return Err(invalid(domain));
        }
        Ok(value)
    }

    fn csv_error(&self, e: csv::Error) -> IoError {
        IoError::CsvParse {
            path: self.path.clone(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        }
    }
}
