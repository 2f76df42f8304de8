//! Bar loading from already-downloaded OHLCV CSV files.
//!
//! Expected columns: `date,open,high,low,close,volume`, lowercase or
//! capitalized (`Date`, `Close`) as common exporters write them. Extra columns
//! such as `Adj Close` are ignored. Rows must already
//! be in ascending date order; nothing is sorted or repaired here.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use barlab_core::config::ConfigError;
use barlab_core::domain::{Bar, BarSeries, DataError};
use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;

/// Errors from reading config or bar files.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("row {row}: {reason}")]
    Row { row: usize, reason: String },
    #[error("malformed TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("cannot encode preset as TOML: {0}")]
    TomlEncode(#[from] toml::ser::Error),
    #[error("data error: {0}")]
    Data(#[from] DataError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

#[derive(Debug, Deserialize)]
struct CsvBar {
    #[serde(alias = "Date")]
    date: NaiveDate,
    #[serde(alias = "Open")]
    open: f64,
    #[serde(alias = "High")]
    high: f64,
    #[serde(alias = "Low")]
    low: f64,
    #[serde(alias = "Close")]
    close: f64,
    #[serde(alias = "Volume")]
    volume: f64,
}

impl CsvBar {
    fn into_bar(self, row: usize) -> Result<Bar, LoadError> {
        if !self.volume.is_finite() || self.volume < 0.0 {
            return Err(LoadError::Row {
                row,
                reason: format!("volume must be finite and >= 0, got {}", self.volume),
            });
        }
        Ok(Bar::new(
            self.date,
            self.open,
            self.high,
            self.low,
            self.close,
            self.volume.round() as u64,
        ))
    }
}

/// Load a CSV file into a validated [`BarSeries`].
pub fn load_csv(path: &Path) -> Result<BarSeries, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read_bars(file)
}

/// Parse CSV bars from any reader.
pub fn read_bars<R: Read>(reader: R) -> Result<BarSeries, LoadError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut bars = Vec::new();
    for (i, record) in rdr.deserialize::<CsvBar>().enumerate() {
        // Row 1 is the header.
        bars.push(record?.into_bar(i + 2)?);
    }
    Ok(BarSeries::new(bars)?)
}
