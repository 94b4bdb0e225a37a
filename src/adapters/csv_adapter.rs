//! CSV file data adapter.
//!
//! Series are stored one file per session under
//! `<base_dir>/<TICKER>/<YYYY>/<MM>/<YYYY-MM-DD>.csv` with the header
//! `timestamp,open,high,low,close,volume,signal`.

use crate::domain::error::TradesimError;
use crate::domain::ohlcv::PriceBar;
use crate::domain::signal::Signal;
use crate::ports::data_port::DataPort;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

#[derive(Debug, Deserialize)]
struct InputRow {
    timestamp: Option<String>,
    #[serde(default)]
    open: Option<f64>,
    #[serde(default)]
    high: Option<f64>,
    #[serde(default)]
    low: Option<f64>,
    close: Option<f64>,
    #[serde(default)]
    volume: Option<f64>,
    #[serde(default)]
    signal: Option<f64>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SeriesRow {
    pub timestamp: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub signal: i64,
}

impl From<&PriceBar> for SeriesRow {
    fn from(bar: &PriceBar) -> Self {
        SeriesRow {
            timestamp: bar.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
            signal: bar.signal.as_i64(),
        }
    }
}

/// Parse a timestamp in any of the accepted layouts; a bare date maps to midnight.
pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime, TradesimError> {
    let value = value.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(|| TradesimError::invalid_input(format!("invalid timestamp '{value}'")))
}

fn parse_signal(value: Option<f64>, line: usize) -> Result<Signal, TradesimError> {
    match value {
        None => Ok(Signal::Hold),
        Some(v) if v.fract() == 0.0 => Signal::try_from(v as i64),
        Some(v) => Err(TradesimError::invalid_input(format!(
            "row {line}: signal must be -1, 0 or 1 (got {v})"
        ))),
    }
}

/// Read a signal-annotated series.
///
/// `timestamp` and `close` are required; missing open/high/low fall back to the
/// close, missing volume to 0 and a missing signal to Hold. Rows are returned
/// in file order.
pub fn read_series<R: Read>(reader: R) -> Result<Vec<PriceBar>, TradesimError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut bars = Vec::new();

    for (i, result) in rdr.deserialize::<InputRow>().enumerate() {
        let line = i + 2;
        let row = result
            .map_err(|e| TradesimError::invalid_input(format!("CSV parse error: {e}")))?;

        let timestamp = row
            .timestamp
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| TradesimError::invalid_input(format!("row {line}: missing timestamp")))
            .and_then(parse_timestamp)?;
        let close = row
            .close
            .ok_or_else(|| TradesimError::invalid_input(format!("row {line}: missing close")))?;

        bars.push(PriceBar {
            timestamp,
            open: row.open.unwrap_or(close),
            high: row.high.unwrap_or(close),
            low: row.low.unwrap_or(close),
            close,
            volume: row.volume.unwrap_or(0.0),
            signal: parse_signal(row.signal, line)?,
        });
    }

    Ok(bars)
}

pub fn read_series_file(path: &Path) -> Result<Vec<PriceBar>, TradesimError> {
    let file = fs::File::open(path).map_err(|e| TradesimError::Data {
        reason: format!("failed to read {}: {}", path.display(), e),
    })?;
    let bars = read_series(file)?;
    debug!(path = %path.display(), bars = bars.len(), "read series");
    Ok(bars)
}

#[derive(Debug, Deserialize)]
struct ValueRow {
    #[serde(default)]
    timestamp: Option<String>,
    value: Option<f64>,
}

/// A plain `timestamp,value` column pair as consumed by the drawdown command.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueSeries {
    pub values: Vec<f64>,
    /// Present only when every row carries a timestamp.
    pub timestamps: Option<Vec<NaiveDateTime>>,
}

/// Read a `value` column with an optional `timestamp` column.
pub fn read_values<R: Read>(reader: R) -> Result<ValueSeries, TradesimError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut values = Vec::new();
    let mut timestamps = Vec::new();
    let mut all_stamped = true;

    for (i, result) in rdr.deserialize::<ValueRow>().enumerate() {
        let line = i + 2;
        let row = result
            .map_err(|e| TradesimError::invalid_input(format!("CSV parse error: {e}")))?;
        let value = row
            .value
            .ok_or_else(|| TradesimError::invalid_input(format!("row {line}: missing value")))?;
        values.push(value);

        match row.timestamp.as_deref().filter(|s| !s.trim().is_empty()) {
            Some(raw) if all_stamped => timestamps.push(parse_timestamp(raw)?),
            Some(_) => {}
            None => all_stamped = false,
        }
    }

    Ok(ValueSeries {
        values,
        timestamps: (all_stamped && !timestamps.is_empty()).then_some(timestamps),
    })
}

pub fn read_values_file(path: &Path) -> Result<ValueSeries, TradesimError> {
    let file = fs::File::open(path).map_err(|e| TradesimError::Data {
        reason: format!("failed to read {}: {}", path.display(), e),
    })?;
    read_values(file)
}

pub fn write_series<W: Write>(writer: W, bars: &[PriceBar]) -> Result<(), TradesimError> {
    let mut wtr = csv::Writer::from_writer(writer);
    for bar in bars {
        wtr.serialize(SeriesRow::from(bar))
            .map_err(|e| TradesimError::Data {
                reason: format!("CSV write error: {e}"),
            })?;
    }
    wtr.flush()?;
    Ok(())
}

pub struct CsvAdapter {
    base_dir: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Dated file for a series, keyed on its earliest timestamp.
    pub fn series_path(&self, ticker: &str, bars: &[PriceBar]) -> Option<PathBuf> {
        let first = bars.iter().map(|b| b.timestamp).min()?;
        Some(
            self.base_dir
                .join(ticker)
                .join(first.format("%Y").to_string())
                .join(first.format("%m").to_string())
                .join(format!("{}.csv", first.format("%Y-%m-%d"))),
        )
    }

    /// Every `<ticker>/<YYYY>/<MM>/*.csv` file, sorted by path.
    fn series_files(&self, ticker: &str) -> Result<Vec<PathBuf>, TradesimError> {
        let root = self.base_dir.join(ticker);
        let mut files = Vec::new();

        for year in sorted_entries(&root)? {
            if !year.is_dir() {
                continue;
            }
            for month in sorted_entries(&year)? {
                if !month.is_dir() {
                    continue;
                }
                files.extend(
                    sorted_entries(&month)?
                        .into_iter()
                        .filter(|p| p.extension().is_some_and(|ext| ext == "csv")),
                );
            }
        }

        files.sort();
        Ok(files)
    }
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>, TradesimError> {
    let entries = fs::read_dir(dir).map_err(|e| TradesimError::Data {
        reason: format!("failed to read directory {}: {}", dir.display(), e),
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| TradesimError::Data {
            reason: format!("directory entry error: {}", e),
        })?;
        paths.push(entry.path());
    }
    paths.sort();
    Ok(paths)
}

impl DataPort for CsvAdapter {
    fn load_series(&self, ticker: &str) -> Result<Vec<PriceBar>, TradesimError> {
        let files = self.series_files(ticker)?;
        if files.is_empty() {
            warn!(ticker, base_dir = %self.base_dir.display(), "no series files found");
            return Err(TradesimError::Data {
                reason: format!(
                    "no files found for {} in {}",
                    ticker,
                    self.base_dir.display()
                ),
            });
        }

        let mut bars = Vec::new();
        for path in &files {
            bars.extend(read_series_file(path)?);
        }
        bars.sort_by_key(|b| b.timestamp);

        info!(ticker, files = files.len(), bars = bars.len(), "loaded series");
        Ok(bars)
    }

    fn store_series(&self, ticker: &str, bars: &[PriceBar]) -> Result<bool, TradesimError> {
        let path = self
            .series_path(ticker, bars)
            .ok_or_else(|| TradesimError::invalid_input("cannot store an empty series"))?;

        if path.exists() {
            info!(path = %path.display(), "series file already exists, skipping");
            return Ok(false);
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        write_series(fs::File::create(&path)?, bars)?;
        info!(path = %path.display(), bars = bars.len(), "series saved");
        Ok(true)
    }
}
