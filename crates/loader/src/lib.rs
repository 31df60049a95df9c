//! Reads trade journals from CSV into validated `TradeRecord`s.
//!
//! Two journal layouts are understood: a split `date` + `time` layout with a single
//! timestamp per trade, and an `open_datetime` / `close_datetime` layout. Column names
//! are matched through a small alias table (see [`columns`]).

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use configuration::LoaderSettings;
use core_types::{DEFAULT_STRATEGY, Side, TradeRecord};
use csv::{ReaderBuilder, StringRecord, Trim};
use rust_decimal::Decimal;
use std::fs::File;
use std::io::Read;
use std::path::Path;

pub mod columns;
pub mod error;

pub use columns::{ColumnMap, TimestampColumns};
pub use error::LoaderError;

/// Naive timestamp formats tried after RFC 3339, before any configured extras.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Loads trade journals according to the loader settings.
#[derive(Debug, Clone)]
pub struct TradeLoader {
    settings: LoaderSettings,
}

impl TradeLoader {
    pub fn new(settings: LoaderSettings) -> Self {
        Self { settings }
    }

    /// Opens and reads the CSV file at `path`.
    pub fn from_path<P: AsRef<Path>>(&self, path: P) -> Result<Vec<TradeRecord>, LoaderError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| LoaderError::Open {
            path: path.display().to_string(),
            source,
        })?;

        let trades = self.from_reader(file)?;
        tracing::info!(path = %path.display(), trades = trades.len(), "Loaded trade log.");
        Ok(trades)
    }

    /// Reads a CSV journal (with header row) from any reader.
    ///
    /// Rows keep their file order. Every record is validated; the first bad row aborts
    /// the load with its 0-based data row index.
    pub fn from_reader<R: Read>(&self, reader: R) -> Result<Vec<TradeRecord>, LoaderError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .delimiter(self.settings.delimiter_byte()?)
            .trim(Trim::All)
            .from_reader(reader);

        let columns = ColumnMap::resolve(reader.headers()?)?;
        tracing::debug!(?columns, "Resolved trade log columns.");

        let mut trades = Vec::new();
        for (row, result) in reader.records().enumerate() {
            let record = result?;
            let trade = self.parse_row(row, &record, &columns)?;
            trade.validate(row)?;
            trades.push(trade);
        }

        Ok(trades)
    }

    fn parse_row(&self, row: usize, record: &StringRecord, columns: &ColumnMap) -> Result<TradeRecord, LoaderError> {
        let cell = |index: usize| record.get(index).unwrap_or("");
        let optional = |index: Option<usize>| index.map(cell).filter(|value| !value.is_empty());

        let entry_time = self.parse_timestamp(row, "entry_time", record, columns.entry_time)?;
        let exit_time = match columns.exit_time {
            Some(exit) => self.parse_timestamp(row, "exit_time", record, exit)?,
            None => entry_time,
        };

        let side_raw = cell(columns.side);
        let side = side_raw.parse::<Side>().map_err(|e| LoaderError::InvalidField {
            row,
            field: "side",
            value: side_raw.to_string(),
            reason: e.to_string(),
        })?;

        let commission = match optional(columns.commission) {
            Some(value) => parse_decimal(row, "commission", value)?,
            None => Decimal::ZERO,
        };
        let stop_loss = optional(columns.stop_loss)
            .map(|value| parse_decimal(row, "stop_loss", value))
            .transpose()?;
        let take_profit = optional(columns.take_profit)
            .map(|value| parse_decimal(row, "take_profit", value))
            .transpose()?;

        Ok(TradeRecord {
            entry_time,
            exit_time,
            symbol: cell(columns.symbol).to_string(),
            side,
            entry_price: parse_decimal(row, "entry_price", cell(columns.entry_price))?,
            exit_price: parse_decimal(row, "exit_price", cell(columns.exit_price))?,
            quantity: parse_decimal(row, "quantity", cell(columns.quantity))?,
            commission,
            strategy: optional(columns.strategy).unwrap_or(DEFAULT_STRATEGY).to_string(),
            stop_loss,
            take_profit,
            timeframe: optional(columns.timeframe).map(str::to_string),
            exit_reason: optional(columns.exit_reason).map(str::to_string),
            notes: optional(columns.notes).map(str::to_string),
        })
    }

    fn parse_timestamp(
        &self,
        row: usize,
        field: &'static str,
        record: &StringRecord,
        columns: TimestampColumns,
    ) -> Result<DateTime<Utc>, LoaderError> {
        let date = record.get(columns.date).unwrap_or("");
        let time = columns.time.and_then(|i| record.get(i)).unwrap_or("");
        let raw = if time.is_empty() {
            date.to_string()
        } else {
            format!("{} {}", date, time)
        };

        parse_datetime(&raw, &self.settings.datetime_formats).ok_or_else(|| LoaderError::InvalidField {
            row,
            field,
            value: raw.clone(),
            reason: "unrecognized date/time format".to_string(),
        })
    }
}

/// Parses a timestamp as RFC 3339, one of the built-in naive formats, one of the
/// `extra_formats`, or a bare date (midnight). Naive values are taken as UTC.
pub fn parse_datetime(raw: &str, extra_formats: &[String]) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    let naive_formats = DATETIME_FORMATS
        .iter()
        .copied()
        .chain(extra_formats.iter().map(String::as_str));
    for format in naive_formats {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn parse_decimal(row: usize, field: &'static str, value: &str) -> Result<Decimal, LoaderError> {
    value.parse::<Decimal>().map_err(|e| LoaderError::InvalidField {
        row,
        field,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

/// Stable sort by entry time, so trades opened at the same instant keep their file order.
///
/// The analytics engine computes drawdown in the order it is given; call this first
/// unless the journal is known to be chronological.
pub fn sort_chronologically(trades: &mut [TradeRecord]) {
    trades.sort_by_key(|t| t.entry_time);
}
