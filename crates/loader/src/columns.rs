use csv::StringRecord;
use std::collections::HashMap;

use crate::error::LoaderError;

// Accepted header spellings, in order of preference.
const ENTRY_DATETIME: &[&str] = &["open_datetime", "entry_time", "entry_datetime", "datetime"];
const EXIT_DATETIME: &[&str] = &["close_datetime", "exit_time", "exit_datetime"];
const DATE: &[&str] = &["date"];
const TIME: &[&str] = &["time"];
const SYMBOL: &[&str] = &["symbol", "ticker"];
const SIDE: &[&str] = &["side", "direction"];
const ENTRY_PRICE: &[&str] = &["entry_price"];
const EXIT_PRICE: &[&str] = &["exit_price"];
const QUANTITY: &[&str] = &["quantity", "qty"];
const COMMISSION: &[&str] = &["commission", "fees"];
const STRATEGY: &[&str] = &["strategy", "setup"];
const STOP_LOSS: &[&str] = &["stop_loss"];
const TAKE_PROFIT: &[&str] = &["take_profit"];
const TIMEFRAME: &[&str] = &["timeframe"];
const EXIT_REASON: &[&str] = &["exit_reason"];
const NOTES: &[&str] = &["notes"];

/// Where a timestamp lives: a single combined column, or a date column with an
/// optional separate time column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampColumns {
    pub date: usize,
    pub time: Option<usize>,
}

/// Maps the logical trade fields onto the column positions of one CSV header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    pub entry_time: TimestampColumns,
    /// `None` for journals with a single timestamp per trade.
    pub exit_time: Option<TimestampColumns>,
    pub symbol: usize,
    pub side: usize,
    pub entry_price: usize,
    pub exit_price: usize,
    pub quantity: usize,
    pub commission: Option<usize>,
    pub strategy: Option<usize>,
    pub stop_loss: Option<usize>,
    pub take_profit: Option<usize>,
    pub timeframe: Option<usize>,
    pub exit_reason: Option<usize>,
    pub notes: Option<usize>,
}

impl ColumnMap {
    /// Resolves a header row. Matching is case-insensitive and ignores surrounding whitespace.
    pub fn resolve(headers: &StringRecord) -> Result<Self, LoaderError> {
        let positions: HashMap<String, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, name)| (name.trim().to_ascii_lowercase(), i))
            .collect();

        let find = |aliases: &[&str]| aliases.iter().find_map(|alias| positions.get(*alias).copied());
        let require = |name: &'static str, aliases: &[&str]| find(aliases).ok_or(LoaderError::MissingColumn(name));

        let entry_time = match find(ENTRY_DATETIME) {
            Some(date) => TimestampColumns { date, time: None },
            None => TimestampColumns {
                date: require("date", DATE)?,
                time: find(TIME),
            },
        };
        let exit_time = find(EXIT_DATETIME).map(|date| TimestampColumns { date, time: None });

        Ok(Self {
            entry_time,
            exit_time,
            symbol: require("symbol", SYMBOL)?,
            side: require("side", SIDE)?,
            entry_price: require("entry_price", ENTRY_PRICE)?,
            exit_price: require("exit_price", EXIT_PRICE)?,
            quantity: require("quantity", QUANTITY)?,
            commission: find(COMMISSION),
            strategy: find(STRATEGY),
            stop_loss: find(STOP_LOSS),
            take_profit: find(TAKE_PROFIT),
            timeframe: find(TIMEFRAME),
            exit_reason: find(EXIT_REASON),
            notes: find(NOTES),
        })
    }
}
