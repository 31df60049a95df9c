use serde::Deserialize;

use crate::error::ConfigError;

/// Largest number of decimal places a `rust_decimal::Decimal` can carry.
pub const MAX_DECIMALS: u32 = 28;

/// The root configuration structure for the entire application.
///
/// Every section is optional in `config.toml`; missing values fall back to the
/// defaults below.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub loader: LoaderSettings,
    pub report: ReportSettings,
}

/// Contains parameters for reading trade journals from CSV.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoaderSettings {
    /// Field separator of the CSV file. Must be a single ASCII character.
    pub delimiter: String,
    /// Extra `chrono` format strings tried after the built-in timestamp formats.
    pub datetime_formats: Vec<String>,
}

/// Contains parameters for the console report.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    /// How many best and worst trades to list.
    pub top_trades: usize,
    pub show_trades: bool,
    /// Decimal places used when printing money and ratios.
    pub decimals: u32,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            delimiter: ",".to_string(),
            datetime_formats: Vec::new(),
        }
    }
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            top_trades: 5,
            show_trades: true,
            decimals: 2,
        }
    }
}

impl LoaderSettings {
    /// The delimiter as the single byte the CSV reader expects.
    pub fn delimiter_byte(&self) -> Result<u8, ConfigError> {
        match self.delimiter.as_bytes() {
            [byte] if byte.is_ascii() => Ok(*byte),
            _ => Err(ConfigError::ValidationError(format!(
                "loader.delimiter must be a single ASCII character, got '{}'",
                self.delimiter
            ))),
        }
    }
}

impl Settings {
    /// Rejects settings that would make the loader or the report misbehave.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.loader.delimiter_byte()?;

        if self.report.top_trades == 0 {
            return Err(ConfigError::ValidationError(
                "report.top_trades must be at least 1".to_string(),
            ));
        }

        if self.report.decimals > MAX_DECIMALS {
            return Err(ConfigError::ValidationError(format!(
                "report.decimals must be at most {}, got {}",
                MAX_DECIMALS, self.report.decimals
            )));
        }

        Ok(())
    }
}
