use crate::error::ConfigError;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use settings::{LoaderSettings, ReportSettings, Settings};

/// Prefix of the environment variables that override file settings,
/// e.g. `TRADELOG__REPORT__TOP_TRADES=10`.
pub const ENV_PREFIX: &str = "TRADELOG";

/// Loads the application configuration.
///
/// Reads `config.toml` from the working directory when it exists, then applies
/// `TRADELOG__*` environment overrides. A missing file is not an error.
pub fn load_settings() -> Result<Settings, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::with_name("config").required(false));
    finish(builder)
}

/// Like [`load_settings`], but reads an explicit file, which must exist.
pub fn load_settings_from(path: &Path) -> Result<Settings, ConfigError> {
    let builder = config::Config::builder().add_source(config::File::from(path));
    finish(builder)
}

fn finish(
    builder: config::ConfigBuilder<config::builder::DefaultState>,
) -> Result<Settings, ConfigError> {
    let config = builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    // Attempt to deserialize the entire configuration into our `Settings` struct
    let settings = config.try_deserialize::<Settings>()?;
    settings.validate()?;

    tracing::debug!(?settings, "Configuration loaded.");
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{File, FileFormat};

    fn from_toml(toml: &str) -> Result<Settings, ConfigError> {
        finish(config::Config::builder().add_source(File::from_str(toml, FileFormat::Toml)))
    }

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.loader.delimiter_byte().unwrap(), b',');
        assert_eq!(settings.report.top_trades, 5);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let settings = from_toml("[report]\ntop_trades = 3\n").unwrap();
        assert_eq!(settings.report.top_trades, 3);
        assert_eq!(settings.report.decimals, 2);
        assert_eq!(settings.loader.delimiter, ",");
    }

    #[test]
    fn test_loader_section() {
        let settings = from_toml(
            "[loader]\ndelimiter = \";\"\ndatetime_formats = [\"%d/%m/%Y %H:%M\"]\n",
        )
        .unwrap();
        assert_eq!(settings.loader.delimiter_byte().unwrap(), b';');
        assert_eq!(settings.loader.datetime_formats, vec!["%d/%m/%Y %H:%M".to_string()]);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(matches!(
            from_toml("[report]\ntop_trades = 0\n"),
            Err(ConfigError::ValidationError(_))
        ));
        assert!(matches!(
            from_toml("[loader]\ndelimiter = \"::\"\n"),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_decimals_are_bounded() {
        assert_eq!(from_toml("[report]\ndecimals = 28\n").unwrap().report.decimals, 28);
        assert!(matches!(
            from_toml("[report]\ndecimals = 40\n"),
            Err(ConfigError::ValidationError(_))
        ));
    }
}
