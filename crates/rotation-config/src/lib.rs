//! Configuration management.

mod settings;

pub use settings::{
    AlpacaSettings, AppConfig, AppSettings, BacktestSettings, InstrumentSettings, LoggingConfig,
    StrategySettings, TradingSettings,
};

use config::{Config, ConfigError, Environment, File, FileFormat};
use std::path::Path;

/// Environment variable prefix, e.g. `ROTATION__STRATEGY__FAST=8`.
pub const ENV_PREFIX: &str = "ROTATION";

/// Load configuration from file and environment.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::from(path).required(true))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    finish(config)
}

/// Load configuration from TOML text, without environment overrides.
pub fn load_config_str(toml: &str) -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::from_str(toml, FileFormat::Toml))
        .build()?;

    finish(config)
}

fn finish(config: Config) -> Result<AppConfig, ConfigError> {
    let app: AppConfig = config.try_deserialize()?;
    app.validate().map_err(ConfigError::Message)?;
    Ok(app)
}

/// Render the effective configuration as TOML.
pub fn to_toml(config: &AppConfig) -> Result<String, toml::ser::Error> {
    toml::to_string_pretty(config)
}
