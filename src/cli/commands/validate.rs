//! Validate configuration command.

use anyhow::Result;
use rotation_config::{to_toml, AppConfig, ENV_PREFIX};
use std::path::Path;

pub async fn run(config_path: &Path, loaded: Result<AppConfig>) -> Result<()> {
    println!("Validating configuration: {:?}", config_path);

    match loaded {
        Ok(config) => {
            println!("Configuration is valid!");
            println!();
            println!("App: {}", config.app.name);
            println!("Environment: {}", config.app.environment);
            println!("Log level: {}", config.logging.level);
            println!(
                "Pair: {} / {}",
                config.instruments.bull, config.instruments.bear
            );
            println!(
                "Averages: MA{} / MA{} / MA{}",
                config.strategy.fast, config.strategy.medium, config.strategy.slow
            );
            for var in [&config.alpaca.api_key_env, &config.alpaca.api_secret_env] {
                if std::env::var(var).is_err() {
                    println!("Warning: {} is not set, live trading will fail", var);
                }
            }
            println!();
            println!("# Effective configuration ({}__* overrides applied)", ENV_PREFIX);
            print!("{}", to_toml(&config)?);
        }
        Err(e) => {
            println!("Configuration error: {:#}", e);
            return Err(e);
        }
    }

    Ok(())
}
