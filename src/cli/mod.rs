//! CLI definitions.

pub mod commands;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rotation")]
#[command(
    author,
    version,
    about = "Triple moving-average rotation between a leveraged bull/bear ETF pair"
)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: PathBuf,

    /// Log level, overrides logging.level from the configuration
    #[arg(short, long)]
    pub log_level: Option<LogLevel>,

    /// Enable JSON log format
    #[arg(long)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one trading session against Alpaca
    Live(LiveArgs),
    /// Print recent signals
    Signals(SignalsArgs),
    /// Run backtesting simulation
    Backtest(BacktestArgs),
    /// Validate configuration
    ValidateConfig,
}

#[derive(clap::Args)]
pub struct LiveArgs {
    /// Compute and log the signal without reading holdings or placing orders
    #[arg(long)]
    pub dry_run: bool,

    /// Trade regardless of the market clock
    #[arg(long)]
    pub ignore_clock: bool,
}

#[derive(clap::Args)]
pub struct SignalsArgs {
    /// Number of most recent bars to print
    #[arg(short = 'n', long, default_value = "10")]
    pub last: usize,

    /// Directory of {SYMBOL}.csv files; Alpaca is used when omitted
    #[arg(long)]
    pub data: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(clap::Args)]
pub struct BacktestArgs {
    /// Start date (YYYY-MM-DD)
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// End date (YYYY-MM-DD)
    #[arg(long)]
    pub end: Option<NaiveDate>,

    /// Initial capital
    #[arg(long)]
    pub capital: Option<Decimal>,

    /// Directory of {SYMBOL}.csv files; Alpaca is used when omitted
    #[arg(long)]
    pub data: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Save the JSON report to a file
    #[arg(long)]
    pub save: Option<PathBuf>,

    /// Write the equity curve as CSV
    #[arg(long)]
    pub equity_csv: Option<PathBuf>,

    /// Write the trade log as CSV
    #[arg(long)]
    pub trades_csv: Option<PathBuf>,
}
