//! CLI definitions.

pub mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "scalper")]
#[command(author, version, about = "Multi-symbol EMA ribbon scalping engine")]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: PathBuf,

    /// Log level
    #[arg(short, long, default_value = "info")]
    pub log_level: LogLevel,

    /// Enable JSON log format
    #[arg(long)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Replay archived bars through the strategy
    Backtest(BacktestArgs),
    /// Forward-replay archived bars against a simulated broker
    Paper(PaperArgs),
    /// Start live trading
    Live(LiveArgs),
    /// List available strategies
    Strategies,
    /// Validate configuration
    ValidateConfig,
}

#[derive(clap::Args)]
pub struct BacktestArgs {
    /// Symbols to run (comma-separated); defaults to all configured
    #[arg(short = 'S', long, value_delimiter = ',')]
    pub symbols: Vec<String>,

    /// Inclusive start date (YYYY-MM-DD), overrides the config
    #[arg(long)]
    pub from: Option<String>,

    /// Inclusive end date (YYYY-MM-DD), overrides the config
    #[arg(long)]
    pub to: Option<String>,

    /// Initial capital, overrides the config
    #[arg(long)]
    pub capital: Option<f64>,

    /// Output format (text, json)
    #[arg(long, default_value = "text")]
    pub output: String,

    /// Save the full report as JSON
    #[arg(long)]
    pub save: Option<PathBuf>,

    /// Save the equity curve as CSV
    #[arg(long)]
    pub equity: Option<PathBuf>,
}

#[derive(clap::Args)]
pub struct PaperArgs {
    /// Symbols to run (comma-separated); defaults to all configured
    #[arg(short = 'S', long, value_delimiter = ',')]
    pub symbols: Vec<String>,

    /// Initial capital, overrides the config
    #[arg(long)]
    pub capital: Option<f64>,
}

#[derive(clap::Args)]
pub struct LiveArgs {
    /// Symbols to run (comma-separated); defaults to all configured
    #[arg(short = 'S', long, value_delimiter = ',')]
    pub symbols: Vec<String>,

    /// Evaluate signals without submitting orders
    #[arg(long)]
    pub dry_run: bool,
}
