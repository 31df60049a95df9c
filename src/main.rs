use analytics::AnalyticsEngine;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use configuration::Settings;
use core_types::TradeRecord;
use loader::{TradeLoader, sort_chronologically};
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod display;
mod export;

/// The main entry point for the trade log analyzer.
fn main() -> Result<()> {
    // RUST_LOG and TRADELOG__* overrides may live in a .env file.
    dotenvy::dotenv().ok();

    // Logs go to stderr so the report tables on stdout stay clean.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => configuration::load_settings_from(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => configuration::load_settings().context("Failed to load configuration")?,
    };

    match cli.command {
        Commands::Analyze(args) => handle_analyze(args, &settings),
        Commands::Validate(args) => handle_validate(args, &settings),
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Computes trading-performance statistics from a CSV log of closed trades.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a TOML config file. Defaults to ./config.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute and print the KPI report for a trade log.
    Analyze(AnalyzeArgs),
    /// Load and validate a trade log without computing metrics.
    Validate(ValidateArgs),
}

#[derive(Parser)]
struct AnalyzeArgs {
    /// The CSV trade log to analyze.
    file: PathBuf,

    /// Also write the full analysis result as JSON to this path.
    #[arg(long)]
    json: Option<PathBuf>,

    /// Keep the file order instead of sorting trades by entry time.
    #[arg(long)]
    no_sort: bool,

    /// Only analyze trades tagged with this strategy label.
    #[arg(long)]
    strategy: Option<String>,

    /// Do not list the best and worst trades.
    #[arg(long)]
    no_trades: bool,
}

#[derive(Parser)]
struct ValidateArgs {
    /// The CSV trade log to validate.
    file: PathBuf,
}

// ==============================================================================
// Command Logic
// ==============================================================================

/// Handles the `analyze` command: load, order, compute, render, export.
fn handle_analyze(args: AnalyzeArgs, settings: &Settings) -> Result<()> {
    let mut trades = load_trades(&args.file, settings)?;

    if let Some(label) = &args.strategy {
        retain_strategy(&mut trades, label);
        if trades.is_empty() {
            tracing::warn!(strategy = %label, "No trades match the requested strategy.");
        }
    }

    if !args.no_sort {
        sort_chronologically(&mut trades);
    }

    let result = AnalyticsEngine::new()
        .compute_analysis(&trades)
        .context("Failed to analyze trade log")?;

    let show_trades = settings.report.show_trades && !args.no_trades;
    display::print_report(&result, &settings.report, show_trades);

    if let Some(path) = &args.json {
        export::write_json_file(&result, path)
            .with_context(|| format!("Failed to write JSON report to {}", path.display()))?;
        tracing::info!(path = %path.display(), "JSON report written.");
    }

    Ok(())
}

/// Handles the `validate` command.
fn handle_validate(args: ValidateArgs, settings: &Settings) -> Result<()> {
    let trades = load_trades(&args.file, settings)?;
    println!("{}: {} valid trades", args.file.display(), trades.len());
    Ok(())
}

fn load_trades(path: &Path, settings: &Settings) -> Result<Vec<TradeRecord>> {
    TradeLoader::new(settings.loader.clone())
        .from_path(path)
        .with_context(|| format!("Failed to load trade log {}", path.display()))
}

fn retain_strategy(trades: &mut Vec<TradeRecord>, label: &str) {
    trades.retain(|t| t.strategy == label);
}
