//! CLI argument definitions for the air-quality service.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

use airmon_service::analysis::series::Frequency;
use airmon_service::config::DEFAULT_CONFIG_PATH;

#[derive(Parser)]
#[command(
    name = "airmon",
    version,
    about = "Milan air-quality data service",
    long_about = "Fetch the Comune di Milano air-quality datasets, normalize them into one\n\
                  canonical table, and compute trends, rankings and seasonal profiles."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (defaults apply when it does not exist).
    #[arg(long, value_name = "PATH", default_value = DEFAULT_CONFIG_PATH, global = true)]
    pub config: PathBuf,

    /// Increase log verbosity (-v for debug, -vv for trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Also append logs to a file.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Show timestamps in console log lines.
    #[arg(long, global = true)]
    pub timestamps: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Fetch all sources and write the canonical CSVs and database snapshot.
    Fetch(FetchArgs),

    /// Check that every configured source is reachable and parseable.
    Verify(VerifyArgs),

    /// Print the dashboard report for one pollutant.
    Analyze(AnalyzeArgs),
}

#[derive(Parser)]
pub struct FetchArgs {
    /// Do not write the database snapshot.
    #[arg(long = "skip-db")]
    pub skip_db: bool,

    /// Output directory for the CSV files (overrides the config).
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
}

#[derive(Parser)]
pub struct VerifyArgs {
    /// Print the report as JSON instead of a summary.
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser)]
pub struct AnalyzeArgs {
    /// Canonical measurements CSV (default: the configured output file).
    #[arg(long, value_name = "CSV")]
    pub input: Option<PathBuf>,

    /// Pollutant code; without it the available pollutants and stations
    /// are listed.
    #[arg(long)]
    pub pollutant: Option<String>,

    /// Station id for the last-year series (default: all stations).
    #[arg(long)]
    pub station: Option<String>,

    /// Aggregation of the last-year series: daily or monthly.
    #[arg(long, default_value = "monthly")]
    pub freq: Frequency,

    /// Print the report as JSON.
    #[arg(long)]
    pub json: bool,
}
