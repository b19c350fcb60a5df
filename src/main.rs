//! `airmon` command-line entry point.

use std::error::Error;
use std::process;

use clap::Parser;
use tracing::{error, info};

use airmon_service::analysis::{available_pollutants, available_stations};
use airmon_service::config::Config;
use airmon_service::logging::{LogConfig, init_logging};
use airmon_service::model::AirError;
use airmon_service::persist::csv_store;
use airmon_service::pipeline::{self, PipelineOptions};
use airmon_service::report::{SeriesSelection, build_pollutant_report, print_report};
use airmon_service::verify::{VerificationStatus, print_summary, run_full_verification};

mod cli;

use crate::cli::{AnalyzeArgs, Cli, Command, FetchArgs, VerifyArgs};

fn main() {
    let cli = Cli::parse();

    let log_config = LogConfig {
        log_file: cli.log_file.clone(),
        console_timestamps: cli.timestamps,
        ..LogConfig::from_verbosity(cli.verbose)
    };
    if let Err(e) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {e}");
        process::exit(1);
    }

    let result = Config::load_or_default(&cli.config)
        .map_err(Box::<dyn Error>::from)
        .and_then(|config| match &cli.command {
            Command::Fetch(args) => run_fetch(&config, args),
            Command::Verify(args) => run_verify(&config, args),
            Command::Analyze(args) => run_analyze(&config, args),
        });

    if let Err(e) = result {
        error!("{e}");
        process::exit(1);
    }
}

fn run_fetch(config: &Config, args: &FetchArgs) -> Result<(), Box<dyn Error>> {
    let options = PipelineOptions {
        skip_db: args.skip_db,
        output_dir: args.output_dir.clone(),
    };
    let summary = pipeline::build_snapshot(config, &options)?;
    pipeline::print_summary(&summary);
    Ok(())
}

fn run_verify(config: &Config, args: &VerifyArgs) -> Result<(), Box<dyn Error>> {
    let report = run_full_verification(config)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }
    if report
        .results
        .iter()
        .any(|r| r.status == VerificationStatus::Failed)
    {
        return Err("one or more sources failed verification".into());
    }
    Ok(())
}

fn run_analyze(config: &Config, args: &AnalyzeArgs) -> Result<(), Box<dyn Error>> {
    let input = args
        .input
        .clone()
        .unwrap_or_else(|| config.measurements_csv_path());
    info!(path = %input.display(), "loading measurements");
    let measurements = csv_store::read_measurements_csv(&input)?;
    if measurements.is_empty() {
        return Err(AirError::NoMeasurements.into());
    }

    let Some(pollutant) = args.pollutant.as_deref() else {
        println!("Pollutants:");
        for p in available_pollutants(&measurements) {
            println!("  {p}");
        }
        println!("Stations:");
        for s in available_stations(&measurements) {
            println!("  {:<8} {}", s.station_id, s.station_name);
        }
        return Ok(());
    };

    let selection = SeriesSelection {
        station_id: args.station.clone(),
        frequency: args.freq,
    };
    let report = build_pollutant_report(&measurements, pollutant, &config.analysis, &selection);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}
