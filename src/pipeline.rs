/// End-to-end snapshot build: fetch every configured source, normalize,
/// merge station metadata, and persist the canonical frame.
///
/// Measurement sources are processed in config order and concatenated in
/// that order. The station registry is best effort: if it cannot be read
/// the measurements are still written, just without enrichment.

use std::path::PathBuf;

use reqwest::blocking::Client;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::{Config, SourceConfig};
use crate::ingest::{self, fetch};
use crate::logging::{log_ingest_summary, log_source_failure};
use crate::merge::{MergeSummary, concat_measurements, merge_station_metadata};
use crate::model::{AirError, Measurement, Station};
use crate::normalize::{normalize_measurements, normalize_stations};
use crate::persist::{csv_store, db};
use crate::sources::SourceKind;

#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// Do not write the database snapshot even if enabled in config.
    pub skip_db: bool,
    /// Overrides `output.dir`.
    pub output_dir: Option<PathBuf>,
}

/// Per-source outcome.
#[derive(Debug, Clone, Serialize)]
pub struct SourceSummary {
    pub name: String,
    pub kind: SourceKind,
    pub origin: Option<String>,
    pub used_fallback: bool,
    pub raw_rows: usize,
    pub kept_rows: usize,
    pub dropped_rows: usize,
    pub error: Option<String>,
}

impl SourceSummary {
    fn failed(source: &SourceConfig, err: &AirError) -> Self {
        Self {
            name: source.name.clone(),
            kind: source.kind,
            origin: None,
            used_fallback: false,
            raw_rows: 0,
            kept_rows: 0,
            dropped_rows: 0,
            error: Some(err.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineSummary {
    pub sources: Vec<SourceSummary>,
    pub measurements: usize,
    pub stations: usize,
    pub merge: MergeSummary,
    pub measurements_csv: PathBuf,
    pub stations_csv: PathBuf,
    /// `None` when the database step was skipped.
    pub database: Option<db::SnapshotCounts>,
}

/// Output of the in-memory part of the pipeline, before anything is written.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub measurements: Vec<Measurement>,
    pub stations: Vec<Station>,
    pub merge: MergeSummary,
    pub sources: Vec<SourceSummary>,
}

fn load_measurements(
    client: &Client,
    source: &SourceConfig,
) -> Result<(Vec<Measurement>, SourceSummary), AirError> {
    let loaded = ingest::load_source(client, source)?;
    let normalized = normalize_measurements(loaded.table);
    let kept = normalized.measurements.len();
    log_ingest_summary(&source.name, normalized.total, kept, normalized.dropped);

    let missing = normalized.mapping.missing_essential();
    if !missing.is_empty() {
        warn!(dataset = %source.name, ?missing, "essential columns not found");
    }

    let summary = SourceSummary {
        name: source.name.clone(),
        kind: source.kind,
        origin: Some(loaded.origin),
        used_fallback: loaded.used_fallback,
        raw_rows: normalized.total,
        kept_rows: kept,
        dropped_rows: normalized.dropped,
        error: None,
    };
    Ok((normalized.measurements, summary))
}

fn load_stations(client: &Client, source: &SourceConfig) -> Result<(Vec<Station>, SourceSummary), AirError> {
    let loaded = ingest::load_source(client, source)?;
    let raw_rows = loaded.table.len();
    let stations = normalize_stations(loaded.table);
    let summary = SourceSummary {
        name: source.name.clone(),
        kind: source.kind,
        origin: Some(loaded.origin),
        used_fallback: loaded.used_fallback,
        raw_rows,
        kept_rows: stations.len(),
        dropped_rows: raw_rows - stations.len(),
        error: None,
    };
    Ok((stations, summary))
}

/// Fetches, normalizes and merges every configured source.
pub fn collect_snapshot(client: &Client, config: &Config) -> Result<Snapshot, AirError> {
    let mut summaries = Vec::new();
    let mut batches = Vec::new();

    for source in config.sources_of_kind(SourceKind::Measurements) {
        match load_measurements(client, source) {
            Ok((batch, summary)) => {
                batches.push(batch);
                summaries.push(summary);
            }
            Err(e) => {
                log_source_failure(&source.name, "measurement ingest", &e);
                if !config.pipeline.continue_on_source_error {
                    return Err(AirError::SourceUnavailable {
                        name: source.name.clone(),
                        reason: e.to_string(),
                    });
                }
                summaries.push(SourceSummary::failed(source, &e));
            }
        }
    }

    let mut measurements = concat_measurements(batches);
    if measurements.is_empty() {
        return Err(AirError::NoMeasurements);
    }

    let mut stations = Vec::new();
    for source in config.sources_of_kind(SourceKind::Stations) {
        match load_stations(client, source) {
            Ok((batch, summary)) => {
                stations.extend(batch);
                summaries.push(summary);
            }
            Err(e) => {
                log_source_failure(&source.name, "station ingest", &e);
                warn!(dataset = %source.name, "continuing without station metadata from this source");
                summaries.push(SourceSummary::failed(source, &e));
            }
        }
    }

    let merge = merge_station_metadata(&mut measurements, &stations);
    if merge.unmatched > 0 {
        warn!(
            unmatched = merge.unmatched,
            stations = ?merge.unmatched_station_ids,
            "measurements without station metadata"
        );
    }

    Ok(Snapshot {
        measurements,
        stations,
        merge,
        sources: summaries,
    })
}

/// Runs the full pipeline and writes the CSVs and, if enabled, the
/// database snapshot.
pub fn build_snapshot(config: &Config, options: &PipelineOptions) -> Result<PipelineSummary, AirError> {
    let client = fetch::build_client(&config.http)?;
    let snapshot = collect_snapshot(&client, config)?;

    let mut output = config.clone();
    if let Some(dir) = &options.output_dir {
        output.output.dir = dir.clone();
    }
    let measurements_csv = output.measurements_csv_path();
    let stations_csv = output.stations_csv_path();
    csv_store::write_measurements_csv(&measurements_csv, &snapshot.measurements)?;
    csv_store::write_stations_csv(&stations_csv, &snapshot.stations)?;

    let database = if config.database.enabled && !options.skip_db {
        let mut client = db::connect()?;
        Some(db::write_snapshot(
            &mut client,
            &config.database.schema,
            &snapshot.measurements,
            &snapshot.stations,
        )?)
    } else {
        info!("database snapshot skipped");
        None
    };

    Ok(PipelineSummary {
        measurements: snapshot.measurements.len(),
        stations: snapshot.stations.len(),
        sources: snapshot.sources,
        merge: snapshot.merge,
        measurements_csv,
        stations_csv,
        database,
    })
}

/// Prints a short human-readable run summary.
pub fn print_summary(summary: &PipelineSummary) {
    println!("\nSnapshot built");
    for source in &summary.sources {
        match &source.error {
            None => println!(
                "  ✓ {:<14} {:>7} rows kept ({} dropped){}",
                source.name,
                source.kept_rows,
                source.dropped_rows,
                if source.used_fallback { " [local fallback]" } else { "" }
            ),
            Some(e) => println!("  ✗ {:<14} {}", source.name, e),
        }
    }
    println!(
        "  measurements: {}  stations: {}  unmatched rows: {}",
        summary.measurements, summary.stations, summary.merge.unmatched
    );
    println!("  {}", summary.measurements_csv.display());
    println!("  {}", summary.stations_csv.display());
    if let Some(counts) = summary.database {
        println!(
            "  database: {} measurements, {} stations",
            counts.measurements, counts.stations
        );
    }
}
