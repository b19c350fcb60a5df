/// Core data types for the Milan air-quality service.
///
/// This module defines the canonical rows every dataset is coerced into,
/// plus the error type shared by all other modules. It contains no I/O.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Unit assumed when a dataset carries no unit column.
pub const DEFAULT_UNIT: &str = "µg/m3";

// ---------------------------------------------------------------------------
// Canonical rows
// ---------------------------------------------------------------------------

/// A single normalized measurement.
///
/// Field order is the column order of the canonical measurements CSV and
/// of the `measurements` table in the database snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub date: Option<NaiveDate>,
    pub datetime: Option<NaiveDateTime>,
    pub station_id: String,
    /// Falls back to `station_id` when the source has no name column.
    pub station_name: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub station_type: Option<String>,
    pub pollutant: String,
    pub unit: String,
    pub value: f64,
    pub qc_flag: i64,
}

/// Station reference metadata, one row per monitoring station.
///
/// Mirrors the columns published in the city's station registry
/// (`qaria_stazione.csv`), with the coordinate columns renamed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Station {
    pub station_id: Option<String>,
    pub station_name: Option<String>,
    pub id_arpa: Option<String>,
    pub inizio_operativita: Option<String>,
    pub fine_operativita: Option<String>,
    pub inquinanti: Option<String>,
    pub lon: Option<f64>,
    pub lat: Option<f64>,
    pub location: Option<String>,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can arise while fetching, normalizing or persisting data.
#[derive(Debug, Error)]
pub enum AirError {
    /// Non-2xx HTTP response from the open-data portal.
    #[error("HTTP error: {status} for {url}")]
    HttpError { url: String, status: u16 },

    /// The request itself failed (DNS, TLS, timeout...).
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// JSON parsed fine but none of the reader strategies produced a table.
    #[error("Unsupported JSON layout: {0}")]
    UnsupportedLayout(String),

    /// The dataset contained no rows at all.
    #[error("Empty dataset: {0}")]
    EmptyDataset(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Config file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("Environment variable {0} must be set")]
    MissingEnv(&'static str),

    /// A schema or table name that cannot be safely interpolated into SQL.
    #[error("Invalid SQL identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("Database error: {0}")]
    Database(#[from] postgres::Error),

    /// Neither the URL nor the local fallback could be read.
    #[error("Source {name} unavailable: {reason}")]
    SourceUnavailable { name: String, reason: String },

    /// Every measurement source normalized to zero rows.
    #[error("No measurements survived normalization")]
    NoMeasurements,
}
