/// Dataset registry for the Milan air-quality service.
///
/// Defines the official open-data resources published by the Comune di
/// Milano that this service ingests. This is the single source of truth
/// for the default URLs. Configuration files override them, but the
/// built-in defaults are derived from here.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

// ---------------------------------------------------------------------------
// Source classification
// ---------------------------------------------------------------------------

/// What a dataset contributes to the canonical frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Rows of (date, station, pollutant, value).
    Measurements,
    /// Station reference metadata joined onto measurements.
    Stations,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Measurements => write!(f, "measurements"),
            SourceKind::Stations => write!(f, "stations"),
        }
    }
}

/// Serialization format of a dataset file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Json,
    Csv,
    /// Decide from the file extension, then from the content.
    #[default]
    Auto,
}

impl SourceFormat {
    /// Resolves `Auto` using the extension of `location` (URL or path).
    ///
    /// Returns `Auto` unchanged when the extension is not conclusive; the
    /// reader then sniffs the content instead.
    pub fn resolve_for(self, location: &str) -> SourceFormat {
        if self != SourceFormat::Auto {
            return self;
        }
        let trimmed = location.split(['?', '#']).next().unwrap_or(location);
        match Path::new(trimmed)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("json") | Some("geojson") => SourceFormat::Json,
            Some("csv") | Some("tsv") | Some("txt") => SourceFormat::Csv,
            _ => SourceFormat::Auto,
        }
    }

    /// Guesses the format from the first non-whitespace byte.
    pub fn sniff(content: &str) -> SourceFormat {
        match content.trim_start_matches('\u{feff}').trim_start().chars().next() {
            Some('{') | Some('[') => SourceFormat::Json,
            _ => SourceFormat::Csv,
        }
    }
}

// ---------------------------------------------------------------------------
// Dataset metadata
// ---------------------------------------------------------------------------

/// Metadata for a single published dataset resource.
pub struct Dataset {
    /// Short identifier used in logs, config files and reports.
    pub name: &'static str,
    /// Title as published on the open-data portal.
    pub title: &'static str,
    pub url: &'static str,
    pub format: SourceFormat,
    pub kind: SourceKind,
    /// Why this dataset is ingested and what its quirks are.
    pub description: &'static str,
}

/// All official datasets ingested by default, measurement series first.
///
/// Source: dati.comune.milano.it (CKAN portal of the Comune di Milano).
pub static DATASET_REGISTRY: &[Dataset] = &[
    Dataset {
        name: "ds573",
        title: "Qualità dell'aria: rilevazioni per centralina (serie storica)",
        url: "https://dati.comune.milano.it/dataset/ad529de1-8398-43e9-bba5-c5012513f23f/resource/eade3387-bff8-4de0-ac24-09360f38ded7/download/ds573_inquinanti_aria.json",
        format: SourceFormat::Json,
        kind: SourceKind::Measurements,
        description: "Multi-year daily series. Columns are Italian \
                      (stazione_id, data, inquinante, valore); values may be \
                      missing for days the analyser was offline.",
    },
    Dataset {
        name: "ds407_2024",
        title: "Qualità dell'aria: dato giornaliero per stazione (2024)",
        url: "https://dati.comune.milano.it/dataset/dba6b6ff-792b-471d-9a2c-a625f1398f5f/resource/bcef81c8-4011-4225-93ee-f284387e8834/download/qaria_datoariagiornostazione_2024-12-24.json",
        format: SourceFormat::Json,
        kind: SourceKind::Measurements,
        description: "Current-year extract published with a different schema \
                      revision than ds573; column names drift between releases.",
    },
    Dataset {
        name: "stations",
        title: "Qualità dell'aria: stazioni di rilevamento",
        url: "https://dati.comune.milano.it/dataset/d6960c75-0a02-4fda-a85f-3b1c4aa725d6/resource/b301f327-7504-4efc-8b4a-5f4a29f9d0ff/download/qaria_stazione.csv",
        format: SourceFormat::Csv,
        kind: SourceKind::Stations,
        description: "Station registry with WGS84 coordinates \
                      (LAT_Y_4326 / LONG_X_4326). Semicolon separated.",
    },
];

/// Looks up a dataset by name. Returns `None` if not found.
pub fn find_dataset(name: &str) -> Option<&'static Dataset> {
    DATASET_REGISTRY.iter().find(|d| d.name == name)
}

/// Returns the datasets contributing the given kind, in registry order.
pub fn datasets_of_kind(kind: SourceKind) -> Vec<&'static Dataset> {
    DATASET_REGISTRY.iter().filter(|d| d.kind == kind).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
