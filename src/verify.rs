//! Data Source Verification Module
//!
//! Checks every configured dataset against the live portal (or its local
//! fallback) and reports whether it can be fetched, parsed, and mapped onto
//! the canonical schema.
//!
//! Run this after the portal republishes a resource: column names drift
//! between releases, and this catches it before a pipeline run does.

use chrono::Utc;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{Config, SourceConfig};
use crate::ingest::{self, fetch};
use crate::logging::log_source_failure;
use crate::model::AirError;
use crate::normalize::{normalize_measurements, normalize_stations};
use crate::sources::SourceKind;

// ============================================================================
// Verification Results
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    pub timestamp: String,
    pub results: Vec<SourceVerification>,
    pub summary: VerificationSummary,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerificationSummary {
    pub total: usize,
    pub working: usize,
    pub partial: usize,
    pub failed: usize,
}

impl VerificationSummary {
    /// Percentage of sources fully working; 0 when nothing was checked.
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.working as f64 / self.total as f64 * 100.0
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceVerification {
    pub name: String,
    pub kind: SourceKind,
    pub status: VerificationStatus,
    pub origin: Option<String>,
    pub used_fallback: bool,
    pub columns: Vec<String>,
    /// Essential roles that no column matched (measurement sources only).
    pub roles_missing: Vec<String>,
    pub raw_rows: usize,
    pub normalized_rows: usize,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum VerificationStatus {
    Success,
    PartialSuccess,
    Failed,
}

// ============================================================================
// Single Source
// ============================================================================

pub fn verify_source(client: &Client, source: &SourceConfig) -> SourceVerification {
    let mut result = SourceVerification {
        name: source.name.clone(),
        kind: source.kind,
        status: VerificationStatus::Failed,
        origin: None,
        used_fallback: false,
        columns: Vec::new(),
        roles_missing: Vec::new(),
        raw_rows: 0,
        normalized_rows: 0,
        error_message: None,
    };

    let loaded = match ingest::load_source(client, source) {
        Ok(loaded) => loaded,
        Err(e) => {
            log_source_failure(&source.name, "verification", &e);
            result.error_message = Some(e.to_string());
            return result;
        }
    };

    result.origin = Some(loaded.origin);
    result.used_fallback = loaded.used_fallback;
    result.columns = loaded.table.columns.clone();
    result.raw_rows = loaded.table.len();

    match source.kind {
        SourceKind::Measurements => {
            let normalized = normalize_measurements(loaded.table);
            result.roles_missing = normalized
                .mapping
                .missing_essential()
                .iter()
                .map(|role| role.to_string())
                .collect();
            result.normalized_rows = normalized.measurements.len();
        }
        SourceKind::Stations => {
            let stations = normalize_stations(loaded.table);
            result.normalized_rows = stations.iter().filter(|s| s.station_id.is_some()).count();
            if result.normalized_rows == 0 {
                result.roles_missing.push("station_id".to_string());
            }
        }
    }

    result.status = if result.roles_missing.is_empty() && result.normalized_rows > 0 {
        VerificationStatus::Success
    } else {
        VerificationStatus::PartialSuccess
    };
    result
}

// ============================================================================
// Full Verification
// ============================================================================

pub fn summarize(results: &[SourceVerification]) -> VerificationSummary {
    let mut summary = VerificationSummary {
        total: results.len(),
        ..Default::default()
    };
    for r in results {
        match r.status {
            VerificationStatus::Success => summary.working += 1,
            VerificationStatus::PartialSuccess => summary.partial += 1,
            VerificationStatus::Failed => summary.failed += 1,
        }
    }
    summary
}

pub fn run_full_verification(config: &Config) -> Result<VerificationReport, AirError> {
    let client = fetch::build_client(&config.http)?;

    let mut results = Vec::new();
    for source in &config.sources {
        info!(dataset = %source.name, "verifying");
        results.push(verify_source(&client, source));
    }

    let summary = summarize(&results);
    Ok(VerificationReport {
        timestamp: Utc::now().to_rfc3339(),
        results,
        summary,
    })
}

pub fn print_summary(report: &VerificationReport) {
    println!("\n═══════════════════════════════════════════════════════════");
    println!("📊 VERIFICATION SUMMARY");
    println!("═══════════════════════════════════════════════════════════");
    println!();
    for r in &report.results {
        match r.status {
            VerificationStatus::Success => println!(
                "✓ {:<14} OK ({} rows, {} columns){}",
                r.name,
                r.normalized_rows,
                r.columns.len(),
                if r.used_fallback { " [local fallback]" } else { "" }
            ),
            VerificationStatus::PartialSuccess => println!(
                "⚠ {:<14} Partial ({} of {} rows usable, missing: {:?})",
                r.name, r.normalized_rows, r.raw_rows, r.roles_missing
            ),
            VerificationStatus::Failed => println!(
                "✗ {:<14} FAILED: {}",
                r.name,
                r.error_message.as_deref().unwrap_or("Unknown")
            ),
        }
    }
    println!();
    let s = &report.summary;
    println!(
        "Overall Success Rate: {:.1}% ({}/{}, {} partial, {} failed)",
        s.success_rate(),
        s.working,
        s.total,
        s.partial,
        s.failed
    );
    println!("═══════════════════════════════════════════════════════════");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::SourceFormat;
    use std::fs;
    use std::path::PathBuf;

    fn local(name: &str, kind: SourceKind, path: PathBuf) -> SourceConfig {
        SourceConfig {
            name: name.to_string(),
            kind,
            format: SourceFormat::Auto,
            url: None,
            local_path: Some(path),
        }
    }

    fn client() -> Client {
        fetch::build_client(&Config::default().http).unwrap()
    }

    #[test]
    fn test_verify_statuses() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.json");
        fs::write(
            &good,
            r#"[{"stazione_id": 1, "data": "2024-01-01", "inquinante": "NO2", "valore": 40}]"#,
        )
        .unwrap();
        let partial = dir.path().join("partial.json");
        fs::write(&partial, r#"[{"foo": "x", "bar": "y"}]"#).unwrap();

        let client = client();
        let ok = verify_source(&client, &local("good", SourceKind::Measurements, good));
        assert_eq!(ok.status, VerificationStatus::Success);
        assert_eq!(ok.normalized_rows, 1);

        let part = verify_source(&client, &local("partial", SourceKind::Measurements, partial));
        assert_eq!(part.status, VerificationStatus::PartialSuccess);
        assert!(part.roles_missing.contains(&"value".to_string()));

        let failed = verify_source(
            &client,
            &local("gone", SourceKind::Measurements, dir.path().join("gone.json")),
        );
        assert_eq!(failed.status, VerificationStatus::Failed);
        assert!(failed.error_message.is_some());

        let summary = summarize(&[ok, part, failed]);
        assert_eq!((summary.total, summary.working, summary.partial, summary.failed), (3, 1, 1, 1));
        assert!((summary.success_rate() - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_success_rate_of_nothing_is_zero() {
        assert_eq!(VerificationSummary::default().success_rate(), 0.0);
    }
}
