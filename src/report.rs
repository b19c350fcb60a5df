/// Per-pollutant dashboard report.
///
/// Bundles every analysis for one pollutant into a serializable value so
/// the CLI can print it as text or emit it as JSON for a charting front
/// end.

use serde::Serialize;

use crate::analysis::anomalies::{Anomaly, anomalous_years};
use crate::analysis::ranking::{StationRank, station_ranking};
use crate::analysis::series::{Frequency, LastYearSeries, MonthlyProfile, last_year_series, monthly_profile};
use crate::analysis::trends::{AnnualMean, TrendDirection, annual_means, annual_slope, classify_trend};
use crate::config::AnalysisConfig;
use crate::model::Measurement;
use crate::pollutants::find_pollutant;

#[derive(Debug, Clone, Serialize)]
pub struct PollutantInfo {
    pub code: String,
    pub name: Option<String>,
    pub health_note: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PollutantReport {
    pub pollutant: PollutantInfo,
    pub annual_means: Vec<AnnualMean>,
    /// Units per year.
    pub slope: Option<f64>,
    pub trend: Option<TrendDirection>,
    pub anomalies: Vec<Anomaly>,
    pub ranking: Vec<StationRank>,
    pub monthly_profile: MonthlyProfile,
    pub last_year: Option<LastYearSeries>,
}

/// Options that select the last-year series.
#[derive(Debug, Clone, Default)]
pub struct SeriesSelection {
    pub station_id: Option<String>,
    pub frequency: Frequency,
}

pub fn build_pollutant_report(
    measurements: &[Measurement],
    pollutant: &str,
    analysis: &AnalysisConfig,
    selection: &SeriesSelection,
) -> PollutantReport {
    let info = match find_pollutant(pollutant) {
        Some(p) => PollutantInfo {
            code: p.code.to_string(),
            name: Some(p.name.to_string()),
            health_note: Some(p.health_note.to_string()),
        },
        None => PollutantInfo {
            code: pollutant.to_string(),
            name: None,
            health_note: None,
        },
    };

    let annual = annual_means(measurements, pollutant, analysis.trend_years);
    let slope = annual_slope(&annual);
    let trend = slope.map(|s| classify_trend(s, analysis.trend_tolerance));
    let anomalies = anomalous_years(&annual, analysis.anomaly_z_threshold);

    PollutantReport {
        pollutant: info,
        slope,
        trend,
        anomalies,
        ranking: station_ranking(measurements, pollutant, analysis.top_n),
        monthly_profile: monthly_profile(measurements, pollutant),
        last_year: last_year_series(
            measurements,
            pollutant,
            selection.station_id.as_deref(),
            selection.frequency,
        ),
        annual_means: annual,
    }
}

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

// Below this coefficient of variation the last year reads as regular.
const REGULAR_CV: f64 = 0.3;

pub fn variability_label(cv: f64) -> &'static str {
    if cv < REGULAR_CV { "regular" } else { "variable" }
}

pub fn print_report(report: &PollutantReport) {
    let p = &report.pollutant;
    println!("\n═══════════════════════════════════════════════════════════");
    println!("{}", p.name.as_deref().unwrap_or(&p.code));
    println!("═══════════════════════════════════════════════════════════");
    if let Some(note) = &p.health_note {
        println!("{note}");
    }

    println!("\nAnnual means:");
    if report.annual_means.is_empty() {
        println!("  no data for this pollutant in the trend window");
    }
    for a in &report.annual_means {
        let flag = if report.anomalies.iter().any(|x| x.year == a.year) {
            "  ← anomalous"
        } else {
            ""
        };
        println!("  {}  {:>8.2}  (n={}){}", a.year, a.mean, a.count, flag);
    }
    match (report.slope, report.trend) {
        (Some(slope), Some(trend)) => println!("Trend: {trend} ({slope:+.2} per year)"),
        _ => println!("Trend: not enough years"),
    }

    println!("\nStation ranking:");
    for (i, r) in report.ranking.iter().enumerate() {
        println!(
            "  {}. {:<8} {:<28} {:>8.2}  (n={})",
            i + 1,
            r.station_id,
            r.station_name,
            r.mean,
            r.count
        );
    }

    println!("\nMonthly profile:");
    for m in &report.monthly_profile.months {
        let label = MONTHS.get(m.month as usize - 1).copied().unwrap_or("?");
        println!("  {label}  {:>8.2}", m.mean);
    }
    if let Some(ratio) = report.monthly_profile.seasonality {
        println!("Seasonality (max/min month): {ratio:.2}");
    }

    if let Some(series) = &report.last_year {
        println!(
            "\nLast year ({}, {}, station {}):",
            series.year,
            series.frequency,
            series.station_id.as_deref().unwrap_or("all")
        );
        if series.points.is_empty() {
            println!("  no data for this selection");
        }
        for point in &series.points {
            println!("  {}  {:>8.2}", point.period, point.mean);
        }
        if let Some(cv) = series.coefficient_of_variation {
            println!("Variability (CV): {cv:.2} ({})", variability_label(cv));
        }
    }
}
