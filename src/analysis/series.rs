//! Short-term views: the latest year at daily or monthly resolution, and
//! the average seasonal profile.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::analysis::{Mean, is_pollutant, is_station, measurement_date};
use crate::model::Measurement;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    #[default]
    Monthly,
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frequency::Daily => write!(f, "daily"),
            Frequency::Monthly => write!(f, "monthly"),
        }
    }
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "d" | "daily" => Ok(Frequency::Daily),
            "m" | "monthly" => Ok(Frequency::Monthly),
            other => Err(format!("unknown frequency '{other}' (expected daily or monthly)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    /// First day of the period.
    pub period: NaiveDate,
    pub mean: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LastYearSeries {
    pub year: i32,
    pub frequency: Frequency,
    /// `None` when all stations are averaged together.
    pub station_id: Option<String>,
    pub points: Vec<SeriesPoint>,
    /// Population standard deviation of the point means over their mean.
    /// `None` with fewer than two points or a non-positive mean.
    pub coefficient_of_variation: Option<f64>,
}

/// Latest year present in the whole data set, any pollutant.
pub fn latest_year(measurements: &[Measurement]) -> Option<i32> {
    measurements
        .iter()
        .filter_map(|m| measurement_date(m).map(|d| d.year()))
        .max()
}

/// Series of `pollutant` during the latest year of the data set.
///
/// Periods without data are omitted. Returns `None` when no row is dated.
/// The points are empty when the selection has no rows in that year.
pub fn last_year_series(
    measurements: &[Measurement],
    pollutant: &str,
    station_id: Option<&str>,
    frequency: Frequency,
) -> Option<LastYearSeries> {
    let year = latest_year(measurements)?;

    let mut by_period: BTreeMap<NaiveDate, Mean> = BTreeMap::new();
    for m in measurements {
        if !is_pollutant(m, pollutant) || station_id.is_some_and(|s| !is_station(m, s)) {
            continue;
        }
        let Some(date) = measurement_date(m).filter(|d| d.year() == year) else {
            continue;
        };
        let period = match frequency {
            Frequency::Daily => date,
            Frequency::Monthly => date.with_day(1).unwrap_or(date),
        };
        by_period.entry(period).or_default().add(m.value);
    }

    let points: Vec<SeriesPoint> = by_period
        .into_iter()
        .map(|(period, mean)| SeriesPoint {
            period,
            mean: mean.value(),
            count: mean.count(),
        })
        .collect();
    let coefficient_of_variation = coefficient_of_variation(&points);

    Some(LastYearSeries {
        year,
        frequency,
        station_id: station_id.map(str::to_string),
        points,
        coefficient_of_variation,
    })
}

fn coefficient_of_variation(points: &[SeriesPoint]) -> Option<f64> {
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f64;
    let mean = points.iter().map(|p| p.mean).sum::<f64>() / n;
    if mean <= 0.0 {
        return None;
    }
    let variance = points.iter().map(|p| (p.mean - mean).powi(2)).sum::<f64>() / n;
    Some(variance.sqrt() / mean)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthMean {
    pub month: u32,
    pub mean: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyProfile {
    pub months: Vec<MonthMean>,
    /// Highest monthly mean over the lowest. `None` with fewer than two
    /// months or a non-positive minimum.
    pub seasonality: Option<f64>,
}

/// Mean `pollutant` value per calendar month across all years.
pub fn monthly_profile(measurements: &[Measurement], pollutant: &str) -> MonthlyProfile {
    let mut by_month: BTreeMap<u32, Mean> = BTreeMap::new();
    for m in measurements.iter().filter(|m| is_pollutant(m, pollutant)) {
        if let Some(date) = measurement_date(m) {
            by_month.entry(date.month()).or_default().add(m.value);
        }
    }

    let months: Vec<MonthMean> = by_month
        .into_iter()
        .map(|(month, mean)| MonthMean {
            month,
            mean: mean.value(),
            count: mean.count(),
        })
        .collect();

    let seasonality = if months.len() < 2 {
        None
    } else {
        let max = months.iter().map(|m| m.mean).fold(f64::MIN, f64::max);
        let min = months.iter().map(|m| m.mean).fold(f64::MAX, f64::min);
        (min > 0.0).then(|| max / min)
    };

    MonthlyProfile { months, seasonality }
}
