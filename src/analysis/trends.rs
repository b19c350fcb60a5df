//! Long-term trend: annual means over the most recent years and the
//! direction of their least-squares slope.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::Datelike;
use serde::Serialize;

use crate::analysis::{Mean, is_pollutant, measurement_date};
use crate::model::Measurement;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnualMean {
    pub year: i32,
    pub mean: f64,
    pub count: usize,
}

/// Mean value per year for `pollutant`, restricted to the last `years`
/// distinct years present in the whole data set.
///
/// The window is chosen before filtering by pollutant, so a pollutant that
/// stopped being measured shows a gap rather than older years sliding in.
pub fn annual_means(measurements: &[Measurement], pollutant: &str, years: usize) -> Vec<AnnualMean> {
    let all_years: BTreeSet<i32> = measurements
        .iter()
        .filter_map(|m| measurement_date(m).map(|d| d.year()))
        .collect();
    let window: BTreeSet<i32> = all_years.iter().rev().take(years).copied().collect();

    let mut by_year: BTreeMap<i32, Mean> = BTreeMap::new();
    for m in measurements.iter().filter(|m| is_pollutant(m, pollutant)) {
        let Some(year) = measurement_date(m).map(|d| d.year()) else {
            continue;
        };
        if window.contains(&year) {
            by_year.entry(year).or_default().add(m.value);
        }
    }

    by_year
        .into_iter()
        .map(|(year, mean)| AnnualMean {
            year,
            mean: mean.value(),
            count: mean.count(),
        })
        .collect()
}

/// Least-squares slope of `(x, y)` points. `None` with fewer than two
/// points or when every x is the same.
pub fn linear_slope(points: &[(f64, f64)]) -> Option<f64> {
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f64;
    let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for (x, y) in points {
        sxx += (x - mean_x).powi(2);
        sxy += (x - mean_x) * (y - mean_y);
    }
    if sxx == 0.0 {
        return None;
    }
    Some(sxy / sxx)
}

/// Slope of the annual means, in units per year.
pub fn annual_slope(annual: &[AnnualMean]) -> Option<f64> {
    let points: Vec<(f64, f64)> = annual.iter().map(|a| (a.year as f64, a.mean)).collect();
    linear_slope(&points)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendDirection::Increasing => write!(f, "increasing"),
            TrendDirection::Decreasing => write!(f, "decreasing"),
            TrendDirection::Stable => write!(f, "stable"),
        }
    }
}

/// Slopes within `±tolerance` count as stable.
pub fn classify_trend(slope: f64, tolerance: f64) -> TrendDirection {
    if slope > tolerance {
        TrendDirection::Increasing
    } else if slope < -tolerance {
        TrendDirection::Decreasing
    } else {
        TrendDirection::Stable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::test_support::m;

    #[test]
    fn test_annual_means_window_and_mean() {
        let ms = vec![
            m("1", "NO2", 2020, 1, 1, 50.0),
            m("1", "NO2", 2022, 1, 1, 40.0),
            m("2", "NO2", 2022, 6, 1, 30.0),
            m("1", "NO2", 2023, 1, 1, 20.0),
            m("1", "PM10", 2024, 1, 1, 99.0),
        ];
        let annual = annual_means(&ms, "NO2", 3);
        // Window is 2022..=2024; NO2 has no 2024 rows.
        assert_eq!(annual.len(), 2);
        assert_eq!(annual[0], AnnualMean { year: 2022, mean: 35.0, count: 2 });
        assert_eq!(annual[1].year, 2023);
    }

    #[test]
    fn test_undated_rows_are_ignored() {
        let mut undated = m("1", "NO2", 2024, 1, 1, 1000.0);
        undated.date = None;
        let ms = vec![m("1", "NO2", 2024, 1, 1, 10.0), undated];
        let annual = annual_means(&ms, "NO2", 10);
        assert_eq!(annual, vec![AnnualMean { year: 2024, mean: 10.0, count: 1 }]);
    }

    #[test]
    fn test_linear_slope() {
        let slope = linear_slope(&[(2020.0, 10.0), (2021.0, 8.0), (2022.0, 6.0)]).unwrap();
        assert!((slope + 2.0).abs() < 1e-9);
        assert_eq!(linear_slope(&[(2020.0, 10.0)]), None);
        assert_eq!(linear_slope(&[(2020.0, 10.0), (2020.0, 12.0)]), None);
    }

    #[test]
    fn test_classify_trend() {
        assert_eq!(classify_trend(1.5, 0.1), TrendDirection::Increasing);
        assert_eq!(classify_trend(-0.5, 0.1), TrendDirection::Decreasing);
        assert_eq!(classify_trend(0.05, 0.1), TrendDirection::Stable);
        assert_eq!(classify_trend(-0.1, 0.1), TrendDirection::Stable);
    }
}
