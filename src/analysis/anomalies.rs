//! Outlier years among annual means.

use serde::Serialize;

use crate::analysis::trends::AnnualMean;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Anomaly {
    pub year: i32,
    pub mean: f64,
    pub z_score: f64,
}

/// Years whose annual mean lies more than `z_threshold` population
/// standard deviations from the mean of all years.
///
/// Needs at least three years; a zero deviation yields no anomalies.
pub fn anomalous_years(annual: &[AnnualMean], z_threshold: f64) -> Vec<Anomaly> {
    if annual.len() < 3 {
        return Vec::new();
    }
    let n = annual.len() as f64;
    let mean = annual.iter().map(|a| a.mean).sum::<f64>() / n;
    let variance = annual.iter().map(|a| (a.mean - mean).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();
    if std_dev == 0.0 {
        return Vec::new();
    }

    annual
        .iter()
        .filter_map(|a| {
            let z_score = (a.mean - mean) / std_dev;
            (z_score.abs() > z_threshold).then_some(Anomaly {
                year: a.year,
                mean: a.mean,
                z_score,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annual(values: &[(i32, f64)]) -> Vec<AnnualMean> {
        values
            .iter()
            .map(|&(year, mean)| AnnualMean { year, mean, count: 1 })
            .collect()
    }

    #[test]
    fn test_spike_year_is_flagged() {
        let years = annual(&[
            (2015, 30.0),
            (2016, 31.0),
            (2017, 29.0),
            (2018, 30.0),
            (2019, 31.0),
            (2020, 29.0),
            (2021, 30.0),
            (2022, 60.0),
        ]);
        let anomalies = anomalous_years(&years, 2.0);
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].year, 2022);
        assert!(anomalies[0].z_score > 2.0);
    }

    #[test]
    fn test_too_few_points_or_flat_series() {
        assert!(anomalous_years(&annual(&[(2020, 1.0), (2021, 100.0)]), 0.5).is_empty());
        assert!(anomalous_years(&annual(&[(2020, 5.0), (2021, 5.0), (2022, 5.0)]), 0.5).is_empty());
    }
}
