/// Dashboard computations over the canonical measurement frame.
///
/// Everything here is pure: callers load measurements (usually from the
/// canonical CSV) and pass slices in. Pollutants are matched through
/// `pollutants::pollutant_key` and stations through `merge::station_key`,
/// so `PM2.5`/`PM25` and `1`/`1.0` select the same rows.
///
/// Submodules:
/// - `trends`    — annual means over the most recent years, slope, direction.
/// - `ranking`   — stations ordered by mean concentration.
/// - `series`    — last-year daily/monthly series and the monthly profile.
/// - `anomalies` — years whose annual mean is a z-score outlier.

pub mod anomalies;
pub mod ranking;
pub mod series;
pub mod trends;

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::merge::station_key;
use crate::model::Measurement;
use crate::pollutants::pollutant_key;

/// Calendar date of a measurement, from `date` or else `datetime`.
pub fn measurement_date(m: &Measurement) -> Option<NaiveDate> {
    m.date.or_else(|| m.datetime.map(|dt| dt.date()))
}

pub fn is_pollutant(m: &Measurement, pollutant: &str) -> bool {
    pollutant_key(&m.pollutant) == pollutant_key(pollutant)
}

pub fn is_station(m: &Measurement, station_id: &str) -> bool {
    station_key(&m.station_id) == station_key(station_id)
}

/// Running mean accumulator.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Mean {
    sum: f64,
    count: usize,
}

impl Mean {
    pub(crate) fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    pub(crate) fn value(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }

    pub(crate) fn count(&self) -> usize {
        self.count
    }
}

/// Distinct pollutant codes, sorted.
pub fn available_pollutants(measurements: &[Measurement]) -> Vec<String> {
    let mut seen: BTreeMap<String, String> = BTreeMap::new();
    for m in measurements {
        seen.entry(pollutant_key(&m.pollutant))
            .or_insert_with(|| m.pollutant.clone());
    }
    let mut codes: Vec<String> = seen.into_values().collect();
    codes.sort();
    codes
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationRef {
    pub station_id: String,
    pub station_name: String,
}

/// Distinct stations sorted by id (numeric ids in numeric order). The
/// first name seen for a station is kept.
pub fn available_stations(measurements: &[Measurement]) -> Vec<StationRef> {
    let mut seen: BTreeMap<String, StationRef> = BTreeMap::new();
    for m in measurements {
        seen.entry(station_key(&m.station_id)).or_insert_with(|| StationRef {
            station_id: m.station_id.clone(),
            station_name: m.station_name.clone(),
        });
    }
    let mut stations: Vec<(String, StationRef)> = seen.into_iter().collect();
    stations.sort_by(|(a, _), (b, _)| compare_station_ids(a, b));
    stations.into_iter().map(|(_, s)| s).collect()
}

/// Station id order: numeric ids by value and before any other id, the
/// rest lexically.
pub fn compare_station_ids(a: &str, b: &str) -> Ordering {
    let (a, b) = (station_key(a), station_key(b));
    match (a.parse::<i64>(), b.parse::<i64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(&b),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::model::{DEFAULT_UNIT, Measurement};
    use chrono::NaiveDate;

    pub fn m(station: &str, pollutant: &str, y: i32, mo: u32, d: u32, value: f64) -> Measurement {
        Measurement {
            date: NaiveDate::from_ymd_opt(y, mo, d),
            datetime: None,
            station_id: station.to_string(),
            station_name: format!("Station {station}"),
            lat: None,
            lon: None,
            station_type: None,
            pollutant: pollutant.to_string(),
            unit: DEFAULT_UNIT.to_string(),
            value,
            qc_flag: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::m;
    use super::*;

    #[test]
    fn test_available_pollutants_sorted_and_deduplicated() {
        let ms = vec![
            m("1", "PM10", 2024, 1, 1, 1.0),
            m("1", "NO2", 2024, 1, 1, 1.0),
            m("2", "PM10", 2024, 1, 1, 1.0),
            m("2", "pm10", 2024, 1, 1, 1.0),
        ];
        assert_eq!(available_pollutants(&ms), vec!["NO2", "PM10"]);
    }

    #[test]
    fn test_available_stations_numeric_order() {
        let ms = vec![
            m("10", "NO2", 2024, 1, 1, 1.0),
            m("2", "NO2", 2024, 1, 1, 1.0),
            m("2.0", "NO2", 2024, 1, 1, 1.0),
            m("MI-A", "NO2", 2024, 1, 1, 1.0),
        ];
        let ids: Vec<_> = available_stations(&ms)
            .into_iter()
            .map(|s| s.station_id)
            .collect();
        assert_eq!(ids, vec!["2", "10", "MI-A"]);
    }

    #[test]
    fn test_compare_station_ids() {
        assert_eq!(compare_station_ids("2", "10"), Ordering::Less);
        assert_eq!(compare_station_ids("10", "MI-A"), Ordering::Less);
        assert_eq!(compare_station_ids("MI-B", "MI-A"), Ordering::Greater);
        assert_eq!(compare_station_ids("1.0", "1"), Ordering::Equal);
    }

    #[test]
    fn test_measurement_date_falls_back_to_datetime() {
        let mut row = m("1", "NO2", 2024, 5, 6, 1.0);
        let dt = row.date.unwrap().and_hms_opt(13, 0, 0);
        row.date = None;
        assert_eq!(measurement_date(&row), None);
        row.datetime = dt;
        assert_eq!(measurement_date(&row), NaiveDate::from_ymd_opt(2024, 5, 6));
    }

    #[test]
    fn test_pollutant_matching_ignores_spelling() {
        let row = m("1", "PM2.5", 2024, 1, 1, 1.0);
        assert!(is_pollutant(&row, "pm25"));
        assert!(!is_pollutant(&row, "PM10"));
        assert!(is_station(&row, "1.0"));
    }
}
