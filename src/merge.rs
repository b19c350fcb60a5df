//! Joining measurements with station reference metadata.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use crate::model::{Measurement, Station};

/// Join key for station identifiers.
///
/// Ids arrive as `1`, `1.0`, `"001"` or `" 1 "` depending on the file, so
/// purely numeric ids are compared as integers.
pub fn station_key(id: &str) -> String {
    let trimmed = id.trim();
    if let Ok(n) = trimmed.parse::<f64>() {
        if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
            return format!("{}", n as i64);
        }
    }
    trimmed.to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MergeSummary {
    /// Measurement rows whose station was found.
    pub matched: usize,
    pub unmatched: usize,
    pub unmatched_station_ids: BTreeSet<String>,
}

/// Left-joins station metadata onto measurements.
///
/// Only missing information is filled: the station name when it is empty
/// or merely repeats the id, and coordinates when absent. When several
/// station rows share a key, the first one wins.
pub fn merge_station_metadata(measurements: &mut [Measurement], stations: &[Station]) -> MergeSummary {
    let mut index: HashMap<String, &Station> = HashMap::new();
    for station in stations {
        if let Some(id) = station.station_id.as_deref() {
            index.entry(station_key(id)).or_insert(station);
        }
    }

    let mut summary = MergeSummary::default();
    for m in measurements.iter_mut() {
        let Some(station) = index.get(&station_key(&m.station_id)) else {
            summary.unmatched += 1;
            summary.unmatched_station_ids.insert(m.station_id.clone());
            continue;
        };
        summary.matched += 1;

        if m.station_name.trim().is_empty() || m.station_name == m.station_id {
            if let Some(name) = &station.station_name {
                m.station_name = name.clone();
            }
        }
        if m.lat.is_none() {
            m.lat = station.lat;
        }
        if m.lon.is_none() {
            m.lon = station.lon;
        }
    }
    summary
}

/// Concatenates measurement batches in order.
pub fn concat_measurements<I>(batches: I) -> Vec<Measurement>
where
    I: IntoIterator<Item = Vec<Measurement>>,
{
    let mut all = Vec::new();
    for batch in batches {
        all.extend(batch);
    }
    all
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DEFAULT_UNIT;

    fn measurement(station_id: &str, name: &str) -> Measurement {
        Measurement {
            date: None,
            datetime: None,
            station_id: station_id.to_string(),
            station_name: name.to_string(),
            lat: None,
            lon: None,
            station_type: None,
            pollutant: "NO2".to_string(),
            unit: DEFAULT_UNIT.to_string(),
            value: 40.0,
            qc_flag: 0,
        }
    }

    fn station(id: &str, name: &str, lat: f64, lon: f64) -> Station {
        Station {
            station_id: Some(id.to_string()),
            station_name: Some(name.to_string()),
            lat: Some(lat),
            lon: Some(lon),
            ..Default::default()
        }
    }

    #[test]
    fn test_station_key_normalizes_numeric_ids() {
        assert_eq!(station_key("1"), "1");
        assert_eq!(station_key("1.0"), "1");
        assert_eq!(station_key(" 001 "), "1");
        assert_eq!(station_key("MI-501"), "MI-501");
        assert_eq!(station_key("1.5"), "1.5");
    }

    #[test]
    fn test_merge_fills_name_and_coordinates() {
        let mut ms = vec![measurement("1", "1"), measurement("2.0", "2.0"), measurement("9", "9")];
        let stations = vec![station("1", "Verziere", 45.46, 9.19), station("002", "Liguria", 45.44, 9.16)];

        let summary = merge_station_metadata(&mut ms, &stations);
        assert_eq!(summary.matched, 2);
        assert_eq!(summary.unmatched, 1);
        assert!(summary.unmatched_station_ids.contains("9"));

        assert_eq!(ms[0].station_name, "Verziere");
        assert_eq!(ms[0].lat, Some(45.46));
        assert_eq!(ms[1].station_name, "Liguria");
        assert_eq!(ms[2].station_name, "9");
        assert!(ms[2].lat.is_none());
    }

    #[test]
    fn test_merge_never_overwrites_present_values() {
        let mut m = measurement("1", "Senato");
        m.lat = Some(1.0);
        let mut ms = vec![m];
        merge_station_metadata(&mut ms, &[station("1", "Verziere", 45.46, 9.19)]);
        assert_eq!(ms[0].station_name, "Senato");
        assert_eq!(ms[0].lat, Some(1.0));
        assert_eq!(ms[0].lon, Some(9.19));
    }

    #[test]
    fn test_first_duplicate_station_wins() {
        let mut ms = vec![measurement("1", "1")];
        merge_station_metadata(
            &mut ms,
            &[station("1", "First", 1.0, 1.0), station("1.0", "Second", 2.0, 2.0)],
        );
        assert_eq!(ms[0].station_name, "First");
    }

    #[test]
    fn test_concat_preserves_order() {
        let all = concat_measurements(vec![
            vec![measurement("1", "a")],
            vec![],
            vec![measurement("2", "b"), measurement("3", "c")],
        ]);
        let ids: Vec<_> = all.iter().map(|m| m.station_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }
}
