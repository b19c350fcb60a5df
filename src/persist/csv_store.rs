//! Canonical CSV files: the hand-off between the fetch pipeline and the
//! analysis commands.

use std::fs;
use std::path::Path;

use tracing::info;

use crate::model::{AirError, Measurement, Station};

pub const MEASUREMENT_COLUMNS: [&str; 11] = [
    "date",
    "datetime",
    "station_id",
    "station_name",
    "lat",
    "lon",
    "station_type",
    "pollutant",
    "unit",
    "value",
    "qc_flag",
];

pub const STATION_COLUMNS: [&str; 9] = [
    "station_id",
    "station_name",
    "id_arpa",
    "inizio_operativita",
    "fine_operativita",
    "inquinanti",
    "lon",
    "lat",
    "location",
];

/// Writes `rows` under an explicit header so that an empty file still
/// carries the canonical columns.
fn write_rows<T: serde::Serialize>(path: &Path, header: &[&str], rows: &[T]) -> Result<(), AirError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    writer.write_record(header)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_measurements_csv(path: &Path, measurements: &[Measurement]) -> Result<(), AirError> {
    write_rows(path, &MEASUREMENT_COLUMNS, measurements)?;
    info!(path = %path.display(), rows = measurements.len(), "wrote measurements CSV");
    Ok(())
}

pub fn write_stations_csv(path: &Path, stations: &[Station]) -> Result<(), AirError> {
    write_rows(path, &STATION_COLUMNS, stations)?;
    info!(path = %path.display(), rows = stations.len(), "wrote stations CSV");
    Ok(())
}

/// Reads a canonical measurements CSV written by `write_measurements_csv`.
pub fn read_measurements_csv(path: &Path) -> Result<Vec<Measurement>, AirError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut measurements = Vec::new();
    for row in reader.deserialize() {
        measurements.push(row?);
    }
    Ok(measurements)
}

pub fn read_stations_csv(path: &Path) -> Result<Vec<Station>, AirError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut stations = Vec::new();
    for row in reader.deserialize() {
        stations.push(row?);
    }
    Ok(stations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DEFAULT_UNIT;
    use chrono::NaiveDate;

    fn sample() -> Measurement {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        Measurement {
            date: Some(date),
            datetime: date.and_hms_opt(0, 0, 0),
            station_id: "1".to_string(),
            station_name: "Verziere".to_string(),
            lat: Some(45.463346),
            lon: None,
            station_type: None,
            pollutant: "PM10".to_string(),
            unit: DEFAULT_UNIT.to_string(),
            value: 33.5,
            qc_flag: 0,
        }
    }

    #[test]
    fn test_measurements_file_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("aq.csv");
        let mut undated = sample();
        undated.date = None;
        undated.datetime = None;
        let rows = vec![sample(), undated];

        write_measurements_csv(&path, &rows).expect("write succeeds");
        let back = read_measurements_csv(&path).expect("read succeeds");
        assert_eq!(back, rows);
    }

    #[test]
    fn test_header_is_canonical_even_when_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        write_measurements_csv(&path, &[]).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.trim_end(), MEASUREMENT_COLUMNS.join(","));
        assert!(read_measurements_csv(&path).unwrap().is_empty());
    }

    #[test]
    fn test_stations_file_column_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stations.csv");
        let station = Station {
            station_id: Some("1".to_string()),
            station_name: Some("Verziere".to_string()),
            lon: Some(9.195),
            lat: Some(45.463),
            ..Default::default()
        };
        write_stations_csv(&path, std::slice::from_ref(&station)).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some(STATION_COLUMNS.join(",").as_str()));
        assert_eq!(lines.next(), Some("1,Verziere,,,,,9.195,45.463,"));
        assert_eq!(read_stations_csv(&path).unwrap(), vec![station]);
    }
}
