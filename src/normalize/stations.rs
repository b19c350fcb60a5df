//! Raw station registry → canonical `Station` rows.
//!
//! Unlike measurements, the station table has a known shape; only a few
//! columns are renamed. Rows are never dropped.

use crate::ingest::table::{RawTable, RawValue};
use crate::merge::station_key;
use crate::model::Station;

/// Source columns accepted for each canonical station column, in priority
/// order. The canonical name itself always comes first.
const STATION_ID_COLUMNS: &[&str] = &["station_id", "id", "id_amat"];
const STATION_NAME_COLUMNS: &[&str] = &["station_name", "nome"];
const LAT_COLUMNS: &[&str] = &["lat", "lat_y_4326"];
const LON_COLUMNS: &[&str] = &["lon", "long_x_4326"];

fn first_present(table: &RawTable, candidates: &[&str]) -> Option<usize> {
    candidates.iter().find_map(|c| table.column_index(c))
}

pub fn normalize_stations(mut table: RawTable) -> Vec<Station> {
    table.lowercase_columns();

    let station_id = first_present(&table, STATION_ID_COLUMNS);
    let station_name = first_present(&table, STATION_NAME_COLUMNS);
    let lat = first_present(&table, LAT_COLUMNS);
    let lon = first_present(&table, LON_COLUMNS);
    let id_arpa = table.column_index("id_arpa");
    let inizio = table.column_index("inizio_operativita");
    let fine = table.column_index("fine_operativita");
    let inquinanti = table.column_index("inquinanti");
    let location = table.column_index("location");

    let text = |row: &[RawValue], idx: Option<usize>| idx.and_then(|i| row.get(i)).and_then(RawValue::as_text);
    let number = |row: &[RawValue], idx: Option<usize>| idx.and_then(|i| row.get(i)).and_then(RawValue::as_f64);

    table
        .rows
        .iter()
        .map(|row| Station {
            station_id: text(row, station_id).map(|id| station_key(&id)),
            station_name: text(row, station_name),
            id_arpa: text(row, id_arpa),
            inizio_operativita: text(row, inizio),
            fine_operativita: text(row, fine),
            inquinanti: text(row, inquinanti),
            lon: number(row, lon),
            lat: number(row, lat),
            location: text(row, location),
        })
        .collect()
}
