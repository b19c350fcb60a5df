//! Raw table → canonical `Measurement` rows.

use crate::ingest::table::{RawTable, RawValue};
use crate::model::{DEFAULT_UNIT, Measurement};
use crate::merge::station_key;
use crate::normalize::columns::{ColumnMapping, DATE_PART_COLUMNS, infer_measurement_columns};
use crate::normalize::dates::{datetime_from_parts, parse_datetime};

/// Result of normalizing one measurement table.
#[derive(Debug, Clone)]
pub struct NormalizedMeasurements {
    pub measurements: Vec<Measurement>,
    pub mapping: ColumnMapping,
    /// Raw rows seen.
    pub total: usize,
    /// Rows lacking a value, pollutant or station id.
    pub dropped: usize,
}

/// Resolved column indices for one table.
struct Columns {
    date: Option<usize>,
    parts: Option<[usize; 3]>,
    value: Option<usize>,
    pollutant: Option<usize>,
    station_id: Option<usize>,
    station_name: Option<usize>,
    lat: Option<usize>,
    lon: Option<usize>,
    unit: Option<usize>,
    station_type: Option<usize>,
    qc_flag: Option<usize>,
}

impl Columns {
    fn resolve(table: &RawTable, mapping: &ColumnMapping) -> Self {
        let idx = |name: &Option<String>| name.as_deref().and_then(|n| table.column_index(n));
        let parts = if mapping.date_from_parts {
            match DATE_PART_COLUMNS.map(|p| table.column_index(p)) {
                [Some(y), Some(m), Some(d)] => Some([y, m, d]),
                _ => None,
            }
        } else {
            None
        };
        Self {
            date: idx(&mapping.date),
            parts,
            value: idx(&mapping.value),
            pollutant: idx(&mapping.pollutant),
            station_id: idx(&mapping.station_id),
            station_name: idx(&mapping.station_name),
            lat: idx(&mapping.lat),
            lon: idx(&mapping.lon),
            unit: idx(&mapping.unit),
            station_type: idx(&mapping.station_type),
            qc_flag: idx(&mapping.qc_flag),
        }
    }
}

fn cell<'a>(row: &'a [RawValue], column: Option<usize>) -> Option<&'a RawValue> {
    column.and_then(|i| row.get(i))
}

/// Normalizes a measurement table into canonical rows.
///
/// Column names are lowercased, roles inferred with
/// `infer_measurement_columns`, and every row converted. Rows without a
/// numeric value, a pollutant or a station id are dropped; rows whose date
/// cannot be parsed are kept with an empty date.
pub fn normalize_measurements(mut table: RawTable) -> NormalizedMeasurements {
    table.lowercase_columns();
    let mapping = infer_measurement_columns(&table);
    let cols = Columns::resolve(&table, &mapping);

    let total = table.len();
    let mut measurements = Vec::with_capacity(total);

    for row in &table.rows {
        let value = cell(row, cols.value).and_then(RawValue::as_f64);
        let pollutant = cell(row, cols.pollutant).and_then(RawValue::as_text);
        let station_id = cell(row, cols.station_id)
            .and_then(RawValue::as_text)
            .map(|id| station_key(&id));
        let (Some(value), Some(pollutant), Some(station_id)) = (value, pollutant, station_id) else {
            continue;
        };

        let datetime = match cols.parts {
            Some([y, m, d]) => datetime_from_parts(&row[y], &row[m], &row[d]),
            None => cell(row, cols.date).and_then(parse_datetime),
        };

        let station_name = cell(row, cols.station_name)
            .and_then(RawValue::as_text)
            .unwrap_or_else(|| station_id.clone());
        let unit = cell(row, cols.unit)
            .and_then(RawValue::as_text)
            .unwrap_or_else(|| DEFAULT_UNIT.to_string());
        let qc_flag = cell(row, cols.qc_flag)
            .and_then(RawValue::as_f64)
            .map_or(0, |f| f as i64);

        measurements.push(Measurement {
            date: datetime.map(|dt| dt.date()),
            datetime,
            station_id,
            station_name,
            lat: cell(row, cols.lat).and_then(RawValue::as_f64),
            lon: cell(row, cols.lon).and_then(RawValue::as_f64),
            station_type: cell(row, cols.station_type).and_then(RawValue::as_text),
            pollutant,
            unit,
            value,
            qc_flag,
        });
    }

    let dropped = total - measurements.len();
    NormalizedMeasurements {
        measurements,
        mapping,
        total,
        dropped,
    }
}
