//! Flexible JSON reader.
//!
//! The portal publishes the same kind of data in several JSON shapes
//! depending on the export tool and the year: a plain array of records, a
//! column-oriented object, a CKAN envelope with the records nested under
//! `result.records`, or a GeoJSON `features` array. Strategies are tried in
//! that order and the first that yields a table wins.

use std::collections::{HashMap, VecDeque};
use std::fmt;

use serde_json::{Map, Value};

use crate::ingest::table::{RawTable, RawValue};
use crate::model::AirError;

/// Which strategy produced the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JsonLayout {
    /// Top-level array of objects.
    Records,
    /// `{"column": [v0, v1, ...]}` or `{"column": {"0": v0, ...}}`.
    Columns,
    /// Array of objects found under the given dotted path.
    NestedRecords(String),
    /// A lone object flattened into one row.
    SingleObject,
    /// Top-level array of scalars, exposed as column `"0"`.
    Scalars,
}

impl fmt::Display for JsonLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsonLayout::Records => write!(f, "records"),
            JsonLayout::Columns => write!(f, "columns"),
            JsonLayout::NestedRecords(path) => write!(f, "nested records at '{}'", path),
            JsonLayout::SingleObject => write!(f, "single object"),
            JsonLayout::Scalars => write!(f, "scalar array"),
        }
    }
}

/// Parses `text` into a table using the first strategy that fits.
pub fn read_json_flexible(text: &str) -> Result<(RawTable, JsonLayout), AirError> {
    let root: Value = serde_json::from_str(text.trim_start_matches('\u{feff}'))?;

    match &root {
        Value::Array(items) => {
            if items.is_empty() {
                return Err(AirError::EmptyDataset("top-level JSON array is empty".to_string()));
            }
            if items.iter().all(|v| v.is_object() || v.is_null()) {
                return Ok((records_to_table(items), JsonLayout::Records));
            }
            if items.iter().all(|v| !v.is_object() && !v.is_array()) {
                let mut table = RawTable::new(vec!["0".to_string()]);
                for item in items {
                    table.push_row(vec![RawValue::from(item)]);
                }
                return Ok((table, JsonLayout::Scalars));
            }
            Err(AirError::UnsupportedLayout(
                "top-level array mixes records with other values".to_string(),
            ))
        }
        Value::Object(map) => {
            if map.is_empty() {
                return Err(AirError::EmptyDataset("top-level JSON object is empty".to_string()));
            }
            if let Some(table) = columns_to_table(map) {
                return Ok((table, JsonLayout::Columns));
            }
            if let Some((path, records)) = find_nested_records(map) {
                return Ok((records_to_table(records), JsonLayout::NestedRecords(path)));
            }
            Ok((records_to_table(std::slice::from_ref(&root)), JsonLayout::SingleObject))
        }
        _ => Err(AirError::UnsupportedLayout(
            "top-level JSON value is a scalar".to_string(),
        )),
    }
}

/// Flattens nested objects into dotted column names (`properties.nome`).
fn flatten_into(prefix: &str, value: &Value, out: &mut Vec<(String, RawValue)>) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                let name = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten_into(&name, child, out);
            }
        }
        Value::Object(_) => out.push((prefix.to_string(), RawValue::Null)),
        other => out.push((prefix.to_string(), RawValue::from(other))),
    }
}

/// Builds a table from records; columns appear in first-seen order.
fn records_to_table(records: &[Value]) -> RawTable {
    let mut columns: Vec<String> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut sparse_rows: Vec<Vec<(usize, RawValue)>> = Vec::with_capacity(records.len());

    for record in records {
        let mut flat = Vec::new();
        if record.is_object() {
            flatten_into("", record, &mut flat);
        }
        let row = flat
            .into_iter()
            .map(|(name, cell)| {
                let idx = *index.entry(name.clone()).or_insert_with(|| {
                    columns.push(name);
                    columns.len() - 1
                });
                (idx, cell)
            })
            .collect();
        sparse_rows.push(row);
    }

    let mut table = RawTable::new(columns);
    let width = table.columns.len();
    for sparse in sparse_rows {
        let mut row = vec![RawValue::Null; width];
        for (idx, cell) in sparse {
            row[idx] = cell;
        }
        table.push_row(row);
    }
    table
}

/// Column-oriented layout: every value is an equal-length array of scalars,
/// or every value is an index→scalar object.
fn columns_to_table(map: &Map<String, Value>) -> Option<RawTable> {
    let is_scalar = |v: &Value| !v.is_object() && !v.is_array();

    if map
        .values()
        .all(|v| v.as_array().is_some_and(|a| a.iter().all(is_scalar)))
    {
        let lengths: Vec<usize> = map.values().filter_map(|v| v.as_array().map(Vec::len)).collect();
        let len = *lengths.first()?;
        if len == 0 || lengths.iter().any(|&l| l != len) {
            return None;
        }
        let mut table = RawTable::new(map.keys().cloned().collect());
        for i in 0..len {
            let row = map
                .values()
                .map(|v| v.as_array().map_or(RawValue::Null, |a| RawValue::from(&a[i])))
                .collect();
            table.push_row(row);
        }
        return Some(table);
    }

    if map
        .values()
        .all(|v| v.as_object().is_some_and(|o| !o.is_empty() && o.values().all(is_scalar)))
    {
        let mut row_keys: Vec<&String> = Vec::new();
        for inner in map.values().filter_map(Value::as_object) {
            for key in inner.keys() {
                if !row_keys.contains(&key) {
                    row_keys.push(key);
                }
            }
        }
        let mut table = RawTable::new(map.keys().cloned().collect());
        for key in row_keys {
            let row = map
                .values()
                .map(|v| {
                    v.get(key.as_str())
                        .map_or(RawValue::Null, RawValue::from)
                })
                .collect();
            table.push_row(row);
        }
        return Some(table);
    }

    None
}

/// Keys that hold the data rows in the envelopes we have seen. CKAN puts a
/// `fields` schema array next to `records`, so these win at equal depth.
const RECORD_KEYS: [&str; 4] = ["records", "features", "data", "rows"];

/// Breadth-first search for the shallowest non-empty array of objects.
fn find_nested_records(map: &Map<String, Value>) -> Option<(String, &[Value])> {
    let mut queue: VecDeque<(String, &Map<String, Value>)> = VecDeque::new();
    queue.push_back((String::new(), map));

    while let Some((prefix, current)) = queue.pop_front() {
        let mut first: Option<(String, &[Value])> = None;
        for (key, value) in current {
            let path = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{}.{}", prefix, key)
            };
            match value {
                Value::Array(items) if !items.is_empty() && items.iter().all(Value::is_object) => {
                    if RECORD_KEYS.contains(&key.as_str()) {
                        return Some((path, items.as_slice()));
                    }
                    first.get_or_insert((path, items.as_slice()));
                }
                Value::Object(inner) => queue.push_back((path, inner)),
                _ => {}
            }
        }
        if first.is_some() {
            return first;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_layout_unions_columns_in_first_seen_order() {
        let text = r#"[
            {"stazione_id": 1, "data": "2024-01-01", "inquinante": "NO2", "valore": 40},
            {"stazione_id": 2, "data": "2024-01-01", "inquinante": "PM10", "valore": null, "note": "x"}
        ]"#;
        let (table, layout) = read_json_flexible(text).expect("records parse");
        assert_eq!(layout, JsonLayout::Records);
        assert_eq!(
            table.columns,
            vec!["stazione_id", "data", "inquinante", "valore", "note"]
        );
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(0, 4), &RawValue::Null);
        assert_eq!(table.cell(1, 3), &RawValue::Null);
        assert_eq!(table.cell(0, 0), &RawValue::Number(1.0));
    }

    #[test]
    fn test_nested_objects_are_flattened_with_dots() {
        let text = r#"[{"id": "a", "geo": {"lat": 45.4, "lon": 9.2}}]"#;
        let (table, _) = read_json_flexible(text).unwrap();
        assert_eq!(table.columns, vec!["id", "geo.lat", "geo.lon"]);
    }

    #[test]
    fn test_column_oriented_arrays() {
        let text = r#"{"data": ["2024-01-01", "2024-01-02"], "valore": [10, 12]}"#;
        let (table, layout) = read_json_flexible(text).unwrap();
        assert_eq!(layout, JsonLayout::Columns);
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(1, 1), &RawValue::Number(12.0));
    }

    #[test]
    fn test_column_oriented_index_maps() {
        let text = r#"{"data": {"0": "2024-01-01", "1": "2024-01-02"}, "valore": {"0": 10, "1": 12}}"#;
        let (table, layout) = read_json_flexible(text).unwrap();
        assert_eq!(layout, JsonLayout::Columns);
        assert_eq!(table.columns, vec!["data", "valore"]);
        assert_eq!(table.cell(0, 0), &RawValue::Text("2024-01-01".to_string()));
    }

    #[test]
    fn test_unequal_column_arrays_fall_through() {
        let text = r#"{"a": [1, 2], "b": [1]}"#;
        let (table, layout) = read_json_flexible(text).unwrap();
        assert_eq!(layout, JsonLayout::SingleObject);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_ckan_envelope_uses_nested_records() {
        let text = r#"{
            "help": "https://dati.comune.milano.it/api/3/action/help_show",
            "success": true,
            "result": {"fields": [{"id": "stazione_id"}, {"id": "valore"}], "total": 2, "records": [
                {"stazione_id": "1", "valore": "38"},
                {"stazione_id": "2", "valore": "41"}
            ]}
        }"#;
        let (table, layout) = read_json_flexible(text).unwrap();
        assert_eq!(layout, JsonLayout::NestedRecords("result.records".to_string()));
        assert_eq!(table.columns, vec!["stazione_id", "valore"]);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_geojson_features_flatten_properties() {
        let text = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {"nome": "Verziere"}, "geometry": {"type": "Point"}}
        ]}"#;
        let (table, layout) = read_json_flexible(text).unwrap();
        assert_eq!(layout, JsonLayout::NestedRecords("features".to_string()));
        assert!(table.columns.contains(&"properties.nome".to_string()));
    }

    #[test]
    fn test_scalar_array_becomes_single_column() {
        let (table, layout) = read_json_flexible("[1, 2, 3]").unwrap();
        assert_eq!(layout, JsonLayout::Scalars);
        assert_eq!(table.columns, vec!["0"]);
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_empty_and_scalar_documents_are_errors() {
        assert!(matches!(read_json_flexible("[]"), Err(AirError::EmptyDataset(_))));
        assert!(matches!(read_json_flexible("{}"), Err(AirError::EmptyDataset(_))));
        assert!(matches!(read_json_flexible("42"), Err(AirError::UnsupportedLayout(_))));
        assert!(matches!(read_json_flexible("{not json"), Err(AirError::Json(_))));
    }

    #[test]
    fn test_bom_is_ignored() {
        let (table, _) = read_json_flexible("\u{feff}[{\"a\": 1}]").unwrap();
        assert_eq!(table.columns, vec!["a"]);
    }
}
