//! Column-role inference.
//!
//! Every dataset revision names its columns differently (`data` vs
//! `date`, `stazione_id` vs `id`, `valore` vs `concentration_mean`). Each
//! canonical role has a keyword rule; for every role the first column, in
//! the table's own column order, that satisfies the rule is chosen. Column
//! names are expected to be lowercased already.

use serde::Serialize;
use std::fmt;

use crate::ingest::table::RawTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    Date,
    Value,
    Pollutant,
    StationId,
    StationName,
    Latitude,
    Longitude,
    Unit,
    StationType,
    QcFlag,
}

impl fmt::Display for ColumnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnRole::Date => "date",
            ColumnRole::Value => "value",
            ColumnRole::Pollutant => "pollutant",
            ColumnRole::StationId => "station_id",
            ColumnRole::StationName => "station_name",
            ColumnRole::Latitude => "lat",
            ColumnRole::Longitude => "lon",
            ColumnRole::Unit => "unit",
            ColumnRole::StationType => "station_type",
            ColumnRole::QcFlag => "qc_flag",
        };
        write!(f, "{}", name)
    }
}

/// Rows missing any of these roles are dropped.
pub const ESSENTIAL_ROLES: [ColumnRole; 3] =
    [ColumnRole::Value, ColumnRole::Pollutant, ColumnRole::StationId];

/// Keyword rule for one role: an exact-name list and a substring list.
pub struct RoleRule {
    pub role: ColumnRole,
    pub exact: &'static [&'static str],
    pub contains: &'static [&'static str],
}

impl RoleRule {
    pub fn matches(&self, column: &str) -> bool {
        self.exact.contains(&column) || self.contains.iter().any(|k| column.contains(k))
    }
}

pub static MEASUREMENT_RULES: &[RoleRule] = &[
    RoleRule {
        role: ColumnRole::Date,
        exact: &[],
        contains: &["date", "data", "giorno", "day"],
    },
    RoleRule {
        role: ColumnRole::Value,
        exact: &[
            "value",
            "valore",
            "concentrazione",
            "concen",
            "concentration",
            "concentration_mean",
        ],
        contains: &["val"],
    },
    RoleRule {
        role: ColumnRole::Pollutant,
        exact: &["nome", "name", "indicator"],
        contains: &["inquin", "param", "pollut", "parameter"],
    },
    RoleRule {
        role: ColumnRole::StationId,
        exact: &["id"],
        contains: &["staz", "station", "stazione", "cod"],
    },
    RoleRule {
        role: ColumnRole::StationName,
        exact: &[],
        contains: &["nome", "name", "description"],
    },
    RoleRule {
        role: ColumnRole::Latitude,
        exact: &["lat", "lat_y_4326", "latitude"],
        contains: &[],
    },
    RoleRule {
        role: ColumnRole::Longitude,
        exact: &["lon", "long_x_4326", "longitude", "long"],
        contains: &[],
    },
    RoleRule {
        role: ColumnRole::Unit,
        exact: &[],
        contains: &["unit", "unita", "uom"],
    },
    RoleRule {
        role: ColumnRole::StationType,
        exact: &[],
        contains: &["tipo", "type", "station_type"],
    },
    RoleRule {
        role: ColumnRole::QcFlag,
        exact: &["qc_flag"],
        contains: &[],
    },
];

/// Separate year/month/day columns, used when no single date column exists.
pub const DATE_PART_COLUMNS: [&str; 3] = ["year", "month", "day"];

pub fn rule_for(role: ColumnRole) -> &'static RoleRule {
    MEASUREMENT_RULES
        .iter()
        .find(|r| r.role == role)
        .unwrap_or(&MEASUREMENT_RULES[0])
}

/// First column, in column order, matching the rule.
pub fn find_column<'a>(columns: &'a [String], rule: &RoleRule) -> Option<&'a str> {
    columns
        .iter()
        .map(String::as_str)
        .find(|c| rule.matches(c))
}

/// Source column chosen for each canonical role.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ColumnMapping {
    pub date: Option<String>,
    /// Date assembled from `year`/`month`/`day` columns.
    pub date_from_parts: bool,
    pub value: Option<String>,
    /// `value` was not matched by name; the first numeric column was used.
    pub value_from_numeric_fallback: bool,
    pub pollutant: Option<String>,
    pub station_id: Option<String>,
    pub station_name: Option<String>,
    pub lat: Option<String>,
    pub lon: Option<String>,
    pub unit: Option<String>,
    pub station_type: Option<String>,
    pub qc_flag: Option<String>,
}

impl ColumnMapping {
    pub fn column_for(&self, role: ColumnRole) -> Option<&str> {
        let column = match role {
            ColumnRole::Date => &self.date,
            ColumnRole::Value => &self.value,
            ColumnRole::Pollutant => &self.pollutant,
            ColumnRole::StationId => &self.station_id,
            ColumnRole::StationName => &self.station_name,
            ColumnRole::Latitude => &self.lat,
            ColumnRole::Longitude => &self.lon,
            ColumnRole::Unit => &self.unit,
            ColumnRole::StationType => &self.station_type,
            ColumnRole::QcFlag => &self.qc_flag,
        };
        column.as_deref()
    }

    pub fn has_date(&self) -> bool {
        self.date.is_some() || self.date_from_parts
    }

    /// Essential roles with no source column; such a table yields no rows.
    pub fn missing_essential(&self) -> Vec<ColumnRole> {
        ESSENTIAL_ROLES
            .iter()
            .copied()
            .filter(|r| self.column_for(*r).is_none())
            .collect()
    }
}

/// Infers the measurement mapping of a table with lowercased columns.
pub fn infer_measurement_columns(table: &RawTable) -> ColumnMapping {
    let columns = &table.columns;
    let pick = |role| find_column(columns, rule_for(role)).map(str::to_string);

    let mut mapping = ColumnMapping {
        date: pick(ColumnRole::Date),
        value: pick(ColumnRole::Value),
        pollutant: pick(ColumnRole::Pollutant),
        station_id: pick(ColumnRole::StationId),
        station_name: pick(ColumnRole::StationName),
        lat: pick(ColumnRole::Latitude),
        lon: pick(ColumnRole::Longitude),
        unit: pick(ColumnRole::Unit),
        station_type: pick(ColumnRole::StationType),
        qc_flag: pick(ColumnRole::QcFlag),
        ..Default::default()
    };

    // A bare `day` column also satisfies the date keyword; when the full
    // year/month/day triple exists, assemble the date from it instead.
    let has_parts = DATE_PART_COLUMNS
        .iter()
        .all(|p| columns.iter().any(|c| c == p));
    let date_is_part = mapping
        .date
        .as_deref()
        .is_some_and(|d| DATE_PART_COLUMNS.contains(&d));
    if has_parts && (mapping.date.is_none() || date_is_part) {
        mapping.date = None;
        mapping.date_from_parts = true;
    }

    if mapping.value.is_none() {
        mapping.value = (0..columns.len())
            .find(|&i| table.is_numeric_column(i))
            .map(|i| columns[i].clone());
        mapping.value_from_numeric_fallback = mapping.value.is_some();
    }

    mapping
}
