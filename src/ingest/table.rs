//! Untyped tabular representation shared by the JSON and CSV readers.
//!
//! Readers do no type inference beyond what the file format carries: JSON
//! numbers stay numbers, CSV cells stay text. Deciding what a column means
//! is the normalizer's job.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl RawValue {
    pub fn is_null(&self) -> bool {
        match self {
            RawValue::Null => true,
            RawValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Numeric view of the cell. Text is parsed after trimming and accepts
    /// a decimal comma (`"12,5"`), as the Italian exports use one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            RawValue::Number(n) if n.is_finite() => Some(*n),
            RawValue::Text(s) => parse_number(s),
            _ => None,
        }
    }

    /// Text view of the cell, `None` for null/blank cells.
    ///
    /// Integral numbers render without a fraction so that an id read as
    /// `1.0` from one file matches `"1"` from another.
    pub fn as_text(&self) -> Option<String> {
        match self {
            RawValue::Null => None,
            RawValue::Bool(b) => Some(b.to_string()),
            RawValue::Number(n) => Some(format_number(*n)),
            RawValue::Text(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_text() {
            Some(text) => write!(f, "{}", text),
            None => Ok(()),
        }
    }
}

impl From<&serde_json::Value> for RawValue {
    fn from(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => RawValue::Null,
            serde_json::Value::Bool(b) => RawValue::Bool(*b),
            serde_json::Value::Number(n) => n.as_f64().map_or(RawValue::Null, RawValue::Number),
            serde_json::Value::String(s) => RawValue::Text(s.clone()),
            // Arrays inside a record are kept as their JSON text.
            other => RawValue::Text(other.to_string()),
        }
    }
}

/// Parses a number, tolerating surrounding whitespace and a decimal comma.
pub fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let parsed = trimmed.parse::<f64>().ok().or_else(|| {
        // "12,5" but not "1,234.5" (thousands separators are not used here)
        if trimmed.matches(',').count() == 1 && !trimmed.contains('.') {
            trimmed.replace(',', ".").parse::<f64>().ok()
        } else {
            None
        }
    })?;
    parsed.is_finite().then_some(parsed)
}

pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Rows of raw cells under a header. Every row has `columns.len()` cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<RawValue>>,
}

impl RawTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Appends a row, padding with nulls or truncating to the header width.
    pub fn push_row(&mut self, mut row: Vec<RawValue>) {
        row.resize(self.columns.len(), RawValue::Null);
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Lowercases every column name in place.
    pub fn lowercase_columns(&mut self) {
        for column in &mut self.columns {
            *column = column.trim().to_lowercase();
        }
    }

    /// Index of the first column with exactly this name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn cell(&self, row: usize, column: usize) -> &RawValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(&RawValue::Null)
    }

    /// True when the column has at least one non-null cell and every
    /// non-null cell reads as a number.
    pub fn is_numeric_column(&self, column: usize) -> bool {
        let mut seen = false;
        for row in &self.rows {
            let cell = row.get(column).unwrap_or(&RawValue::Null);
            if cell.is_null() {
                continue;
            }
            if cell.as_f64().is_none() {
                return false;
            }
            seen = true;
        }
        seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_number_accepts_decimal_comma() {
        assert_eq!(parse_number(" 12,5 "), Some(12.5));
        assert_eq!(parse_number("40"), Some(40.0));
        assert_eq!(parse_number("1,234.5"), None);
        assert_eq!(parse_number("<5"), None);
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number(""), None);
    }

    #[test]
    fn test_as_text_renders_integral_numbers_without_fraction() {
        assert_eq!(RawValue::Number(1.0).as_text().as_deref(), Some("1"));
        assert_eq!(RawValue::Number(45.47).as_text().as_deref(), Some("45.47"));
        assert_eq!(RawValue::Text("  ".to_string()).as_text(), None);
        assert_eq!(RawValue::Null.as_text(), None);
    }

    #[test]
    fn test_push_row_pads_and_truncates() {
        let mut table = RawTable::new(vec!["a".to_string(), "b".to_string()]);
        table.push_row(vec![RawValue::Number(1.0)]);
        table.push_row(vec![
            RawValue::Number(1.0),
            RawValue::Number(2.0),
            RawValue::Number(3.0),
        ]);
        assert_eq!(table.rows[0], vec![RawValue::Number(1.0), RawValue::Null]);
        assert_eq!(table.rows[1].len(), 2);
    }

    #[test]
    fn test_is_numeric_column() {
        let mut table = RawTable::new(vec!["n".to_string(), "t".to_string(), "e".to_string()]);
        table.push_row(vec![
            RawValue::Text("3,5".to_string()),
            RawValue::Text("PM10".to_string()),
            RawValue::Null,
        ]);
        table.push_row(vec![RawValue::Null, RawValue::Number(1.0), RawValue::Null]);
        assert!(table.is_numeric_column(0));
        assert!(!table.is_numeric_column(1));
        assert!(!table.is_numeric_column(2), "all-null column is not numeric");
    }

    #[test]
    fn test_lowercase_columns_trims() {
        let mut table = RawTable::new(vec![" LAT_Y_4326".to_string(), "Nome".to_string()]);
        table.lowercase_columns();
        assert_eq!(table.columns, vec!["lat_y_4326", "nome"]);
        assert_eq!(table.column_index("nome"), Some(1));
    }
}
