//! Delimited-text reader for the CSV exports.
//!
//! The city's CSV files are semicolon separated, mirrors re-export them
//! with commas, and some older extracts are tab separated. The delimiter is
//! sniffed from the header line.

use crate::ingest::table::{RawTable, RawValue};
use crate::model::AirError;

const CANDIDATE_DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];

/// Picks the candidate delimiter occurring most often outside quotes in
/// the first line. Ties and no-match fall back to comma.
pub fn sniff_delimiter(text: &str) -> u8 {
    let header = text.lines().next().unwrap_or("");
    let mut counts = [0usize; CANDIDATE_DELIMITERS.len()];
    let mut in_quotes = false;
    for byte in header.bytes() {
        if byte == b'"' {
            in_quotes = !in_quotes;
            continue;
        }
        if in_quotes {
            continue;
        }
        if let Some(pos) = CANDIDATE_DELIMITERS.iter().position(|&d| d == byte) {
            counts[pos] += 1;
        }
    }
    let mut best = 0;
    for (i, &count) in counts.iter().enumerate() {
        if count > counts[best] {
            best = i;
        }
    }
    CANDIDATE_DELIMITERS[best]
}

/// Parses delimited text into a table. Blank cells become `Null`; ragged
/// rows are padded or truncated to the header width.
pub fn read_csv_flexible(text: &str) -> Result<RawTable, AirError> {
    let text = text.trim_start_matches('\u{feff}');
    if text.trim().is_empty() {
        return Err(AirError::EmptyDataset("CSV document is empty".to_string()));
    }

    let delimiter = sniff_delimiter(text);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let mut table = RawTable::new(columns);

    for record in reader.records() {
        let record = record?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        let row = record
            .iter()
            .map(|cell| {
                if cell.is_empty() {
                    RawValue::Null
                } else {
                    RawValue::Text(cell.to_string())
                }
            })
            .collect();
        table.push_row(row);
    }

    Ok(table)
}
