/// Data acquisition and raw parsing.
///
/// Submodules:
/// - `fetch`     — download to temporary storage, local fallback.
/// - `json`      — JSON reader with layout fallbacks.
/// - `delimited` — CSV reader with delimiter sniffing.
/// - `table`     — the untyped `RawTable` both readers produce.

pub mod delimited;
pub mod fetch;
pub mod json;
pub mod table;

use std::fs;
use std::path::Path;

use reqwest::blocking::Client;
use tracing::debug;

use crate::config::SourceConfig;
use crate::model::AirError;
use crate::sources::SourceFormat;
use fetch::Acquired;
use table::RawTable;

/// Parses dataset text in the given format; `Auto` sniffs the content.
pub fn read_table(text: &str, format: SourceFormat) -> Result<RawTable, AirError> {
    let format = match format {
        SourceFormat::Auto => SourceFormat::sniff(text),
        resolved => resolved,
    };
    match format {
        SourceFormat::Csv => delimited::read_csv_flexible(text),
        _ => {
            let (table, layout) = json::read_json_flexible(text)?;
            debug!(%layout, rows = table.len(), "parsed JSON");
            Ok(table)
        }
    }
}

/// Reads a file from disk. Invalid UTF-8 is replaced rather than rejected;
/// older exports are Latin-1 and only the accented names suffer.
pub fn read_source_file(path: &Path, format: SourceFormat) -> Result<RawTable, AirError> {
    let bytes = fs::read(path)?;
    let text = String::from_utf8_lossy(&bytes);
    let format = format.resolve_for(&path.to_string_lossy());
    read_table(&text, format)
}

/// A source that was acquired and parsed.
#[derive(Debug)]
pub struct LoadedSource {
    pub table: RawTable,
    /// URL or local path the table was read from.
    pub origin: String,
    pub used_fallback: bool,
}

/// Acquires one configured source and parses it into a raw table.
///
/// The format is taken from the config, then from the URL extension, then
/// from the content. Temporary downloads are removed before returning.
pub fn load_source(client: &Client, source: &SourceConfig) -> Result<LoadedSource, AirError> {
    let acquired = fetch::acquire(client, source)?;

    let hint = match &acquired {
        Acquired::Downloaded(d) => d.url.clone(),
        Acquired::Local(p) | Acquired::Fallback(p) => p.to_string_lossy().into_owned(),
    };
    let format = source.format.resolve_for(&hint);
    let table = read_source_file(acquired.path(), format)?;

    if table.is_empty() {
        return Err(AirError::EmptyDataset(source.name.clone()));
    }

    Ok(LoadedSource {
        table,
        origin: acquired.to_string(),
        used_fallback: acquired.is_fallback(),
    })
}
