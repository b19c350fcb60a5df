/// Persistence of the canonical frame.
///
/// Submodules:
/// - `csv_store` — canonical measurement and station CSVs.
/// - `db`        — relational snapshot (`measurements`, `stations`).

pub mod csv_store;
pub mod db;
