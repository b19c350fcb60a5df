/// Schema normalization: raw tables → canonical rows.
///
/// This is the only place column semantics are decided. The pipeline, the
/// source verifier and the analysis report all go through it.
///
/// Submodules:
/// - `columns`      — keyword rules that assign a role to each column.
/// - `dates`        — lenient date parsing.
/// - `measurements` — measurement tables → `Measurement`.
/// - `stations`     — station registry → `Station`.

pub mod columns;
pub mod dates;
pub mod measurements;
pub mod stations;

pub use columns::{ColumnMapping, ColumnRole, infer_measurement_columns};
pub use measurements::{NormalizedMeasurements, normalize_measurements};
pub use stations::normalize_stations;
