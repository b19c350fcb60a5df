//! Milan air-quality data service.
//!
//! Fetches the city's open-data air-quality datasets, coerces their
//! shifting schemas into one canonical frame, joins station metadata,
//! persists the result, and computes the dashboard views over it.

pub mod analysis;
pub mod config;
pub mod ingest;
pub mod logging;
pub mod merge;
pub mod model;
pub mod normalize;
pub mod persist;
pub mod pipeline;
pub mod pollutants;
pub mod report;
pub mod sources;
pub mod verify;
