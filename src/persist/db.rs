//! Relational snapshot in Postgres.
//!
//! Every run replaces the two tables wholesale inside one transaction, so
//! readers see either the previous snapshot or the new one.

use std::env;

use postgres::{Client, NoTls};
use serde::Serialize;
use tracing::info;

use crate::model::{AirError, Measurement, Station};

/// Accepts lowercase SQL identifiers: `[a-z_][a-z0-9_]*`, at most 63 bytes.
pub fn validate_identifier(name: &str) -> Result<(), AirError> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if valid_start && valid_rest && name.len() <= 63 {
        Ok(())
    } else {
        Err(AirError::InvalidIdentifier(name.to_string()))
    }
}

/// Connects using `DATABASE_URL` from the environment or `.env`.
pub fn connect() -> Result<Client, AirError> {
    dotenv::dotenv().ok();
    let database_url = env::var("DATABASE_URL").map_err(|_| AirError::MissingEnv("DATABASE_URL"))?;
    let client = Client::connect(&database_url, NoTls)?;
    Ok(client)
}

/// DDL that drops and recreates both snapshot tables in `schema`.
pub fn snapshot_ddl(schema: &str) -> String {
    format!(
        "CREATE SCHEMA IF NOT EXISTS {s};
         DROP TABLE IF EXISTS {s}.measurements;
         DROP TABLE IF EXISTS {s}.stations;
         CREATE TABLE {s}.measurements (
             \"date\"      DATE,
             \"datetime\"  TIMESTAMP,
             station_id    TEXT NOT NULL,
             station_name  TEXT NOT NULL,
             lat           DOUBLE PRECISION,
             lon           DOUBLE PRECISION,
             station_type  TEXT,
             pollutant     TEXT NOT NULL,
             unit          TEXT NOT NULL,
             \"value\"     DOUBLE PRECISION NOT NULL,
             qc_flag       BIGINT NOT NULL
         );
         CREATE INDEX ON {s}.measurements (pollutant, station_id);
         CREATE TABLE {s}.stations (
             station_id          TEXT,
             station_name        TEXT,
             id_arpa             TEXT,
             inizio_operativita  TEXT,
             fine_operativita    TEXT,
             inquinanti          TEXT,
             lon                 DOUBLE PRECISION,
             lat                 DOUBLE PRECISION,
             location            TEXT
         );",
        s = schema
    )
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SnapshotCounts {
    pub measurements: u64,
    pub stations: u64,
}

/// Replaces the snapshot tables with the given rows.
pub fn write_snapshot(
    client: &mut Client,
    schema: &str,
    measurements: &[Measurement],
    stations: &[Station],
) -> Result<SnapshotCounts, AirError> {
    validate_identifier(schema)?;

    let mut tx = client.transaction()?;
    tx.batch_execute(&snapshot_ddl(schema))?;

    let insert_measurement = tx.prepare(&format!(
        "INSERT INTO {}.measurements
         (\"date\", \"datetime\", station_id, station_name, lat, lon, station_type,
          pollutant, unit, \"value\", qc_flag)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        schema
    ))?;
    let mut counts = SnapshotCounts::default();
    for m in measurements {
        counts.measurements += tx.execute(
            &insert_measurement,
            &[
                &m.date,
                &m.datetime,
                &m.station_id,
                &m.station_name,
                &m.lat,
                &m.lon,
                &m.station_type,
                &m.pollutant,
                &m.unit,
                &m.value,
                &m.qc_flag,
            ],
        )?;
    }

    let insert_station = tx.prepare(&format!(
        "INSERT INTO {}.stations
         (station_id, station_name, id_arpa, inizio_operativita, fine_operativita,
          inquinanti, lon, lat, location)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        schema
    ))?;
    for s in stations {
        counts.stations += tx.execute(
            &insert_station,
            &[
                &s.station_id,
                &s.station_name,
                &s.id_arpa,
                &s.inizio_operativita,
                &s.fine_operativita,
                &s.inquinanti,
                &s.lon,
                &s.lat,
                &s.location,
            ],
        )?;
    }

    tx.commit()?;
    info!(
        schema,
        measurements = counts.measurements,
        stations = counts.stations,
        "database snapshot written"
    );
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("air_quality").is_ok());
        assert!(validate_identifier("_aq2024").is_ok());
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("2024aq").is_err());
        assert!(validate_identifier("AirQuality").is_err());
        assert!(validate_identifier("aq; drop table x").is_err());
        assert!(validate_identifier(&"a".repeat(64)).is_err());
    }

    #[test]
    fn test_snapshot_ddl_targets_schema() {
        let ddl = snapshot_ddl("milano");
        assert!(ddl.contains("CREATE SCHEMA IF NOT EXISTS milano;"));
        assert!(ddl.contains("DROP TABLE IF EXISTS milano.measurements;"));
        assert!(ddl.contains("CREATE TABLE milano.stations"));
        assert_eq!(ddl.matches("CREATE TABLE").count(), 2);
    }
}
