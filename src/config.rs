/// Service configuration loaded from `airmon.toml`.
///
/// Every section is optional; omitted values fall back to the defaults
/// below, and an omitted `[[sources]]` list falls back to the official
/// datasets in `sources::DATASET_REGISTRY`. Secrets (the database URL)
/// never live here, they come from the environment / `.env`.

use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::model::AirError;
use crate::sources::{DATASET_REGISTRY, SourceFormat, SourceKind};

pub const DEFAULT_CONFIG_PATH: &str = "airmon.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub http: HttpConfig,
    pub output: OutputConfig,
    pub database: DatabaseConfig,
    pub pipeline: PipelineConfig,
    pub analysis: AnalysisConfig,
    pub sources: Vec<SourceConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub measurements_csv: String,
    pub stations_csv: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Write the relational snapshot. Requires `DATABASE_URL`.
    pub enabled: bool,
    /// Postgres schema holding the `measurements` and `stations` tables.
    pub schema: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PipelineConfig {
    /// Skip a failing measurement source instead of aborting the run.
    pub continue_on_source_error: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// How many of the most recent years the trend covers.
    pub trend_years: usize,
    /// Stations listed in the ranking.
    pub top_n: usize,
    /// |z| above which an annual mean is flagged as anomalous.
    pub anomaly_z_threshold: f64,
    /// Slopes within ±tolerance (units per year) count as stable.
    pub trend_tolerance: f64,
}

/// One dataset to ingest.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub kind: SourceKind,
    #[serde(default)]
    pub format: SourceFormat,
    pub url: Option<String>,
    /// Read when `url` is absent or the download fails.
    pub local_path: Option<PathBuf>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            user_agent: format!("airmon_service/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data"),
            measurements_csv: "air_quality_official.csv".to_string(),
            stations_csv: "stations_official.csv".to_string(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            schema: "air_quality".to_string(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            trend_years: 10,
            top_n: 5,
            anomaly_z_threshold: 2.0,
            trend_tolerance: 0.1,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            output: OutputConfig::default(),
            database: DatabaseConfig::default(),
            pipeline: PipelineConfig::default(),
            analysis: AnalysisConfig::default(),
            sources: default_sources(),
        }
    }
}

/// Source list built from the static dataset registry.
pub fn default_sources() -> Vec<SourceConfig> {
    DATASET_REGISTRY
        .iter()
        .map(|d| SourceConfig {
            name: d.name.to_string(),
            kind: d.kind,
            format: d.format,
            url: Some(d.url.to_string()),
            local_path: None,
        })
        .collect()
}

impl Config {
    /// Parses a TOML document. An empty `sources` list is replaced by the
    /// registry defaults.
    pub fn from_toml_str(text: &str) -> Result<Config, AirError> {
        let mut config: Config = toml::from_str(text)?;
        if config.sources.is_empty() {
            config.sources = default_sources();
        }
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates the config file at `path`.
    pub fn load(path: &Path) -> Result<Config, AirError> {
        if !path.exists() {
            return Err(AirError::ConfigNotFound(path.to_path_buf()));
        }
        let text = fs::read_to_string(path)?;
        Config::from_toml_str(&text)
    }

    /// Like `load`, but a missing file yields the built-in defaults.
    pub fn load_or_default(path: &Path) -> Result<Config, AirError> {
        match Config::load(path) {
            Err(AirError::ConfigNotFound(_)) => Ok(Config::default()),
            other => other,
        }
    }

    pub fn validate(&self) -> Result<(), AirError> {
        if !self
            .sources
            .iter()
            .any(|s| s.kind == SourceKind::Measurements)
        {
            return Err(AirError::Config(
                "at least one measurements source is required".to_string(),
            ));
        }

        let mut names = HashSet::new();
        for source in &self.sources {
            if source.name.trim().is_empty() {
                return Err(AirError::Config("source with empty name".to_string()));
            }
            if !names.insert(source.name.as_str()) {
                return Err(AirError::Config(format!(
                    "duplicate source name '{}'",
                    source.name
                )));
            }
            if source.url.is_none() && source.local_path.is_none() {
                return Err(AirError::Config(format!(
                    "source '{}' needs a url or a local_path",
                    source.name
                )));
            }
        }

        crate::persist::db::validate_identifier(&self.database.schema)?;

        if self.analysis.top_n == 0 {
            return Err(AirError::Config("analysis.top_n must be > 0".to_string()));
        }
        if self.analysis.trend_years == 0 {
            return Err(AirError::Config(
                "analysis.trend_years must be > 0".to_string(),
            ));
        }
        if !(self.analysis.anomaly_z_threshold > 0.0) {
            return Err(AirError::Config(
                "analysis.anomaly_z_threshold must be > 0".to_string(),
            ));
        }
        if self.http.timeout_secs == 0 {
            return Err(AirError::Config("http.timeout_secs must be > 0".to_string()));
        }
        Ok(())
    }

    pub fn measurements_csv_path(&self) -> PathBuf {
        self.output.dir.join(&self.output.measurements_csv)
    }

    pub fn stations_csv_path(&self) -> PathBuf {
        self.output.dir.join(&self.output.stations_csv)
    }

    pub fn sources_of_kind(&self, kind: SourceKind) -> impl Iterator<Item = &SourceConfig> {
        self.sources.iter().filter(move |s| s.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_uses_registry_sources() {
        let config = Config::default();
        assert_eq!(config.sources.len(), DATASET_REGISTRY.len());
        assert!(config.validate().is_ok());
        assert_eq!(
            config.measurements_csv_path(),
            PathBuf::from("data/air_quality_official.csv")
        );
    }

    #[test]
    fn test_empty_document_yields_defaults() {
        let config = Config::from_toml_str("").expect("empty config is valid");
        assert_eq!(config.analysis.trend_years, 10);
        assert_eq!(config.analysis.top_n, 5);
        assert!(!config.database.enabled);
        assert_eq!(config.sources.len(), DATASET_REGISTRY.len());
    }

    #[test]
    fn test_sources_and_sections_parse() {
        let text = r#"
            [output]
            dir = "out"

            [database]
            enabled = true
            schema = "milano_aria"

            [[sources]]
            name = "local_series"
            kind = "measurements"
            format = "json"
            local_path = "fixtures/series.json"

            [[sources]]
            name = "registry"
            kind = "stations"
            url = "https://example.org/stazioni.csv"
        "#;
        let config = Config::from_toml_str(text).expect("valid config");
        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.sources[0].format, SourceFormat::Json);
        assert_eq!(config.sources[1].format, SourceFormat::Auto);
        assert_eq!(config.database.schema, "milano_aria");
        assert_eq!(config.stations_csv_path(), PathBuf::from("out/stations_official.csv"));
        assert_eq!(config.sources_of_kind(SourceKind::Stations).count(), 1);
    }

    #[test]
    fn test_source_without_location_is_rejected() {
        let text = r#"
            [[sources]]
            name = "nowhere"
            kind = "measurements"
        "#;
        let err = Config::from_toml_str(text).unwrap_err();
        assert!(matches!(err, AirError::Config(_)), "got {err:?}");
    }

    #[test]
    fn test_stations_only_config_is_rejected() {
        let text = r#"
            [[sources]]
            name = "registry"
            kind = "stations"
            local_path = "stazioni.csv"
        "#;
        assert!(Config::from_toml_str(text).is_err());
    }

    #[test]
    fn test_duplicate_source_names_are_rejected() {
        let text = r#"
            [[sources]]
            name = "a"
            kind = "measurements"
            local_path = "a.json"

            [[sources]]
            name = "a"
            kind = "measurements"
            local_path = "b.json"
        "#;
        assert!(Config::from_toml_str(text).is_err());
    }

    #[test]
    fn test_unsafe_schema_name_is_rejected() {
        let text = r#"
            [database]
            schema = "air; DROP TABLE x"
        "#;
        let err = Config::from_toml_str(text).unwrap_err();
        assert!(matches!(err, AirError::InvalidIdentifier(_)));
    }

    #[test]
    fn test_shipped_config_matches_registry() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join(DEFAULT_CONFIG_PATH);
        let config = Config::load(&path).expect("airmon.toml parses");
        let names: Vec<&str> = config.sources.iter().map(|s| s.name.as_str()).collect();
        let registry: Vec<&str> = DATASET_REGISTRY.iter().map(|d| d.name).collect();
        assert_eq!(names, registry);
        for (source, dataset) in config.sources.iter().zip(DATASET_REGISTRY) {
            assert_eq!(source.url.as_deref(), Some(dataset.url));
        }
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = Config::load_or_default(Path::new("/nonexistent/airmon.toml"))
            .expect("defaults when the file is missing");
        assert_eq!(config.sources.len(), DATASET_REGISTRY.len());
    }
}
