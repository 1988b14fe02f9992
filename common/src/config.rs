use config::{Config, ConfigError};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub clean: CleanConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PipelineConfig {
    #[serde(default = "default_year")]
    pub year: i32,
    #[serde(default = "default_categories")]
    pub categories: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default = "default_store_root")]
    pub root: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    /// Partition location with `{color}`, `{year}` and `{month}` placeholders.
    #[serde(default = "default_source_template")]
    pub source_template: String,
    #[serde(default = "default_months")]
    pub months: Vec<u32>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CleanConfig {
    #[serde(default)]
    pub enforce_positive_zones: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnalysisConfig {
    #[serde(default = "default_features_table")]
    pub features_table: String,
    #[serde(default = "default_plots_dir")]
    pub plots_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_dir")]
    pub dir: String,
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

fn default_year() -> i32 {
    2024
}

fn default_categories() -> Vec<String> {
    vec!["yellow".to_string(), "green".to_string()]
}

fn default_store_root() -> String {
    "data/warehouse".to_string()
}

fn default_source_template() -> String {
    "https://d37ci6vzurychx.cloudfront.net/trip-data/{color}_tripdata_{year}-{month}.parquet"
        .to_string()
}

fn default_months() -> Vec<u32> {
    (1..=12).collect()
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_features_table() -> String {
    "trips_features".to_string()
}

fn default_plots_dir() -> String {
    "plots".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            year: default_year(),
            categories: default_categories(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: default_store_root(),
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            source_template: default_source_template(),
            months: default_months(),
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            features_table: default_features_table(),
            plots_dir: default_plots_dir(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
            level: default_log_level(),
            json: false,
        }
    }
}

impl Settings {
    pub fn new(path: &str) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("APP").separator("__"));

        // Build the configuration
        let config = builder.build()?;

        let settings: Settings = config.try_deserialize()?;

        debug!(
            year = settings.pipeline.year,
            categories = ?settings.pipeline.categories,
            store = %settings.store.root,
            "Loaded pipeline settings"
        );

        Ok(settings)
    }

    /// Configured categories, resolved to their source naming.
    pub fn categories(&self) -> crate::Result<Vec<crate::Category>> {
        self.pipeline
            .categories
            .iter()
            .map(|name| crate::Category::from_name(name))
            .collect()
    }
}
