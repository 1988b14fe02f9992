use arrow::error::ArrowError;
use datafusion::error::DataFusionError;
use parquet::errors::ParquetError;
use thiserror::Error;

pub mod category;
pub mod config;
pub mod store;
pub mod telemetry;

pub use category::Category;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Rate limit exceeded")]
    RateLimit,

    #[error("Forbidden - Access denied")]
    Forbidden,

    #[error("Gateway timeout")]
    GatewayTimeout,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Parquet error: {0}")]
    Parquet(#[from] ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    #[error("DataFusion error: {0}")]
    DataFusion(#[from] DataFusionError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// A raw field could not be coerced to its canonical type.
    #[error("Malformed input in {category} field {field} (source column {source_field}): {reason}")]
    MalformedInput {
        category: String,
        field: String,
        source_field: String,
        reason: String,
    },

    /// A post-condition of a stage did not hold. Always a logic defect.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether a failed fetch is worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Http(_) | Error::RateLimit | Error::GatewayTimeout | Error::Io(_)
        )
    }
}
