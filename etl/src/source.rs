use crate::utils::retry_with_backoff;
use async_trait::async_trait;
use bytes::Bytes;
use common::config::IngestConfig;
use common::{Category, Error, Result};
use reqwest::StatusCode;
use std::io::ErrorKind;
use tracing::debug;

/// Where monthly partitions come from.
#[async_trait]
pub trait PartitionSource: Send + Sync {
    /// Raw parquet bytes of one monthly partition.
    async fn fetch(&self, category: &Category, year: i32, month: u32) -> Result<Bytes>;

    fn location(&self, category: &Category, year: i32, month: u32) -> String;
}

/// Expands `{color}`, `{year}` and `{month}` (zero padded) in a template.
pub fn partition_location(template: &str, category: &Category, year: i32, month: u32) -> String {
    template
        .replace("{color}", category.name())
        .replace("{year}", &year.to_string())
        .replace("{month}", &format!("{:02}", month))
}

/// Picks an HTTP source for `http(s)://` templates and a file source otherwise.
pub fn source_from_settings(config: &IngestConfig) -> Result<Box<dyn PartitionSource>> {
    let template = config.source_template.as_str();
    if template.starts_with("http://") || template.starts_with("https://") {
        Ok(Box::new(HttpSource::new(
            template,
            config.max_retries,
            config.base_delay_ms,
        )?))
    } else {
        Ok(Box::new(FileSource::new(template)))
    }
}

pub struct HttpSource {
    client: reqwest::Client,
    template: String,
    max_retries: u32,
    base_delay_ms: u64,
}

impl HttpSource {
    pub fn new(template: &str, max_retries: u32, base_delay_ms: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("trips-etl/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            template: template.to_string(),
            max_retries,
            base_delay_ms,
        })
    }

    async fn fetch_once(&self, url: &str) -> Result<Bytes> {
        let response = self.client.get(url).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(Error::NotFound(url.to_string())),
            StatusCode::FORBIDDEN => Err(Error::Forbidden),
            StatusCode::TOO_MANY_REQUESTS => Err(Error::RateLimit),
            StatusCode::GATEWAY_TIMEOUT => Err(Error::GatewayTimeout),
            _ => {
                let body = response.error_for_status()?.bytes().await?;
                debug!(url, bytes = body.len(), "Fetched partition");
                Ok(body)
            }
        }
    }
}

#[async_trait]
impl PartitionSource for HttpSource {
    async fn fetch(&self, category: &Category, year: i32, month: u32) -> Result<Bytes> {
        let url = self.location(category, year, month);
        retry_with_backoff(self.max_retries, self.base_delay_ms, || self.fetch_once(&url)).await
    }

    fn location(&self, category: &Category, year: i32, month: u32) -> String {
        partition_location(&self.template, category, year, month)
    }
}

/// Partitions stored as local parquet files.
pub struct FileSource {
    template: String,
}

impl FileSource {
    pub fn new(template: &str) -> Self {
        Self {
            template: template.trim_start_matches("file://").to_string(),
        }
    }
}

#[async_trait]
impl PartitionSource for FileSource {
    async fn fetch(&self, category: &Category, year: i32, month: u32) -> Result<Bytes> {
        let path = self.location(category, year, month);
        match tokio::fs::read(&path).await {
            Ok(content) => Ok(Bytes::from(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::NotFound(path)),
            Err(e) => Err(e.into()),
        }
    }

    fn location(&self, category: &Category, year: i32, month: u32) -> String {
        partition_location(&self.template, category, year, month)
    }
}
