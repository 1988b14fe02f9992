pub mod loader;
pub mod source;
pub mod utils;

use common::Result;
use common::config::Settings;
use common::store::ParquetStore;
use loader::{LoadSummary, load_category};
use source::source_from_settings;
use tracing::info;

/// Loads every configured category's monthly partitions into the store.
pub async fn run_load_stage(settings: &Settings) -> Result<Vec<LoadSummary>> {
    let categories = settings.categories()?;
    let source = source_from_settings(&settings.ingest)?;
    let store = ParquetStore::open(&settings.store.root)?;
    let year = settings.pipeline.year;

    let mut summaries = Vec::with_capacity(categories.len());
    for category in &categories {
        let summary = load_category(
            &store,
            source.as_ref(),
            category,
            year,
            &settings.ingest.months,
        )
        .await?;
        summaries.push(summary);
    }

    info!(tables = summaries.len(), "Load stage complete.");
    Ok(summaries)
}
