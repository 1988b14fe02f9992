use crate::chart::{MonthlySeries, monthly_series, render_monthly_chart};
use crate::models::AnalysisResults;
use crate::processor::analysis::report;
use crate::processor::clean::{CleanOutcome, Cleaner, ValidityRules};
use crate::processor::ExtremaAnalyzer;
use common::category::combined_clean_table;
use common::config::Settings;
use common::store::{ParquetStore, TableStore};
use common::{Category, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

const CHART_FILE: &str = "monthly_co2.svg";

/// What an analysis run produced.
#[derive(Debug, Clone)]
pub struct AnalysisRun {
    pub results: AnalysisResults,
    pub series: Vec<MonthlySeries>,
    pub chart: Option<PathBuf>,
}

/// Runs the cleaning and analysis stages against one table store.
pub struct TripsService {
    store: Arc<dyn TableStore>,
    year: i32,
    categories: Vec<Category>,
    rules: ValidityRules,
    features_table: String,
    plots_dir: PathBuf,
}

impl TripsService {
    /// Opens the configured parquet store.
    pub fn new(settings: &Settings) -> Result<Self> {
        let store = ParquetStore::open(&settings.store.root)?;
        Self::with_store(settings, Arc::new(store))
    }

    pub fn with_store(settings: &Settings, store: Arc<dyn TableStore>) -> Result<Self> {
        let year = settings.pipeline.year;
        Ok(Self {
            store,
            year,
            categories: settings.categories()?,
            rules: ValidityRules::new(year, settings.clean.enforce_positive_zones),
            features_table: settings.analysis.features_table.clone(),
            plots_dir: PathBuf::from(&settings.analysis.plots_dir),
        })
    }

    /// Cleans every category and persists the cleaned tables.
    ///
    /// On any failure the combined table is removed, along with every
    /// per-category table this run already replaced, so later stages never
    /// read a stale or partial result.
    pub async fn clean(&self) -> Result<CleanOutcome> {
        let combined = combined_clean_table(self.year);
        let mut written = Vec::new();

        match self.clean_and_persist(&combined, &mut written).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                error!(error = %e, "Cleaning failed, removing {}", combined);
                written.push(combined);
                for name in &written {
                    if let Err(drop_err) = self.store.drop_table(name).await {
                        warn!(error = %drop_err, "Could not remove {}", name);
                    }
                }
                Err(e)
            }
        }
    }

    async fn clean_and_persist(
        &self,
        combined: &str,
        written: &mut Vec<String>,
    ) -> Result<CleanOutcome> {
        let mut raw = Vec::with_capacity(self.categories.len());
        for category in &self.categories {
            let name = category.raw_table(self.year);
            let table = self.store.read_table(&name).await?;
            info!(category = %category, rows = table.num_rows(), "Read {}", name);
            raw.push((category.clone(), table));
        }

        let outcome = Cleaner::new(self.rules).run(raw).await?;

        for (category, table) in &outcome.per_category {
            let name = category.clean_table(self.year);
            self.store.replace_table(&name, table.clone()).await?;
            written.push(name);
        }
        self.store
            .replace_table(combined, outcome.combined.clone())
            .await?;

        info!(
            table = combined,
            rows = outcome.combined.num_rows(),
            "Created {} in {}",
            combined,
            self.store.location()
        );
        Ok(outcome)
    }

    /// Answers the analytics questions, logs the report and writes the
    /// monthly chart.
    pub async fn analyze(&self) -> Result<AnalysisRun> {
        let analyzer = ExtremaAnalyzer::open(self.store.as_ref(), &self.features_table).await?;
        let results = analyzer.run().await?;

        for line in report::render(&results) {
            if !line.is_empty() {
                info!("{}", line);
            }
        }

        let series = monthly_series(&results.monthly_totals)?;
        let chart = if series.is_empty() {
            warn!(table = %self.features_table, "No monthly totals, skipping chart");
            None
        } else {
            let path = self.plots_dir.join(CHART_FILE);
            render_monthly_chart(&series, self.year, &path)?;
            Some(path)
        };

        Ok(AnalysisRun {
            results,
            series,
            chart,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{FeatureTrip, RawTrip, features_table, raw_table};
    use common::Error;
    use async_trait::async_trait;
    use common::store::{MemoryStore, StoredTable};
    use std::path::Path;

    /// Memory store that refuses to write one table.
    struct RefusingStore {
        inner: MemoryStore,
        refused: &'static str,
    }

    #[async_trait]
    impl TableStore for RefusingStore {
        async fn read_table(&self, name: &str) -> Result<StoredTable> {
            self.inner.read_table(name).await
        }

        async fn replace_table(&self, name: &str, table: StoredTable) -> Result<()> {
            if name == self.refused {
                return Err(Error::Storage(format!("disk full writing {}", name)));
            }
            self.inner.replace_table(name, table).await
        }

        async fn drop_table(&self, name: &str) -> Result<bool> {
            self.inner.drop_table(name).await
        }

        async fn table_exists(&self, name: &str) -> Result<bool> {
            self.inner.table_exists(name).await
        }

        fn location(&self) -> &str {
            self.inner.location()
        }
    }

    fn settings(plots_dir: &Path) -> Settings {
        let mut settings = Settings::default();
        settings.analysis.plots_dir = plots_dir.display().to_string();
        settings
    }

    async fn seeded_store() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        let trip = RawTrip::valid(8, 0);
        store
            .replace_table(
                "yellow_trips_2024",
                raw_table(&Category::yellow(), &[trip.clone(), trip.clone()]),
            )
            .await
            .unwrap();
        store
            .replace_table("green_trips_2024", raw_table(&Category::green(), &[trip]))
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn clean_persists_every_output_table() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store().await;
        let service = TripsService::with_store(&settings(dir.path()), store.clone()).unwrap();

        let outcome = service.clean().await.unwrap();
        assert_eq!(outcome.report.total_rows(), 2);

        assert_eq!(store.read_table("yellow_trips_2024_clean").await.unwrap().num_rows(), 1);
        assert_eq!(store.read_table("green_trips_2024_clean").await.unwrap().num_rows(), 1);
        assert_eq!(store.read_table("trips_2024_clean").await.unwrap().num_rows(), 2);
    }

    #[tokio::test]
    async fn failed_clean_removes_stale_combined_table() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store().await;
        let service = TripsService::with_store(&settings(dir.path()), store.clone()).unwrap();
        service.clean().await.unwrap();

        // Next run: green raw table arrives with yellow naming.
        store
            .replace_table(
                "green_trips_2024",
                raw_table(&Category::yellow(), &[RawTrip::valid(9, 0)]),
            )
            .await
            .unwrap();

        let err = service.clean().await.unwrap_err();
        assert!(matches!(err, Error::MalformedInput { .. }));
        assert!(!store.table_exists("trips_2024_clean").await.unwrap());
    }

    #[tokio::test]
    async fn failed_write_removes_tables_written_by_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let seeded = seeded_store().await;
        let inner = MemoryStore::new();
        for name in ["yellow_trips_2024", "green_trips_2024"] {
            let table = seeded.read_table(name).await.unwrap();
            inner.replace_table(name, table).await.unwrap();
        }
        let store = Arc::new(RefusingStore {
            inner,
            refused: "green_trips_2024_clean",
        });
        let service = TripsService::with_store(&settings(dir.path()), store.clone()).unwrap();

        let err = service.clean().await.unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
        assert!(!store.table_exists("yellow_trips_2024_clean").await.unwrap());
        assert!(!store.table_exists("trips_2024_clean").await.unwrap());
        assert!(store.table_exists("yellow_trips_2024").await.unwrap());
    }

    #[tokio::test]
    async fn missing_raw_table_aborts_clean() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let service = TripsService::with_store(&settings(dir.path()), store).unwrap();

        assert!(matches!(service.clean().await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn analyze_reports_and_charts() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        store
            .replace_table(
                "trips_features",
                features_table(&[
                    FeatureTrip::new("yellow", 5.0).month(3),
                    FeatureTrip::new("yellow", 10.0).month(7),
                    FeatureTrip::new("green", 8.0).month(3),
                ]),
            )
            .await
            .unwrap();
        let service = TripsService::with_store(&settings(dir.path()), store).unwrap();

        let run = service.analyze().await.unwrap();
        assert_eq!(run.results.max_trips.len(), 2);
        assert_eq!(run.series.len(), 2);
        let chart = run.chart.unwrap();
        assert_eq!(chart, dir.path().join(CHART_FILE));
        assert!(chart.exists());
    }

    #[tokio::test]
    async fn analyze_without_trips_skips_chart() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        store
            .replace_table("trips_features", features_table(&[]))
            .await
            .unwrap();
        let service = TripsService::with_store(&settings(dir.path()), store).unwrap();

        let run = service.analyze().await.unwrap();
        assert!(run.chart.is_none());
        assert!(run.series.is_empty());
    }
}
