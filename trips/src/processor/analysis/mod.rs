pub mod ranking;
pub mod report;

use super::session_context;
use crate::models::{
    AnalysisResults, BucketAverage, BucketExtreme, Granularity, MaxTrip, MonthlyTotal,
};
use crate::schema::{COLOR, TRIP_CO2, validate_features_schema};
use crate::utils::arrow::{column, f64_value, i64_value, string_value, timestamp_value};
use arrow::record_batch::RecordBatch;
use common::Result;
use common::store::{StoredTable, TableStore, register_batches};
use datafusion::execution::context::SessionContext;
use tracing::{debug, info};

/// Rows whose emissions can take part in an aggregate.
fn measured_emissions() -> String {
    format!(
        "{co2} IS NOT NULL AND NOT isnan(CAST({co2} AS DOUBLE))",
        co2 = TRIP_CO2
    )
}

/// Answers the extrema questions over a features table.
pub struct ExtremaAnalyzer {
    ctx: SessionContext,
    table: String,
}

impl ExtremaAnalyzer {
    /// Reads `features_table` from the store and checks its columns.
    pub async fn open(store: &dyn TableStore, features_table: &str) -> Result<Self> {
        let table = store.read_table(features_table).await?;
        Self::from_table(features_table, table)
    }

    pub fn from_table(name: &str, table: StoredTable) -> Result<Self> {
        validate_features_schema(&table.schema)?;
        let ctx = session_context();
        let rows = register_batches(&ctx, name, table)?;
        debug!(table = name, rows, "Registered features table");
        Ok(Self {
            ctx,
            table: name.to_string(),
        })
    }

    async fn query(&self, sql: &str) -> Result<Vec<RecordBatch>> {
        Ok(self.ctx.sql(sql).await?.collect().await?)
    }

    /// The highest-emission trip of every category, ordered by category.
    ///
    /// Ties on emissions fall to the earliest pickup, then the earliest
    /// dropoff, then the shortest distance. Rows with null or NaN emissions
    /// are ignored, as in the bucket and monthly aggregates.
    pub async fn max_trip_per_category(&self) -> Result<Vec<MaxTrip>> {
        let sql = format!(
            "SELECT {color}, pickup_datetime, dropoff_datetime, trip_distance, {co2} FROM ( \
                SELECT {color}, \
                       CAST(pickup_datetime AS TIMESTAMP) AS pickup_datetime, \
                       CAST(dropoff_datetime AS TIMESTAMP) AS dropoff_datetime, \
                       CAST(trip_distance AS DOUBLE) AS trip_distance, \
                       CAST({co2} AS DOUBLE) AS {co2}, \
                       ROW_NUMBER() OVER ( \
                           PARTITION BY {color} \
                           ORDER BY {co2} DESC, pickup_datetime ASC, \
                                    dropoff_datetime ASC, trip_distance ASC \
                       ) AS rn \
                FROM {table} \
                WHERE {color} IS NOT NULL AND {measured} \
             ) ranked \
             WHERE rn = 1 \
             ORDER BY {color}",
            color = COLOR,
            co2 = TRIP_CO2,
            measured = measured_emissions(),
            table = self.table
        );

        let mut trips = Vec::new();
        for batch in self.query(&sql).await? {
            let colors = column(&batch, COLOR)?;
            let pickups = column(&batch, "pickup_datetime")?;
            let dropoffs = column(&batch, "dropoff_datetime")?;
            let distances = column(&batch, "trip_distance")?;
            let emissions = column(&batch, TRIP_CO2)?;
            for row in 0..batch.num_rows() {
                trips.push(MaxTrip {
                    category: string_value(colors, row)?,
                    pickup: timestamp_value(pickups, row)?,
                    dropoff: timestamp_value(dropoffs, row)?,
                    trip_distance: f64_value(distances, row)?,
                    trip_co2_kgs: f64_value(emissions, row)?,
                });
            }
        }
        Ok(trips)
    }

    /// Average emissions per (category, bucket), ordered by both.
    pub async fn bucket_averages(&self, granularity: Granularity) -> Result<Vec<BucketAverage>> {
        let sql = format!(
            "SELECT {color}, bucket, AVG({co2}) AS avg_co2 FROM ( \
                SELECT {color}, CAST({bucket} AS BIGINT) AS bucket, CAST({co2} AS DOUBLE) AS {co2} \
                FROM {table} \
                WHERE {color} IS NOT NULL AND {bucket} IS NOT NULL AND {measured} \
             ) bucketed \
             GROUP BY {color}, bucket \
             ORDER BY {color}, bucket",
            color = COLOR,
            co2 = TRIP_CO2,
            measured = measured_emissions(),
            bucket = granularity.column(),
            table = self.table
        );

        let mut averages = Vec::new();
        for batch in self.query(&sql).await? {
            let colors = column(&batch, COLOR)?;
            let buckets = column(&batch, "bucket")?;
            let avgs = column(&batch, "avg_co2")?;
            for row in 0..batch.num_rows() {
                averages.push(BucketAverage {
                    category: string_value(colors, row)?,
                    bucket: i64_value(buckets, row)?,
                    avg_co2: f64_value(avgs, row)?,
                });
            }
        }
        Ok(averages)
    }

    /// Heavy and light bucket of every category at one granularity.
    pub async fn heavy_light(&self, granularity: Granularity) -> Result<Vec<BucketExtreme>> {
        let averages = self.bucket_averages(granularity).await?;
        Ok(ranking::heavy_and_light(&averages, granularity))
    }

    /// Total emissions per (category, month), ordered by both. Months with
    /// no trips are absent here; charting zero-fills them.
    pub async fn monthly_totals(&self) -> Result<Vec<MonthlyTotal>> {
        let sql = format!(
            "SELECT {color}, month, SUM({co2}) AS total_co2_kg FROM ( \
                SELECT {color}, CAST(month_of_year AS BIGINT) AS month, CAST({co2} AS DOUBLE) AS {co2} \
                FROM {table} \
                WHERE {color} IS NOT NULL AND month_of_year IS NOT NULL AND {measured} \
             ) monthly \
             GROUP BY {color}, month \
             ORDER BY {color}, month",
            color = COLOR,
            co2 = TRIP_CO2,
            measured = measured_emissions(),
            table = self.table
        );

        let mut totals = Vec::new();
        for batch in self.query(&sql).await? {
            let colors = column(&batch, COLOR)?;
            let months = column(&batch, "month")?;
            let sums = column(&batch, "total_co2_kg")?;
            for row in 0..batch.num_rows() {
                totals.push(MonthlyTotal {
                    category: string_value(colors, row)?,
                    month: i64_value(months, row)?,
                    total_co2_kg: f64_value(sums, row)?,
                });
            }
        }
        Ok(totals)
    }

    pub async fn run(&self) -> Result<AnalysisResults> {
        let max_trips = self.max_trip_per_category().await?;
        info!(categories = max_trips.len(), "Computed max-emission trips");

        let mut extremes = Vec::new();
        for granularity in Granularity::ALL {
            let found = self.heavy_light(granularity).await?;
            debug!(%granularity, rows = found.len(), "Computed heavy/light buckets");
            extremes.extend(found);
        }

        let monthly_totals = self.monthly_totals().await?;
        info!(rows = monthly_totals.len(), "Computed monthly totals");

        Ok(AnalysisResults {
            max_trips,
            extremes,
            monthly_totals,
        })
    }
}
