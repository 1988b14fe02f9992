pub mod analysis;
pub mod clean;

pub use analysis::ExtremaAnalyzer;
pub use clean::{CleanOutcome, Cleaner};

use arrow::datatypes::SchemaRef;
use common::Result;
use common::store::StoredTable;
use datafusion::dataframe::DataFrame;
use datafusion::execution::context::{SessionConfig, SessionContext};

/// A session that plans everything onto a single partition, so query
/// output order only depends on the ORDER BY clauses.
pub fn session_context() -> SessionContext {
    SessionContext::new_with_config(SessionConfig::new().with_target_partitions(1))
}

/// Executes `df` and keeps the result as a table.
pub async fn collect_table(df: DataFrame) -> Result<StoredTable> {
    let planned: SchemaRef = df.schema().inner().clone();
    let batches = df.collect().await?;
    let schema = batches
        .first()
        .map(|batch| batch.schema())
        .unwrap_or(planned);
    Ok(StoredTable::new(schema, batches))
}
