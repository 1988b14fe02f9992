mod memory;
mod parquet_store;

pub use self::memory::MemoryStore;
pub use self::parquet_store::ParquetStore;

use crate::{Error, Result};
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use datafusion::datasource::MemTable;
use datafusion::prelude::SessionContext;
use std::sync::Arc;

/// A fully materialized table: its schema plus every batch.
#[derive(Debug, Clone)]
pub struct StoredTable {
    pub schema: SchemaRef,
    pub batches: Vec<RecordBatch>,
}

impl StoredTable {
    pub fn new(schema: SchemaRef, batches: Vec<RecordBatch>) -> Self {
        Self { schema, batches }
    }

    pub fn empty(schema: SchemaRef) -> Self {
        Self {
            schema,
            batches: Vec::new(),
        }
    }

    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(|b| b.num_rows()).sum()
    }
}

/// Shared tabular store the pipeline stages read from and write to.
///
/// `replace_table` must be atomic for readers: a concurrent `read_table`
/// sees either the previous table or the new one, never a mix.
#[async_trait]
pub trait TableStore: Send + Sync {
    async fn read_table(&self, name: &str) -> Result<StoredTable>;

    async fn replace_table(&self, name: &str, table: StoredTable) -> Result<()>;

    /// Returns whether a table was removed.
    async fn drop_table(&self, name: &str) -> Result<bool>;

    async fn table_exists(&self, name: &str) -> Result<bool>;

    fn location(&self) -> &str;
}

/// Registers in-memory batches as a table in `ctx`, replacing any previous
/// registration under `name`. Returns the row count.
pub fn register_batches(ctx: &SessionContext, name: &str, table: StoredTable) -> Result<usize> {
    let rows = table.num_rows();
    let provider = MemTable::try_new(table.schema, vec![table.batches])?;

    // Clean up existing registration if present
    let _ = ctx.deregister_table(name);
    ctx.register_table(name, Arc::new(provider))?;

    Ok(rows)
}

pub(crate) fn validate_table_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!("Invalid table name: {:?}", name)))
    }
}
