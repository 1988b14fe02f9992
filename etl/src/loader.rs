use crate::source::PartitionSource;
use arrow::array::ArrayRef;
use arrow::compute::{CastOptions, cast_with_options};
use arrow::datatypes::SchemaRef;
use arrow::error::ArrowError;
use arrow::record_batch::{RecordBatch, RecordBatchReader};
use bytes::Bytes;
use common::store::{StoredTable, TableStore};
use common::{Category, Error, Result};
use parquet::arrow::ProjectionMask;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Outcome of loading every configured month for one category.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadSummary {
    pub category: String,
    pub table: String,
    /// Month whose partition created the table, if any partition succeeded.
    pub created_from: Option<u32>,
    pub appended: Vec<u32>,
    pub skipped: Vec<(u32, String)>,
    pub rows: usize,
}

impl LoadSummary {
    fn new(category: &Category, table: &str) -> Self {
        Self {
            category: category.name().to_string(),
            table: table.to_string(),
            created_from: None,
            appended: Vec::new(),
            skipped: Vec::new(),
            rows: 0,
        }
    }
}

/// Decodes a parquet partition, keeping only `columns`, in that order.
pub fn decode_partition(content: Bytes, columns: &[String]) -> Result<StoredTable> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(content)?;
    let file_schema = builder.schema().clone();

    let mut roots = Vec::with_capacity(columns.len());
    for column in columns {
        let index = file_schema.index_of(column).map_err(|_| {
            Error::SchemaMismatch(format!("Partition is missing column {}", column))
        })?;
        roots.push(index);
    }

    let mask = ProjectionMask::roots(builder.parquet_schema(), roots.iter().copied());
    let reader = builder.with_projection(mask).build()?;
    let read_schema = reader.schema();

    // The mask keeps file order; reorder to the requested order.
    let order = columns
        .iter()
        .map(|column| read_schema.index_of(column))
        .collect::<std::result::Result<Vec<usize>, ArrowError>>()?;
    let schema = Arc::new(read_schema.project(&order)?);

    let batches = reader
        .map(|batch| batch.and_then(|b| b.project(&order)))
        .collect::<std::result::Result<Vec<RecordBatch>, ArrowError>>()?;

    Ok(StoredTable::new(schema, batches))
}

/// Casts a partition to the schema of the table it is appended to.
pub fn conform_to(part: StoredTable, target: &SchemaRef) -> Result<StoredTable> {
    if part.schema.fields().len() != target.fields().len() {
        return Err(Error::SchemaMismatch(format!(
            "Expected {} columns, found {}",
            target.fields().len(),
            part.schema.fields().len()
        )));
    }

    let options = CastOptions {
        safe: false,
        ..Default::default()
    };

    let mut batches = Vec::with_capacity(part.batches.len());
    for batch in part.batches {
        let columns = batch
            .columns()
            .iter()
            .zip(target.fields().iter())
            .map(|(array, field)| {
                if array.data_type() == field.data_type() {
                    Ok(array.clone())
                } else {
                    cast_with_options(array, field.data_type(), &options)
                }
            })
            .collect::<std::result::Result<Vec<ArrayRef>, ArrowError>>()?;
        batches.push(RecordBatch::try_new(target.clone(), columns)?);
    }

    Ok(StoredTable::new(target.clone(), batches))
}

async fn fetch_partition(
    source: &dyn PartitionSource,
    category: &Category,
    year: i32,
    month: u32,
    columns: &[String],
    target: Option<&SchemaRef>,
) -> Result<StoredTable> {
    let content = source.fetch(category, year, month).await?;
    let part = decode_partition(content, columns)?;
    match target {
        Some(schema) => conform_to(part, schema),
        None => Ok(part),
    }
}

/// Builds the raw table of one category from its monthly partitions.
///
/// The first month that loads creates the table and fixes its schema; every
/// other month is appended after casting to that schema. A month that fails
/// is skipped and recorded. If no month loads, any previous raw table is
/// removed so later stages never read stale data.
pub async fn load_category(
    store: &dyn TableStore,
    source: &dyn PartitionSource,
    category: &Category,
    year: i32,
    months: &[u32],
) -> Result<LoadSummary> {
    let table_name = category.raw_table(year);
    let columns = category.source_columns();
    let mut summary = LoadSummary::new(category, &table_name);
    let mut table: Option<StoredTable> = None;

    for &month in months {
        let location = source.location(category, year, month);
        let target = table.as_ref().map(|t| t.schema.clone());

        match fetch_partition(source, category, year, month, &columns, target.as_ref()).await {
            Ok(part) => match table.as_mut() {
                None => {
                    info!(category = %category, month, rows = part.num_rows(), "Created {} from {}", table_name, location);
                    summary.created_from = Some(month);
                    table = Some(part);
                }
                Some(existing) => {
                    info!(category = %category, month, rows = part.num_rows(), "Appended {}", location);
                    existing.batches.extend(part.batches);
                    summary.appended.push(month);
                }
            },
            Err(e) => {
                warn!(category = %category, month, error = %e, "Skipping partition {}", location);
                summary.skipped.push((month, e.to_string()));
            }
        }
    }

    match table {
        Some(table) => {
            summary.rows = table.num_rows();
            store.replace_table(&table_name, table).await?;
            info!(category = %category, rows = summary.rows, "{}: loaded", table_name);
        }
        None => {
            error!(category = %category, year, "Could not create {} from any month", table_name);
            store.drop_table(&table_name).await?;
        }
    }

    Ok(summary)
}
