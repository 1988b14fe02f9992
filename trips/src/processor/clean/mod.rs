pub mod cast;
pub mod dedup;
pub mod filter;
pub mod validation;

pub use filter::ValidityRules;
pub use validation::ValidationReport;

use super::{collect_table, session_context};
use crate::schema::COMBINED_TRIP_SCHEMA;
use arrow::array::{ArrayRef, StringArray};
use arrow::record_batch::RecordBatch;
use common::category::combined_clean_table;
use common::store::{StoredTable, register_batches};
use common::{Category, Result};
use datafusion::execution::context::SessionContext;
use std::sync::Arc;
use tracing::info;

/// Row accounting for one category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryStats {
    pub category: String,
    pub raw_rows: usize,
    pub valid_rows: usize,
    pub dropped_invalid: usize,
    pub duplicates_removed: usize,
    pub clean_rows: usize,
}

/// Result of a successful cleaning run. Nothing is persisted yet.
#[derive(Debug, Clone)]
pub struct CleanOutcome {
    pub stats: Vec<CategoryStats>,
    pub per_category: Vec<(Category, StoredTable)>,
    pub combined: StoredTable,
    pub report: ValidationReport,
}

pub struct Cleaner {
    ctx: SessionContext,
    rules: ValidityRules,
}

impl Cleaner {
    pub fn new(rules: ValidityRules) -> Self {
        Self {
            ctx: session_context(),
            rules,
        }
    }

    /// Cast, filter and deduplicate one category's raw table.
    pub async fn clean_category(
        &self,
        category: &Category,
        raw: &StoredTable,
    ) -> Result<(CategoryStats, StoredTable)> {
        let staged = cast::cast_to_canonical(category, raw)?;
        let raw_rows = staged.num_rows();

        let staged_name = format!("{}_staged", category.raw_table(self.rules.year));
        register_batches(&self.ctx, &staged_name, staged)?;
        let valid = self.rules.apply(self.ctx.table(staged_name.as_str()).await?)?;
        let valid = collect_table(valid).await?;
        let valid_rows = valid.num_rows();

        let valid_name = format!("{}_valid", category.raw_table(self.rules.year));
        register_batches(&self.ctx, &valid_name, valid)?;
        let clean = collect_table(dedup::deduplicate(&self.ctx, &valid_name).await?).await?;
        let clean_rows = clean.num_rows();

        let _ = self.ctx.deregister_table(staged_name.as_str())?;
        let _ = self.ctx.deregister_table(valid_name.as_str())?;

        let stats = CategoryStats {
            category: category.name().to_string(),
            raw_rows,
            valid_rows,
            dropped_invalid: raw_rows - valid_rows,
            duplicates_removed: valid_rows - clean_rows,
            clean_rows,
        };
        info!(
            category = %category,
            raw = stats.raw_rows,
            dropped_invalid = stats.dropped_invalid,
            duplicates_removed = stats.duplicates_removed,
            clean = stats.clean_rows,
            "Cleaned {}",
            category.raw_table(self.rules.year)
        );

        Ok((stats, clean))
    }

    /// Concatenates cleaned tables, tagging every row with its category in
    /// a leading `color` column.
    pub fn combine(&self, cleaned: &[(Category, StoredTable)]) -> Result<StoredTable> {
        let schema = COMBINED_TRIP_SCHEMA.clone();
        let mut batches = Vec::new();

        for (category, table) in cleaned {
            for batch in &table.batches {
                if batch.num_rows() == 0 {
                    continue;
                }
                let mut columns: Vec<ArrayRef> = Vec::with_capacity(schema.fields().len());
                columns.push(Arc::new(StringArray::from(vec![
                    category.name();
                    batch.num_rows()
                ])));
                columns.extend(batch.columns().iter().cloned());
                batches.push(RecordBatch::try_new(schema.clone(), columns)?);
            }
        }

        Ok(StoredTable::new(schema, batches))
    }

    /// Builds the validation report of a combined table.
    pub async fn validate(&self, combined: &StoredTable) -> Result<ValidationReport> {
        let name = combined_clean_table(self.rules.year);
        register_batches(&self.ctx, &name, combined.clone())?;
        let report = validation::validate(&self.ctx, &name, &self.rules).await;
        let _ = self.ctx.deregister_table(name.as_str())?;
        report
    }

    /// Runs the full cleaning stage over raw per-category tables and fails
    /// with an invariant violation if the output does not hold up.
    pub async fn run(&self, raw: Vec<(Category, StoredTable)>) -> Result<CleanOutcome> {
        let mut stats = Vec::with_capacity(raw.len());
        let mut per_category = Vec::with_capacity(raw.len());

        for (category, table) in raw {
            let (category_stats, clean) = self.clean_category(&category, &table).await?;
            stats.push(category_stats);
            per_category.push((category, clean));
        }

        let combined = self.combine(&per_category)?;
        let report = self.validate(&combined).await?;
        report.check()?;

        info!(
            rows = report.total_rows(),
            min_pickup = ?report.min_pickup,
            max_pickup = ?report.max_pickup,
            "Validation passed"
        );

        Ok(CleanOutcome {
            stats,
            per_category,
            combined,
            report,
        })
    }
}
