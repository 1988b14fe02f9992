use super::dedup::DEDUP_KEY;
use super::filter::ValidityRules;
use crate::schema::COLOR;
use crate::utils::arrow::{column, i64_value, optional_i64_value, optional_timestamp_value, string_value};
use chrono::NaiveDateTime;
use common::{Error, Result};
use datafusion::execution::context::SessionContext;
use std::collections::BTreeMap;

/// Post-conditions of a cleaning run, computed on the combined table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    pub rows_per_category: BTreeMap<String, usize>,
    pub min_pickup: Option<NaiveDateTime>,
    pub max_pickup: Option<NaiveDateTime>,
    /// Rows failing each validity clause. All zero on a correct run.
    pub clause_violations: Vec<(String, usize)>,
    /// Rows beyond the first in any (color, dedup key) group.
    pub key_collisions: usize,
}

impl ValidationReport {
    pub fn total_rows(&self) -> usize {
        self.rows_per_category.values().sum()
    }

    /// Fails if any duplicate key or invalid row made it into the output.
    pub fn check(&self) -> Result<()> {
        if self.key_collisions > 0 {
            return Err(Error::InvariantViolation(format!(
                "{} rows share a (color, dedup key) with another row",
                self.key_collisions
            )));
        }

        let failing: Vec<String> = self
            .clause_violations
            .iter()
            .filter(|(_, count)| *count > 0)
            .map(|(name, count)| format!("{}={}", name, count))
            .collect();
        if !failing.is_empty() {
            return Err(Error::InvariantViolation(format!(
                "Cleaned rows violate validity rules: {}",
                failing.join(", ")
            )));
        }

        Ok(())
    }
}

/// Builds the report for a combined table registered in `ctx` as `table`.
pub async fn validate(
    ctx: &SessionContext,
    table: &str,
    rules: &ValidityRules,
) -> Result<ValidationReport> {
    let mut report = ValidationReport::default();

    let per_color = ctx
        .sql(&format!(
            "SELECT {color}, COUNT(*) AS row_count FROM {table} GROUP BY {color} ORDER BY {color}",
            color = COLOR,
            table = table
        ))
        .await?
        .collect()
        .await?;
    for batch in &per_color {
        let colors = column(batch, COLOR)?;
        let counts = column(batch, "row_count")?;
        for row in 0..batch.num_rows() {
            report
                .rows_per_category
                .insert(string_value(colors, row)?, i64_value(counts, row)? as usize);
        }
    }

    let span = ctx
        .sql(&format!(
            "SELECT MIN(pickup_datetime) AS min_pickup, MAX(pickup_datetime) AS max_pickup FROM {}",
            table
        ))
        .await?
        .collect()
        .await?;
    if let Some(batch) = span.iter().find(|b| b.num_rows() > 0) {
        report.min_pickup = optional_timestamp_value(column(batch, "min_pickup")?, 0)?;
        report.max_pickup = optional_timestamp_value(column(batch, "max_pickup")?, 0)?;
    }

    let clauses = rules.clauses();
    let counters = clauses
        .iter()
        .map(|clause| {
            format!(
                "SUM(CASE WHEN ({}) THEN 0 ELSE 1 END) AS {}",
                clause.predicate, clause.name
            )
        })
        .collect::<Vec<_>>()
        .join(", ");
    let violations = ctx
        .sql(&format!("SELECT {} FROM {}", counters, table))
        .await?
        .collect()
        .await?;
    let first = violations.iter().find(|b| b.num_rows() > 0);
    for clause in &clauses {
        let count = match first {
            Some(batch) => optional_i64_value(column(batch, clause.name)?, 0)?.unwrap_or(0),
            None => 0,
        };
        report
            .clause_violations
            .push((clause.name.to_string(), count as usize));
    }

    let key = DEDUP_KEY.join(", ");
    let collisions = ctx
        .sql(&format!(
            "SELECT SUM(group_rows - 1) AS collisions FROM ( \
                SELECT {color}, {key}, COUNT(*) AS group_rows FROM {table} \
                GROUP BY {color}, {key} \
                HAVING COUNT(*) > 1 \
             ) duplicated",
            color = COLOR,
            key = key,
            table = table
        ))
        .await?
        .collect()
        .await?;
    if let Some(batch) = collisions.iter().find(|b| b.num_rows() > 0) {
        report.key_collisions = optional_i64_value(column(batch, "collisions")?, 0)?.unwrap_or(0) as usize;
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_report_passes() {
        let report = ValidationReport {
            rows_per_category: BTreeMap::from([("green".to_string(), 2), ("yellow".to_string(), 3)]),
            clause_violations: vec![("distance_range".to_string(), 0)],
            ..Default::default()
        };
        assert_eq!(report.total_rows(), 5);
        assert!(report.check().is_ok());
    }

    #[test]
    fn remaining_duplicates_are_an_invariant_violation() {
        let report = ValidationReport {
            key_collisions: 1,
            ..Default::default()
        };
        assert!(matches!(report.check(), Err(Error::InvariantViolation(_))));
    }

    #[test]
    fn invalid_rows_are_an_invariant_violation() {
        let report = ValidationReport {
            clause_violations: vec![
                ("distance_range".to_string(), 0),
                ("amount_range".to_string(), 2),
            ],
            ..Default::default()
        };
        match report.check() {
            Err(Error::InvariantViolation(msg)) => assert!(msg.contains("amount_range=2")),
            other => panic!("expected invariant violation, got {:?}", other),
        }
    }
}
