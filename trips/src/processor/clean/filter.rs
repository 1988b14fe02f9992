use common::Result;
use datafusion::dataframe::DataFrame;

/// One named clause of the validity predicate, as a SQL boolean expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub name: &'static str,
    pub predicate: String,
}

impl Clause {
    fn new(name: &'static str, predicate: impl Into<String>) -> Self {
        Self {
            name,
            predicate: predicate.into(),
        }
    }
}

/// Row-level rules a cleaned trip must satisfy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidityRules {
    pub year: i32,
    pub enforce_positive_zones: bool,
}

impl ValidityRules {
    pub fn new(year: i32, enforce_positive_zones: bool) -> Self {
        Self {
            year,
            enforce_positive_zones,
        }
    }

    /// The rules as separate clauses. The cleaner keeps rows satisfying all
    /// of them and the validation report counts violations per clause.
    pub fn clauses(&self) -> Vec<Clause> {
        let mut clauses = vec![
            Clause::new("pickup_before_dropoff", "pickup_datetime <= dropoff_datetime"),
            Clause::new("positive_duration", "dropoff_datetime > pickup_datetime"),
            Clause::new(
                "duration_within_24h",
                "dropoff_datetime <= pickup_datetime + INTERVAL '24 hours'",
            ),
            Clause::new("distance_range", "trip_distance > 0 AND trip_distance <= 100"),
            Clause::new("passenger_range", "passenger_count >= 1 AND passenger_count <= 6"),
            Clause::new("amount_range", "total_amount >= 0 AND total_amount <= 1000"),
            Clause::new(
                "pickup_in_year",
                format!(
                    "pickup_datetime >= CAST('{:04}-01-01T00:00:00' AS TIMESTAMP) \
                     AND pickup_datetime < CAST('{:04}-01-01T00:00:00' AS TIMESTAMP)",
                    self.year,
                    self.year + 1
                ),
            ),
        ];

        if self.enforce_positive_zones {
            clauses.push(Clause::new(
                "positive_zones",
                "pu_location_id > 0 AND do_location_id > 0",
            ));
        }

        clauses
    }

    /// Conjunction of every clause. A null in any tested field fails it.
    pub fn predicate(&self) -> String {
        self.clauses()
            .iter()
            .map(|clause| format!("({})", clause.predicate))
            .collect::<Vec<_>>()
            .join(" AND ")
    }

    /// Keeps only the rows satisfying every rule.
    pub fn apply(&self, df: DataFrame) -> Result<DataFrame> {
        let predicate = df.parse_sql_expr(&self.predicate())?;
        Ok(df.filter(predicate)?)
    }
}
