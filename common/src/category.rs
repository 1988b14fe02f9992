use crate::{Error, Result};
use std::fmt;

/// Canonical column names of a cleaned trip, in table order.
pub const CANONICAL_COLUMNS: [&str; 8] = [
    "pickup_datetime",
    "dropoff_datetime",
    "passenger_count",
    "trip_distance",
    "vendor_id",
    "pu_location_id",
    "do_location_id",
    "total_amount",
];

/// A trip category ("color") and the source field names its extracts use.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Category {
    name: String,
    timestamp_prefix: &'static str,
}

impl Category {
    pub fn yellow() -> Self {
        Self {
            name: "yellow".to_string(),
            timestamp_prefix: "tpep",
        }
    }

    pub fn green() -> Self {
        Self {
            name: "green".to_string(),
            timestamp_prefix: "lpep",
        }
    }

    pub fn from_name(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "yellow" => Ok(Self::yellow()),
            "green" => Ok(Self::green()),
            other => Err(Error::InvalidInput(format!("Unknown trip category: {}", other))),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Source column for a canonical column, in this category's naming.
    pub fn source_column(&self, canonical: &str) -> String {
        match canonical {
            "pickup_datetime" | "dropoff_datetime" => {
                format!("{}_{}", self.timestamp_prefix, canonical)
            }
            "vendor_id" => "VendorID".to_string(),
            "pu_location_id" => "PULocationID".to_string(),
            "do_location_id" => "DOLocationID".to_string(),
            other => other.to_string(),
        }
    }

    /// All source columns, aligned with [`CANONICAL_COLUMNS`].
    pub fn source_columns(&self) -> Vec<String> {
        CANONICAL_COLUMNS
            .iter()
            .map(|canonical| self.source_column(canonical))
            .collect()
    }

    pub fn raw_table(&self, year: i32) -> String {
        format!("{}_trips_{}", self.name, year)
    }

    pub fn clean_table(&self, year: i32) -> String {
        format!("{}_trips_{}_clean", self.name, year)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Name of the combined cleaned table for a year.
pub fn combined_clean_table(year: i32) -> String {
    format!("trips_{}_clean", year)
}
