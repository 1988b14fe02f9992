use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use common::category::CANONICAL_COLUMNS;
use common::{Error, Result};
use once_cell::sync::Lazy;
use std::sync::Arc;

pub const COLOR: &str = "color";
pub const SOURCE_ROW: &str = "source_row";
pub const TRIP_CO2: &str = "trip_co2_kgs";

/// Columns the analyzer reads from the features table.
pub const FEATURE_COLUMNS: [&str; 9] = [
    COLOR,
    "pickup_datetime",
    "dropoff_datetime",
    "trip_distance",
    TRIP_CO2,
    "hour_of_day",
    "day_of_week",
    "week_of_year",
    "month_of_year",
];

pub fn canonical_type(column: &str) -> Option<DataType> {
    match column {
        "pickup_datetime" | "dropoff_datetime" => {
            Some(DataType::Timestamp(TimeUnit::Nanosecond, None))
        }
        "passenger_count" | "vendor_id" | "pu_location_id" | "do_location_id" => {
            Some(DataType::Int32)
        }
        "trip_distance" | "total_amount" => Some(DataType::Float64),
        _ => None,
    }
}

fn canonical_fields() -> Vec<Field> {
    CANONICAL_COLUMNS
        .iter()
        .filter_map(|name| canonical_type(name).map(|data_type| Field::new(*name, data_type, true)))
        .collect()
}

// Cast output: canonical fields plus the raw row ordinal used to break dedup ties
pub fn staged_trip_schema() -> Schema {
    let mut fields = canonical_fields();
    fields.push(Field::new(SOURCE_ROW, DataType::UInt64, false));
    Schema::new(fields)
}

// Combined cleaned table
pub fn combined_trip_schema() -> Schema {
    let mut fields = vec![Field::new(COLOR, DataType::Utf8, false)];
    fields.extend(canonical_fields());
    Schema::new(fields)
}

pub static STAGED_TRIP_SCHEMA: Lazy<SchemaRef> = Lazy::new(|| Arc::new(staged_trip_schema()));
pub static COMBINED_TRIP_SCHEMA: Lazy<SchemaRef> = Lazy::new(|| Arc::new(combined_trip_schema()));

/// Fails with `SchemaMismatch` naming every feature column the table lacks.
pub fn validate_features_schema(schema: &Schema) -> Result<()> {
    let missing: Vec<&str> = FEATURE_COLUMNS
        .iter()
        .copied()
        .filter(|column| schema.index_of(column).is_err())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::SchemaMismatch(format!(
            "Features table is missing columns: {}",
            missing.join(", ")
        )))
    }
}
