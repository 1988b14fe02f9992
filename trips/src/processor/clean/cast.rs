use crate::schema::STAGED_TRIP_SCHEMA;
use arrow::array::{Array, ArrayRef, AsArray, Float64Array, UInt64Array};
use arrow::compute::{CastOptions, cast_with_options};
use arrow::datatypes::{DataType, Float64Type};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use common::category::CANONICAL_COLUMNS;
use common::store::StoredTable;
use common::{Category, Error, Result};
use std::sync::Arc;

fn malformed(category: &Category, field: &str, source_field: &str, reason: String) -> Error {
    Error::MalformedInput {
        category: category.name().to_string(),
        field: field.to_string(),
        source_field: source_field.to_string(),
        reason,
    }
}

/// Casts one column. Floating point values headed for an integer field are
/// rounded to the nearest integer first (half away from zero); a plain cast
/// would truncate them.
fn cast_column(
    array: &dyn Array,
    to: &DataType,
    options: &CastOptions,
) -> std::result::Result<ArrayRef, ArrowError> {
    if array.data_type().is_floating() && to.is_integer() {
        let floats = cast_with_options(array, &DataType::Float64, options)?;
        let rounded: Float64Array = floats.as_primitive::<Float64Type>().unary(f64::round);
        return cast_with_options(&rounded, to, options);
    }
    cast_with_options(array, to, options)
}

/// Maps a raw table onto the canonical schema.
///
/// Every canonical field is cast from its category-specific source column
/// with failing casts, so a value that cannot be represented aborts instead
/// of turning into null. Nulls pass through. A `source_row` ordinal (position
/// in the raw table) is appended for deterministic tie-breaking later on.
pub fn cast_to_canonical(category: &Category, raw: &StoredTable) -> Result<StoredTable> {
    let target = STAGED_TRIP_SCHEMA.clone();

    let mut sources = Vec::with_capacity(CANONICAL_COLUMNS.len());
    for canonical in CANONICAL_COLUMNS {
        let source = category.source_column(canonical);
        let index = raw.schema.index_of(&source).map_err(|_| {
            malformed(category, canonical, &source, "source column is missing".to_string())
        })?;
        sources.push((canonical, source, index));
    }

    let options = CastOptions {
        safe: false,
        ..Default::default()
    };

    let mut offset = 0u64;
    let mut batches = Vec::with_capacity(raw.batches.len());
    for batch in &raw.batches {
        let mut columns: Vec<ArrayRef> = Vec::with_capacity(target.fields().len());
        for ((canonical, source, index), field) in sources.iter().zip(target.fields().iter()) {
            let cast = cast_column(batch.column(*index).as_ref(), field.data_type(), &options)
                .map_err(|e| malformed(category, canonical, source, e.to_string()))?;
            columns.push(cast);
        }

        let rows = batch.num_rows() as u64;
        columns.push(Arc::new(UInt64Array::from_iter_values(offset..offset + rows)));
        offset += rows;

        batches.push(RecordBatch::try_new(target.clone(), columns)?);
    }

    Ok(StoredTable::new(target, batches))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{RawTrip, raw_table};
    use arrow::array::{Int32Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};

    #[test]
    fn maps_green_columns_and_numbers_rows() {
        let raw = raw_table(
            &Category::green(),
            &[RawTrip::valid(8, 0), RawTrip::valid(9, 0)],
        );

        let staged = cast_to_canonical(&Category::green(), &raw).unwrap();
        assert_eq!(staged.num_rows(), 2);
        assert_eq!(staged.schema, STAGED_TRIP_SCHEMA.clone());

        let batch = &staged.batches[0];
        let passengers = batch
            .column(2)
            .as_any()
            .downcast_ref::<Int32Array>()
            .unwrap();
        assert_eq!(passengers.value(0), 1);

        let ordinals = batch
            .column(8)
            .as_any()
            .downcast_ref::<UInt64Array>()
            .unwrap();
        assert_eq!(ordinals.values().to_vec(), vec![0, 1]);
    }

    #[test]
    fn missing_source_column_names_the_field() {
        let schema = Arc::new(Schema::new(vec![Field::new("VendorID", DataType::Int32, true)]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![Arc::new(Int32Array::from(vec![1]))],
        )
        .unwrap();

        let err = cast_to_canonical(&Category::yellow(), &StoredTable::new(schema, vec![batch]))
            .unwrap_err();
        match err {
            Error::MalformedInput {
                category,
                field,
                source_field,
                ..
            } => {
                assert_eq!(category, "yellow");
                assert_eq!(field, "pickup_datetime");
                assert_eq!(source_field, "tpep_pickup_datetime");
            }
            other => panic!("expected malformed input, got {:?}", other),
        }
    }

    #[test]
    fn uncastable_value_is_malformed_input() {
        let raw = raw_table(&Category::yellow(), &[RawTrip::valid(8, 0)]);

        // Swap passenger_count for a text column holding a word.
        let batch = &raw.batches[0];
        let mut fields: Vec<Field> = raw.schema.fields().iter().map(|f| f.as_ref().clone()).collect();
        fields[2] = Field::new("passenger_count", DataType::Utf8, true);
        let schema = Arc::new(Schema::new(fields));
        let mut columns = batch.columns().to_vec();
        columns[2] = Arc::new(StringArray::from(vec!["two"]));
        let bad = RecordBatch::try_new(schema.clone(), columns).unwrap();

        let err = cast_to_canonical(&Category::yellow(), &StoredTable::new(schema, vec![bad]))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedInput { ref field, .. } if field == "passenger_count"
        ));
    }

    #[test]
    fn nulls_are_not_cast_failures() {
        let mut trip = RawTrip::valid(8, 0);
        trip.passenger_count = None;
        let raw = raw_table(&Category::yellow(), &[trip]);

        let staged = cast_to_canonical(&Category::yellow(), &raw).unwrap();
        assert!(staged.batches[0].column(2).is_null(0));
    }

    fn staged_passengers(counts: &[f64]) -> Vec<i32> {
        let trips: Vec<RawTrip> = counts
            .iter()
            .map(|&count| {
                let mut trip = RawTrip::valid(8, 0);
                trip.passenger_count = Some(count);
                trip
            })
            .collect();
        let staged = cast_to_canonical(&Category::yellow(), &raw_table(&Category::yellow(), &trips))
            .unwrap();
        let passengers = staged.batches[0]
            .column(2)
            .as_any()
            .downcast_ref::<Int32Array>()
            .unwrap();
        passengers.values().to_vec()
    }

    #[test]
    fn fractional_counts_round_to_nearest() {
        assert_eq!(
            staged_passengers(&[6.7, 0.6, 0.4, 2.5, 3.0]),
            vec![7, 1, 0, 3, 3]
        );
    }

    #[test]
    fn non_finite_count_is_malformed_input() {
        let mut trip = RawTrip::valid(8, 0);
        trip.passenger_count = Some(f64::NAN);
        let raw = raw_table(&Category::yellow(), &[trip]);

        let err = cast_to_canonical(&Category::yellow(), &raw).unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedInput { ref field, .. } if field == "passenger_count"
        ));
    }
}
