use arrow::array::{
    Array,
    ArrayRef,
    Float32Array,
    Float64Array,
    Int32Array,
    Int64Array,
    LargeStringArray,
    StringArray,
    StringViewArray,
    TimestampMicrosecondArray,
    TimestampMillisecondArray,
    TimestampNanosecondArray,
    TimestampSecondArray,
};
use arrow::datatypes::{DataType, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, NaiveDateTime};
use common::{Error, Result};

pub fn column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a ArrayRef> {
    let index = batch.schema().index_of(name)?;
    Ok(batch.column(index))
}

fn unexpected_null(array: &dyn Array, index: usize) -> Error {
    Error::InvalidInput(format!(
        "Unexpected null at row {} of a {} column",
        index,
        array.data_type()
    ))
}

fn unsupported(array: &dyn Array, wanted: &str) -> Error {
    Error::SchemaMismatch(format!(
        "Cannot read {} as {}",
        array.data_type(),
        wanted
    ))
}

macro_rules! downcast {
    ($array:expr, $ty:ty) => {
        $array
            .as_any()
            .downcast_ref::<$ty>()
            .ok_or_else(|| unsupported($array, stringify!($ty)))?
    };
}

/// Reads a string from any of the string layouts DataFusion may produce.
pub fn string_value(array: &dyn Array, index: usize) -> Result<String> {
    if array.is_null(index) {
        return Err(unexpected_null(array, index));
    }

    Ok(match array.data_type() {
        DataType::Utf8 => downcast!(array, StringArray).value(index).to_string(),
        DataType::LargeUtf8 => downcast!(array, LargeStringArray).value(index).to_string(),
        DataType::Utf8View => downcast!(array, StringViewArray).value(index).to_string(),
        _ => return Err(unsupported(array, "string")),
    })
}

pub fn f64_value(array: &dyn Array, index: usize) -> Result<f64> {
    if array.is_null(index) {
        return Err(unexpected_null(array, index));
    }

    Ok(match array.data_type() {
        DataType::Float64 => downcast!(array, Float64Array).value(index),
        DataType::Float32 => downcast!(array, Float32Array).value(index) as f64,
        _ => return Err(unsupported(array, "f64")),
    })
}

pub fn i64_value(array: &dyn Array, index: usize) -> Result<i64> {
    if array.is_null(index) {
        return Err(unexpected_null(array, index));
    }

    Ok(match array.data_type() {
        DataType::Int64 => downcast!(array, Int64Array).value(index),
        DataType::Int32 => downcast!(array, Int32Array).value(index) as i64,
        _ => return Err(unsupported(array, "i64")),
    })
}

/// Like [`i64_value`] but maps null to `None` (aggregates over no rows).
pub fn optional_i64_value(array: &dyn Array, index: usize) -> Result<Option<i64>> {
    if array.is_null(index) {
        Ok(None)
    } else {
        i64_value(array, index).map(Some)
    }
}

fn out_of_range(ts: i64) -> Error {
    Error::InvalidInput(format!("Timestamp {} is out of range", ts))
}

pub fn timestamp_value(array: &dyn Array, index: usize) -> Result<NaiveDateTime> {
    if array.is_null(index) {
        return Err(unexpected_null(array, index));
    }

    let datetime = match array.data_type() {
        DataType::Timestamp(unit, _) => match unit {
            TimeUnit::Nanosecond => {
                let ts = downcast!(array, TimestampNanosecondArray).value(index);
                DateTime::from_timestamp_nanos(ts)
            }
            TimeUnit::Microsecond => {
                let ts = downcast!(array, TimestampMicrosecondArray).value(index);
                DateTime::from_timestamp_micros(ts).ok_or_else(|| out_of_range(ts))?
            }
            TimeUnit::Millisecond => {
                let ts = downcast!(array, TimestampMillisecondArray).value(index);
                DateTime::from_timestamp_millis(ts).ok_or_else(|| out_of_range(ts))?
            }
            TimeUnit::Second => {
                let ts = downcast!(array, TimestampSecondArray).value(index);
                DateTime::from_timestamp(ts, 0).ok_or_else(|| out_of_range(ts))?
            }
        },
        _ => return Err(unsupported(array, "timestamp")),
    };

    Ok(datetime.naive_utc())
}

/// Like [`timestamp_value`] but maps null to `None`.
pub fn optional_timestamp_value(array: &dyn Array, index: usize) -> Result<Option<NaiveDateTime>> {
    if array.is_null(index) {
        Ok(None)
    } else {
        timestamp_value(array, index).map(Some)
    }
}
