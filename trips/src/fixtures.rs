use arrow::array::{
    ArrayRef, Float64Array, Int32Array, StringArray, TimestampMicrosecondArray,
    TimestampNanosecondArray,
};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use common::Category;
use common::store::StoredTable;
use std::sync::Arc;

pub fn at(month: u32, day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, month, day)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

/// One row of a raw extract, in source units.
#[derive(Debug, Clone)]
pub struct RawTrip {
    pub pickup: Option<NaiveDateTime>,
    pub dropoff: Option<NaiveDateTime>,
    pub passenger_count: Option<f64>,
    pub trip_distance: Option<f64>,
    pub vendor_id: Option<i32>,
    pub pu_location_id: Option<i32>,
    pub do_location_id: Option<i32>,
    pub total_amount: Option<f64>,
}

impl RawTrip {
    /// A trip on 2024-03-01 that passes every validity rule.
    pub fn valid(hour: u32, minute: u32) -> Self {
        let pickup = at(3, 1, hour, minute);
        Self {
            pickup: Some(pickup),
            dropoff: Some(pickup + Duration::minutes(15)),
            passenger_count: Some(1.0),
            trip_distance: Some(2.5),
            vendor_id: Some(1),
            pu_location_id: Some(100),
            do_location_id: Some(200),
            total_amount: Some(20.0),
        }
    }
}

fn micros(ts: Option<NaiveDateTime>) -> Option<i64> {
    ts.map(|t| t.and_utc().timestamp_micros())
}

/// Builds a raw table in the category's source naming, with the types the
/// published extracts use (microsecond timestamps, float passenger count).
pub fn raw_table(category: &Category, trips: &[RawTrip]) -> StoredTable {
    let names = category.source_columns();
    let schema = Arc::new(Schema::new(vec![
        Field::new(&names[0], DataType::Timestamp(TimeUnit::Microsecond, None), true),
        Field::new(&names[1], DataType::Timestamp(TimeUnit::Microsecond, None), true),
        Field::new(&names[2], DataType::Float64, true),
        Field::new(&names[3], DataType::Float64, true),
        Field::new(&names[4], DataType::Int32, true),
        Field::new(&names[5], DataType::Int32, true),
        Field::new(&names[6], DataType::Int32, true),
        Field::new(&names[7], DataType::Float64, true),
    ]));

    let columns: Vec<ArrayRef> = vec![
        Arc::new(TimestampMicrosecondArray::from(
            trips.iter().map(|t| micros(t.pickup)).collect::<Vec<_>>(),
        )),
        Arc::new(TimestampMicrosecondArray::from(
            trips.iter().map(|t| micros(t.dropoff)).collect::<Vec<_>>(),
        )),
        Arc::new(Float64Array::from(
            trips.iter().map(|t| t.passenger_count).collect::<Vec<_>>(),
        )),
        Arc::new(Float64Array::from(
            trips.iter().map(|t| t.trip_distance).collect::<Vec<_>>(),
        )),
        Arc::new(Int32Array::from(
            trips.iter().map(|t| t.vendor_id).collect::<Vec<_>>(),
        )),
        Arc::new(Int32Array::from(
            trips.iter().map(|t| t.pu_location_id).collect::<Vec<_>>(),
        )),
        Arc::new(Int32Array::from(
            trips.iter().map(|t| t.do_location_id).collect::<Vec<_>>(),
        )),
        Arc::new(Float64Array::from(
            trips.iter().map(|t| t.total_amount).collect::<Vec<_>>(),
        )),
    ];

    let batch = RecordBatch::try_new(schema.clone(), columns).unwrap();
    StoredTable::new(schema, vec![batch])
}

/// One row of the externally derived features table.
#[derive(Debug, Clone)]
pub struct FeatureTrip {
    pub color: &'static str,
    pub pickup: NaiveDateTime,
    pub dropoff: NaiveDateTime,
    pub trip_distance: f64,
    pub trip_co2_kgs: Option<f64>,
    pub hour_of_day: i32,
    pub day_of_week: i32,
    pub week_of_year: i32,
    pub month_of_year: i32,
}

impl FeatureTrip {
    /// A 10 minute trip picked up on 2024-03-01 (a Friday) at 08:00.
    pub fn new(color: &'static str, trip_co2_kgs: f64) -> Self {
        let pickup = at(3, 1, 8, 0);
        Self {
            color,
            pickup,
            dropoff: pickup + Duration::minutes(10),
            trip_distance: 2.0,
            trip_co2_kgs: Some(trip_co2_kgs),
            hour_of_day: 8,
            day_of_week: 5,
            week_of_year: 9,
            month_of_year: 3,
        }
    }

    pub fn hour(mut self, hour: i32) -> Self {
        self.hour_of_day = hour;
        self
    }

    pub fn month(mut self, month: i32) -> Self {
        self.month_of_year = month;
        self
    }

    pub fn picked_up(mut self, pickup: NaiveDateTime) -> Self {
        self.dropoff = pickup + (self.dropoff - self.pickup);
        self.pickup = pickup;
        self
    }
}

pub fn features_table(trips: &[FeatureTrip]) -> StoredTable {
    let schema = Arc::new(Schema::new(vec![
        Field::new("color", DataType::Utf8, false),
        Field::new("pickup_datetime", DataType::Timestamp(TimeUnit::Nanosecond, None), true),
        Field::new("dropoff_datetime", DataType::Timestamp(TimeUnit::Nanosecond, None), true),
        Field::new("trip_distance", DataType::Float64, true),
        Field::new("trip_co2_kgs", DataType::Float64, true),
        Field::new("hour_of_day", DataType::Int32, true),
        Field::new("day_of_week", DataType::Int32, true),
        Field::new("week_of_year", DataType::Int32, true),
        Field::new("month_of_year", DataType::Int32, true),
    ]));

    if trips.is_empty() {
        return StoredTable::empty(schema);
    }

    let nanos = |t: &NaiveDateTime| t.and_utc().timestamp_nanos_opt().unwrap();
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(
            trips.iter().map(|t| t.color).collect::<Vec<_>>(),
        )),
        Arc::new(TimestampNanosecondArray::from(
            trips.iter().map(|t| nanos(&t.pickup)).collect::<Vec<_>>(),
        )),
        Arc::new(TimestampNanosecondArray::from(
            trips.iter().map(|t| nanos(&t.dropoff)).collect::<Vec<_>>(),
        )),
        Arc::new(Float64Array::from(
            trips.iter().map(|t| t.trip_distance).collect::<Vec<_>>(),
        )),
        Arc::new(Float64Array::from(
            trips.iter().map(|t| t.trip_co2_kgs).collect::<Vec<_>>(),
        )),
        Arc::new(Int32Array::from(
            trips.iter().map(|t| t.hour_of_day).collect::<Vec<_>>(),
        )),
        Arc::new(Int32Array::from(
            trips.iter().map(|t| t.day_of_week).collect::<Vec<_>>(),
        )),
        Arc::new(Int32Array::from(
            trips.iter().map(|t| t.week_of_year).collect::<Vec<_>>(),
        )),
        Arc::new(Int32Array::from(
            trips.iter().map(|t| t.month_of_year).collect::<Vec<_>>(),
        )),
    ];

    let batch = RecordBatch::try_new(schema.clone(), columns).unwrap();
    StoredTable::new(schema, vec![batch])
}
