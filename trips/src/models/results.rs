use chrono::NaiveDateTime;
use std::fmt;

const WEEKDAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
pub const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// The single highest-emission trip of a category.
#[derive(Debug, Clone, PartialEq)]
pub struct MaxTrip {
    pub category: String,
    pub pickup: NaiveDateTime,
    pub dropoff: NaiveDateTime,
    pub trip_distance: f64,
    pub trip_co2_kgs: f64,
}

/// Calendar bucketing of a trip's pickup time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Granularity {
    HourOfDay,
    DayOfWeek,
    WeekOfYear,
    MonthOfYear,
}

impl Granularity {
    pub const ALL: [Granularity; 4] = [
        Granularity::HourOfDay,
        Granularity::DayOfWeek,
        Granularity::WeekOfYear,
        Granularity::MonthOfYear,
    ];

    /// Features table column holding this bucket.
    pub fn column(&self) -> &'static str {
        match self {
            Granularity::HourOfDay => "hour_of_day",
            Granularity::DayOfWeek => "day_of_week",
            Granularity::WeekOfYear => "week_of_year",
            Granularity::MonthOfYear => "month_of_year",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Granularity::HourOfDay => "HOUR",
            Granularity::DayOfWeek => "DAY-OF-WEEK",
            Granularity::WeekOfYear => "WEEK",
            Granularity::MonthOfYear => "MONTH",
        }
    }

    /// Human readable bucket id. Out of range ids fall back to the number.
    pub fn format_bucket(&self, bucket: i64) -> String {
        match self {
            Granularity::HourOfDay => format!("{:02}:00", bucket),
            Granularity::DayOfWeek => usize::try_from(bucket)
                .ok()
                .and_then(|i| WEEKDAY_NAMES.get(i))
                .map(|name| name.to_string())
                .unwrap_or_else(|| bucket.to_string()),
            Granularity::WeekOfYear => format!("Week {}", bucket),
            Granularity::MonthOfYear => usize::try_from(bucket - 1)
                .ok()
                .and_then(|i| MONTH_NAMES.get(i))
                .map(|name| name.to_string())
                .unwrap_or_else(|| bucket.to_string()),
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExtremeKind {
    Heavy,
    Light,
}

impl ExtremeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtremeKind::Heavy => "heavy",
            ExtremeKind::Light => "light",
        }
    }
}

impl fmt::Display for ExtremeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Average emissions of one (category, bucket) group.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketAverage {
    pub category: String,
    pub bucket: i64,
    pub avg_co2: f64,
}

/// The heavy or light bucket of a category at one granularity.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketExtreme {
    pub kind: ExtremeKind,
    pub category: String,
    pub granularity: Granularity,
    pub bucket: i64,
    pub avg_co2: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyTotal {
    pub category: String,
    pub month: i64,
    pub total_co2_kg: f64,
}

/// Everything one analysis run produces.
#[derive(Debug, Clone, Default)]
pub struct AnalysisResults {
    pub max_trips: Vec<MaxTrip>,
    pub extremes: Vec<BucketExtreme>,
    pub monthly_totals: Vec<MonthlyTotal>,
}

impl AnalysisResults {
    pub fn extremes_for(&self, granularity: Granularity) -> impl Iterator<Item = &BucketExtreme> {
        self.extremes
            .iter()
            .filter(move |e| e.granularity == granularity)
    }
}
