pub mod results;

pub use results::{
    AnalysisResults, BucketAverage, BucketExtreme, ExtremeKind, Granularity, MaxTrip,
    MonthlyTotal,
};
