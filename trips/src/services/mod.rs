pub mod pipeline;
pub use pipeline::{AnalysisRun, TripsService};
