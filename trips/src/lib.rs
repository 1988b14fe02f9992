pub mod chart;
pub mod models;
pub mod processor;
pub mod schema;
pub mod services;
pub mod utils;

#[cfg(test)]
mod fixtures;

use common::Result;
use common::config::Settings;
use processor::CleanOutcome;
use services::{AnalysisRun, TripsService};

/// Cleans the raw per-category tables into the combined cleaned table.
pub async fn run_clean_stage(settings: &Settings) -> Result<CleanOutcome> {
    let service = TripsService::new(settings)?;
    service.clean().await
}

/// Runs the extrema analytics over the features table.
pub async fn run_analysis_stage(settings: &Settings) -> Result<AnalysisRun> {
    let service = TripsService::new(settings)?;
    service.analyze().await
}
