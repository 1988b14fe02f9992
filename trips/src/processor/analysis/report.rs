use crate::models::{AnalysisResults, BucketExtreme, ExtremeKind, Granularity, MaxTrip};
use std::collections::BTreeSet;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn max_trip_line(trip: &MaxTrip) -> String {
    format!(
        "{}: {:.3} kg (dist={:.2} mi, pickup={}, dropoff={})",
        trip.category.to_uppercase(),
        trip.trip_co2_kgs,
        trip.trip_distance,
        trip.pickup.format(TIMESTAMP_FORMAT),
        trip.dropoff.format(TIMESTAMP_FORMAT)
    )
}

pub fn extreme_line(extreme: &BucketExtreme) -> String {
    format!(
        "{} {} {}: {} (avg {:.3} kg/trip)",
        extreme.category.to_uppercase(),
        extreme.kind.as_str().to_uppercase(),
        extreme.granularity.label(),
        extreme.granularity.format_bucket(extreme.bucket),
        extreme.avg_co2
    )
}

/// Heavy then light line for every category present at `granularity`.
/// Rows are matched by their fields, never by position.
pub fn granularity_lines(extremes: &[BucketExtreme], granularity: Granularity) -> Vec<String> {
    let categories: BTreeSet<&str> = extremes
        .iter()
        .filter(|e| e.granularity == granularity)
        .map(|e| e.category.as_str())
        .collect();

    let mut lines = Vec::new();
    for category in categories {
        for kind in [ExtremeKind::Heavy, ExtremeKind::Light] {
            if let Some(extreme) = extremes
                .iter()
                .find(|e| e.granularity == granularity && e.category == category && e.kind == kind)
            {
                lines.push(extreme_line(extreme));
            }
        }
    }
    lines
}

/// The full report as printable lines, section headers included.
pub fn render(results: &AnalysisResults) -> Vec<String> {
    let mut lines = vec!["=== Largest CO2 trip (per color) ===".to_string()];
    if results.max_trips.is_empty() {
        lines.push("(no trips)".to_string());
    }
    lines.extend(results.max_trips.iter().map(max_trip_line));

    for granularity in Granularity::ALL {
        lines.push(String::new());
        lines.push(format!(
            "=== {}: Most/Least carbon-heavy (avg CO2 per trip) ===",
            granularity.label()
        ));
        let section = granularity_lines(&results.extremes, granularity);
        if section.is_empty() {
            lines.push("(no trips)".to_string());
        }
        lines.extend(section);
    }

    lines
}
