use crate::models::MonthlyTotal;
use crate::models::results::MONTH_NAMES;
use common::{Error, Result};
use plotters::prelude::*;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

const YELLOW_LINE: RGBColor = RGBColor(255, 176, 0);
const GREEN_LINE: RGBColor = RGBColor(46, 125, 50);
const OTHER_LINES: [RGBColor; 3] = [
    RGBColor(21, 101, 192),
    RGBColor(198, 40, 40),
    RGBColor(106, 27, 154),
];

/// Twelve monthly totals for one category, January first.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlySeries {
    pub category: String,
    pub totals: [f64; 12],
}

impl MonthlySeries {
    pub fn peak(&self) -> f64 {
        self.totals.iter().copied().fold(0.0, f64::max)
    }
}

/// Reshapes monthly totals into one complete series per category, ordered
/// by category. Months without trips are zero.
pub fn monthly_series(totals: &[MonthlyTotal]) -> Result<Vec<MonthlySeries>> {
    let mut by_category: BTreeMap<&str, [f64; 12]> = BTreeMap::new();

    for total in totals {
        if !(1..=12).contains(&total.month) {
            return Err(Error::InvariantViolation(format!(
                "{} has a monthly total for month {}",
                total.category, total.month
            )));
        }
        let series = by_category.entry(total.category.as_str()).or_insert([0.0; 12]);
        series[(total.month - 1) as usize] += total.total_co2_kg;
    }

    Ok(by_category
        .into_iter()
        .map(|(category, totals)| MonthlySeries {
            category: category.to_string(),
            totals,
        })
        .collect())
}

fn line_color(category: &str, index: usize) -> RGBColor {
    match category {
        "yellow" => YELLOW_LINE,
        "green" => GREEN_LINE,
        _ => OTHER_LINES[index % OTHER_LINES.len()],
    }
}

fn chart_error<E: std::fmt::Display>(e: E) -> Error {
    Error::Other(format!("Chart rendering failed: {}", e))
}

/// Draws the monthly series as an SVG line chart.
///
/// The category with the largest peak goes on the left axis and the
/// others share the right axis, so series of different magnitude stay
/// readable.
pub fn render_monthly_chart(series: &[MonthlySeries], year: i32, path: &Path) -> Result<()> {
    let primary_index = series
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.peak().total_cmp(&b.peak()))
        .map(|(i, _)| i)
        .ok_or_else(|| Error::InvalidInput("No monthly series to chart".to_string()))?;
    let primary = &series[primary_index];
    let secondary: Vec<(usize, &MonthlySeries)> = series
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != primary_index)
        .collect();

    let primary_top = (primary.peak() * 1.1).max(1.0);
    let secondary_top = (secondary
        .iter()
        .map(|(_, s)| s.peak())
        .fold(0.0, f64::max)
        * 1.1)
        .max(1.0);

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let root = SVGBackend::new(path, (1200, 600)).into_drawing_area();
    root.fill(&WHITE).map_err(chart_error)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!("Monthly CO2 Totals by Taxi Color ({})", year),
            ("sans-serif", 24),
        )
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .right_y_label_area_size(70)
        .build_cartesian_2d(0usize..11usize, 0f64..primary_top)
        .map_err(chart_error)?
        .set_secondary_coord(0usize..11usize, 0f64..secondary_top);

    let month_label = |m: &usize| MONTH_NAMES.get(*m).copied().unwrap_or("").to_string();
    chart
        .configure_mesh()
        .x_labels(12)
        .x_label_formatter(&month_label)
        .x_desc("Month")
        .y_desc(format!("{} Total CO2 (kg)", primary.category.to_uppercase()))
        .draw()
        .map_err(chart_error)?;

    let secondary_desc = secondary
        .iter()
        .map(|(_, s)| s.category.to_uppercase())
        .collect::<Vec<_>>()
        .join(" / ");
    chart
        .configure_secondary_axes()
        .y_desc(format!("{} Total CO2 (kg)", secondary_desc))
        .draw()
        .map_err(chart_error)?;

    let color = line_color(&primary.category, primary_index);
    chart
        .draw_series(LineSeries::new(
            primary.totals.iter().copied().enumerate(),
            color.stroke_width(2),
        ))
        .map_err(chart_error)?
        .label(primary.category.to_uppercase())
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &color));

    for (index, other) in &secondary {
        let color = line_color(&other.category, *index);
        chart
            .draw_secondary_series(LineSeries::new(
                other.totals.iter().copied().enumerate(),
                color.stroke_width(2),
            ))
            .map_err(chart_error)?
            .label(other.category.to_uppercase())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &color));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()
        .map_err(chart_error)?;

    root.present().map_err(chart_error)?;
    info!(path = %path.display(), series = series.len(), "Saved monthly chart");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn total(category: &str, month: i64, total_co2_kg: f64) -> MonthlyTotal {
        MonthlyTotal {
            category: category.to_string(),
            month,
            total_co2_kg,
        }
    }

    #[test]
    fn absent_months_are_zero_filled() {
        let series = monthly_series(&[total("yellow", 3, 4.0), total("yellow", 7, 2.5)]).unwrap();

        assert_eq!(series.len(), 1);
        let totals = series[0].totals;
        assert_eq!(totals[2], 4.0);
        assert_eq!(totals[6], 2.5);
        assert_eq!(totals.iter().filter(|t| **t == 0.0).count(), 10);
    }

    #[test]
    fn every_present_category_gets_twelve_months() {
        let series = monthly_series(&[
            total("yellow", 1, 1.0),
            total("green", 12, 2.0),
            total("yellow", 2, 3.0),
        ])
        .unwrap();

        let names: Vec<&str> = series.iter().map(|s| s.category.as_str()).collect();
        assert_eq!(names, vec!["green", "yellow"]);
        assert!(series.iter().all(|s| s.totals.len() == 12));
        assert_eq!(series[1].peak(), 3.0);
    }

    #[test]
    fn month_out_of_range_is_an_invariant_violation() {
        for month in [0, 13] {
            let result = monthly_series(&[total("green", month, 1.0)]);
            assert!(matches!(result, Err(Error::InvariantViolation(_))));
        }
    }

    #[test]
    fn chart_is_written_as_svg() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plots").join("monthly_co2.svg");
        let series = monthly_series(&[
            total("yellow", 3, 4000.0),
            total("yellow", 7, 2500.0),
            total("green", 3, 40.0),
        ])
        .unwrap();

        render_monthly_chart(&series, 2024, &path).unwrap();

        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("YELLOW"));
        assert!(svg.contains("GREEN"));
    }

    #[test]
    fn nothing_to_chart_is_invalid_input() {
        let dir = tempfile::tempdir().unwrap();
        let result = render_monthly_chart(&[], 2024, &dir.path().join("monthly_co2.svg"));
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }
}
