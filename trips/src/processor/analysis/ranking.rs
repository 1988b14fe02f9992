use crate::models::{BucketAverage, BucketExtreme, ExtremeKind, Granularity};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Highest average first; ties go to the lowest bucket id.
pub fn heavy_order(a: &BucketAverage, b: &BucketAverage) -> Ordering {
    b.avg_co2
        .total_cmp(&a.avg_co2)
        .then_with(|| a.bucket.cmp(&b.bucket))
}

/// Lowest average first; ties go to the lowest bucket id.
pub fn light_order(a: &BucketAverage, b: &BucketAverage) -> Ordering {
    a.avg_co2
        .total_cmp(&b.avg_co2)
        .then_with(|| a.bucket.cmp(&b.bucket))
}

/// First row of every category under `order`, keyed by category.
pub fn top_per_category<'a, F>(rows: &'a [BucketAverage], order: F) -> BTreeMap<&'a str, &'a BucketAverage>
where
    F: Fn(&BucketAverage, &BucketAverage) -> Ordering,
{
    let mut best: BTreeMap<&'a str, &'a BucketAverage> = BTreeMap::new();
    for row in rows {
        best.entry(row.category.as_str())
            .and_modify(|current| {
                if order(row, *current) == Ordering::Less {
                    *current = row;
                }
            })
            .or_insert(row);
    }
    best
}

/// One heavy and one light bucket per category, ordered by category then
/// kind.
pub fn heavy_and_light(rows: &[BucketAverage], granularity: Granularity) -> Vec<BucketExtreme> {
    let heavy = top_per_category(rows, heavy_order);
    let light = top_per_category(rows, light_order);

    let mut extremes = Vec::with_capacity(heavy.len() * 2);
    for (category, heavy_row) in &heavy {
        extremes.push(BucketExtreme {
            kind: ExtremeKind::Heavy,
            category: category.to_string(),
            granularity,
            bucket: heavy_row.bucket,
            avg_co2: heavy_row.avg_co2,
        });
        if let Some(light_row) = light.get(category) {
            extremes.push(BucketExtreme {
                kind: ExtremeKind::Light,
                category: category.to_string(),
                granularity,
                bucket: light_row.bucket,
                avg_co2: light_row.avg_co2,
            });
        }
    }
    extremes
}
