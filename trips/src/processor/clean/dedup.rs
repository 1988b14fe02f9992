use crate::schema::SOURCE_ROW;
use common::Result;
use common::category::CANONICAL_COLUMNS;
use datafusion::dataframe::DataFrame;
use datafusion::execution::context::SessionContext;
use datafusion::prelude::col;

/// Fields that together identify a trip. Two rows agreeing on all of them
/// are the same trip reported twice.
pub const DEDUP_KEY: [&str; 8] = [
    "pickup_datetime",
    "dropoff_datetime",
    "trip_distance",
    "pu_location_id",
    "do_location_id",
    "vendor_id",
    "total_amount",
    "passenger_count",
];

fn dedup_sql(table: &str) -> String {
    let columns = CANONICAL_COLUMNS.join(", ");
    format!(
        "SELECT {columns}, {row} FROM ( \
            SELECT *, ROW_NUMBER() OVER ( \
                PARTITION BY {key} \
                ORDER BY pickup_datetime ASC, {row} ASC \
            ) AS rn \
            FROM {table} \
         ) ranked \
         WHERE rn = 1",
        columns = columns,
        row = SOURCE_ROW,
        key = DEDUP_KEY.join(", "),
        table = table,
    )
}

/// Keeps the first row of every dedup-key group of a registered staged
/// table. Ties are broken by raw order, and the result keeps raw order.
/// Output columns are the canonical ones.
pub async fn deduplicate(ctx: &SessionContext, table: &str) -> Result<DataFrame> {
    let ranked = ctx.sql(&dedup_sql(table)).await?;
    let deduped = ranked
        .sort(vec![col(SOURCE_ROW).sort(true, false)])?
        .select_columns(&CANONICAL_COLUMNS)?;
    Ok(deduped)
}
