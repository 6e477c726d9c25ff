use common::Result;
use datafusion::arrow::datatypes::DataType;
use datafusion::dataframe::DataFrame;
use datafusion::functions::expr_fn::date_part;
use datafusion::logical_expr::ScalarUDF;
use datafusion::prelude::*;

/// Adds `start_time` plus its calendar/clock breakdown to the filtered
/// session rows.
///
/// `ts` is epoch milliseconds; `start_time` and everything derived from it
/// use UTC, DataFusion's default for naive timestamps. Weekday follows
/// `date_part('dow')` numbering: 0 = Sunday through 6 = Saturday.
pub fn with_time_parts(df: DataFrame, to_timestamp: &ScalarUDF) -> Result<DataFrame> {
    let df = df.with_column("start_time", to_timestamp.call(vec![col("ts")]))?;

    let df = df
        .with_column("hour", calendar_part("hour"))?
        .with_column("day", calendar_part("day"))?
        .with_column("week", calendar_part("week"))?
        .with_column("month", calendar_part("month"))?
        .with_column("year", calendar_part("year"))?
        .with_column("weekday", calendar_part("dow"))?;

    Ok(df)
}

/// `time` dimension: one row per distinct timestamp in the filtered log.
pub fn time_table(df: &DataFrame) -> Result<DataFrame> {
    let time = df
        .clone()
        .select(vec![
            col("start_time"),
            col("hour"),
            col("day"),
            col("week"),
            col("month"),
            col("year"),
            col("weekday"),
        ])?
        .distinct()?;
    Ok(time)
}

fn calendar_part(part: &str) -> Expr {
    cast(date_part(lit(part), col("start_time")), DataType::Int32)
}
