use common::Result;
use datafusion::dataframe::DataFrame;
use datafusion::prelude::*;

/// Restricts raw log records to "song played" events and renames the
/// camelCase log fields to the canonical warehouse schema.
///
/// The source field names are case sensitive, hence the quoted identifiers.
/// Every downstream table builds on the frame returned here, so a row with
/// any other `page` value can never reach the warehouse.
pub fn filter_song_plays(df: DataFrame) -> Result<DataFrame> {
    let df = df.filter(col("page").eq(lit("NextSong")))?;

    let df = df
        .with_column_renamed(r#""userId""#, "user_id")?
        .with_column_renamed(r#""firstName""#, "first_name")?
        .with_column_renamed(r#""lastName""#, "last_name")?
        .with_column_renamed(r#""userAgent""#, "user_agent")?
        .with_column_renamed(r#""sessionId""#, "session_id")?
        .with_column_renamed(r#""itemInSession""#, "item_in_session")?;

    Ok(df)
}
