use common::Result;
use datafusion::dataframe::DataFrame;
use datafusion::prelude::*;

/// `songs` dimension: project the song attributes and drop exact-duplicate
/// rows.
///
/// Dedup is whole-tuple, not keyed: a song_id that appears with two different
/// titles keeps both rows.
pub fn songs_table(df: &DataFrame) -> Result<DataFrame> {
    let songs = df
        .clone()
        .select(vec![
            col("song_id"),
            col("title"),
            col("artist_id"),
            col("year"),
            col("duration"),
        ])?
        .distinct()?;
    Ok(songs)
}

/// `artists` dimension: projected from the same raw song records.
pub fn artists_table(df: &DataFrame) -> Result<DataFrame> {
    let artists = df
        .clone()
        .select(vec![
            col("artist_id"),
            col("artist_name"),
            col("artist_location"),
            col("artist_latitude"),
            col("artist_longitude"),
        ])?
        .distinct()?;
    Ok(artists)
}

/// `users` dimension, built from the filtered and renamed session rows.
///
/// A user whose subscription level changes across sessions produces one row
/// per distinct tuple; the table keys on the whole tuple, not on user_id.
pub fn users_table(df: &DataFrame) -> Result<DataFrame> {
    let users = df
        .clone()
        .select(vec![
            col("user_id"),
            col("first_name"),
            col("last_name"),
            col("gender"),
            col("level"),
        ])?
        .distinct()?;
    Ok(users)
}
