use common::Result;
use datafusion::dataframe::DataFrame;
use datafusion::logical_expr::ScalarUDF;
use datafusion::prelude::*;

/// `song_plays` fact table.
///
/// Joins the time-enriched session rows against the raw song records on
/// artist display name. Byte equality, no normalization: events with no
/// byte-matching artist drop silently, and several songs sharing one artist
/// name fan out into one fact row each.
/// `year` and `month` ride along from the event's start_time as partition
/// values for the writer.
pub fn songplays_table(
    log_df: &DataFrame,
    song_df: &DataFrame,
    songplay_id: &ScalarUDF,
) -> Result<DataFrame> {
    // Narrow the song side to what the fact schema needs; this is a
    // projection of the raw rows, not a dedup, so the join fan-out is
    // untouched.
    let song_side = song_df.clone().select(vec![
        col("song_id"),
        col("artist_id"),
        col("artist_name"),
    ])?;

    let joined = log_df.clone().join(
        song_side,
        JoinType::Inner,
        &["artist"],
        &["artist_name"],
        None,
    )?;

    let with_id = joined.with_column("songplay_id", songplay_id.call(vec![col("ts")]))?;

    let plays = with_id.select(vec![
        col("songplay_id"),
        col("start_time"),
        col("user_id"),
        col("level"),
        col("song_id"),
        col("artist_id"),
        col("session_id"),
        col("location"),
        col("user_agent"),
        col("year"),
        col("month"),
    ])?;

    Ok(plays)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::test_util::{df_from_ndjson, i64_values, string_values};
    use crate::processor::{sessions, time, udf};
    use datafusion::execution::context::SessionContext;

    const LOG_NDJSON: &str = r#"
{"ts":1000000000000,"userId":"7","firstName":"Jo","lastName":"Doe","gender":"F","level":"free","page":"NextSong","artist":"Band","song":"T","sessionId":5,"itemInSession":0,"userAgent":"UA","location":"LA"}
{"ts":1000000005000,"userId":"7","firstName":"Jo","lastName":"Doe","gender":"F","level":"free","page":"NextSong","artist":"Nobody Known","song":"X","sessionId":5,"itemInSession":1,"userAgent":"UA","location":"LA"}
{"ts":1000000009000,"userId":"8","firstName":"Al","lastName":"Poe","gender":"M","level":"paid","page":"Home","artist":"Band","song":"T","sessionId":6,"itemInSession":0,"userAgent":"UA2","location":"NY"}
"#;

    const ONE_SONG_NDJSON: &str = r#"
{"song_id":"S1","title":"T","artist_id":"AR1","artist_name":"Band","artist_location":"LA","artist_latitude":1.0,"artist_longitude":2.0,"year":2000,"duration":180.0}
"#;

    const TWO_SONGS_ONE_ARTIST_NDJSON: &str = r#"
{"song_id":"S1","title":"T","artist_id":"AR1","artist_name":"Band","artist_location":"LA","artist_latitude":1.0,"artist_longitude":2.0,"year":2000,"duration":180.0}
{"song_id":"S2","title":"U","artist_id":"AR1","artist_name":"Band","artist_location":"LA","artist_latitude":1.0,"artist_longitude":2.0,"year":2001,"duration":200.0}
"#;

    async fn build_plays(ctx: &SessionContext, song_ndjson: &str) -> DataFrame {
        let log_df = df_from_ndjson(ctx, LOG_NDJSON);
        let log_df = sessions::filter_song_plays(log_df).unwrap();
        let to_timestamp = udf::epoch_ms_to_timestamp();
        let log_df = time::with_time_parts(log_df, &to_timestamp).unwrap();

        let song_df = df_from_ndjson(ctx, song_ndjson);
        songplays_table(&log_df, &song_df, &udf::songplay_id()).unwrap()
    }

    #[tokio::test]
    async fn matches_on_exact_artist_name_only() {
        let ctx = SessionContext::new();
        let plays = build_plays(&ctx, ONE_SONG_NDJSON).await;

        let batches = plays.collect().await.unwrap();
        // "Nobody Known" never matches and the Home event was filtered out
        assert_eq!(string_values(&batches, "song_id"), vec!["S1".to_string()]);
        assert_eq!(string_values(&batches, "artist_id"), vec!["AR1".to_string()]);
        assert_eq!(string_values(&batches, "user_id"), vec!["7".to_string()]);
    }

    #[tokio::test]
    async fn case_mismatch_produces_no_fact_row() {
        let ctx = SessionContext::new();
        let plays = build_plays(
            &ctx,
            r#"
{"song_id":"S1","title":"T","artist_id":"AR1","artist_name":"band","artist_location":"LA","artist_latitude":1.0,"artist_longitude":2.0,"year":2000,"duration":180.0}
"#,
        )
        .await;

        assert_eq!(plays.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn shared_artist_name_fans_out() {
        let ctx = SessionContext::new();
        let plays = build_plays(&ctx, TWO_SONGS_ONE_ARTIST_NDJSON).await;

        let batches = plays.collect().await.unwrap();
        let mut song_ids = string_values(&batches, "song_id");
        song_ids.sort();
        assert_eq!(song_ids, vec!["S1".to_string(), "S2".to_string()]);

        // Both fact rows come from the same log event
        let sessions = i64_values(&batches, "session_id");
        assert_eq!(sessions, vec![5, 5]);

        let mut ids = i64_values(&batches, "songplay_id");
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 2, "songplay ids must be unique");
    }
}
