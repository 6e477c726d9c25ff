pub mod dimensions;
pub mod reader;
pub mod sessions;
pub mod songplays;
pub mod time;
pub mod udf;
pub mod writer;

use std::sync::Arc;

use common::Result;
use datafusion::execution::context::SessionContext;
use datafusion::logical_expr::ScalarUDF;
use tracing::info;
use writer::TableWriter;

/// Drives the two top-level stages of the warehouse build.
///
/// Every sub-operation is tagged with a stage name on failure so the single
/// diagnostic line at the top level says which operation aborted the run.
pub struct WarehouseProcessor {
    ctx: Arc<SessionContext>,
    input_root: String,
    writer: TableWriter,
    to_timestamp: ScalarUDF,
    songplay_id: ScalarUDF,
}

impl WarehouseProcessor {
    pub fn new(ctx: Arc<SessionContext>, input_root: String, writer: TableWriter) -> Self {
        Self {
            ctx,
            input_root: input_root.trim_end_matches('/').to_string(),
            writer,
            to_timestamp: udf::epoch_ms_to_timestamp(),
            songplay_id: udf::songplay_id(),
        }
    }

    fn song_data_glob(&self) -> String {
        format!("{}/song_data/*/*/*/*.json", self.input_root)
    }

    fn log_data_glob(&self) -> String {
        format!("{}/log_data/*.json", self.input_root)
    }

    /// Builds and writes the `songs` and `artists` dimensions from the raw
    /// song-metadata records.
    pub async fn process_song_data(&self) -> Result<()> {
        info!("Processing song data from {}", self.song_data_glob());

        let df = reader::read_ndjson(&self.ctx, &self.song_data_glob())
            .await
            .map_err(|e| e.in_stage("read_song_data"))?;

        let songs = dimensions::songs_table(&df).map_err(|e| e.in_stage("build_songs"))?;
        self.writer
            .write_table(songs, "songs", &["year", "artist_id"])
            .await
            .map_err(|e| e.in_stage("write_songs"))?;

        let artists = dimensions::artists_table(&df).map_err(|e| e.in_stage("build_artists"))?;
        self.writer
            .write_table(artists, "artists", &[])
            .await
            .map_err(|e| e.in_stage("write_artists"))?;

        Ok(())
    }

    /// Builds and writes the `users` and `time` dimensions and the
    /// `song_plays` fact table from the raw session logs.
    pub async fn process_log_data(&self) -> Result<()> {
        info!("Processing log data from {}", self.log_data_glob());

        let df = reader::read_ndjson(&self.ctx, &self.log_data_glob())
            .await
            .map_err(|e| e.in_stage("read_log_data"))?;

        let df = sessions::filter_song_plays(df).map_err(|e| e.in_stage("filter_log_data"))?;

        let users = dimensions::users_table(&df).map_err(|e| e.in_stage("build_users"))?;
        self.writer
            .write_table(users, "users", &[])
            .await
            .map_err(|e| e.in_stage("write_users"))?;

        let df = time::with_time_parts(df, &self.to_timestamp)
            .map_err(|e| e.in_stage("derive_time_parts"))?;

        let time_dim = time::time_table(&df).map_err(|e| e.in_stage("build_time"))?;
        self.writer
            .write_table(time_dim, "time", &["year", "month"])
            .await
            .map_err(|e| e.in_stage("write_time"))?;

        // The fact join runs against the raw song rows read again here, not
        // the deduplicated songs dimension.
        let song_df = reader::read_ndjson(&self.ctx, &self.song_data_glob())
            .await
            .map_err(|e| e.in_stage("read_song_data_for_plays"))?;

        let plays = songplays::songplays_table(&df, &song_df, &self.songplay_id)
            .map_err(|e| e.in_stage("build_song_plays"))?;
        self.writer
            .write_table(plays, "song_plays", &["year", "month"])
            .await
            .map_err(|e| e.in_stage("write_song_plays"))?;

        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_song_data_fails_in_the_read_stage() {
        let input_dir = TempDir::new().unwrap();
        std::fs::create_dir(input_dir.path().join("song_data")).unwrap();
        let output_dir = TempDir::new().unwrap();

        let ctx = Arc::new(SessionContext::new());
        let writer = TableWriter::new(
            ctx.clone(),
            &format!("file://{}", output_dir.path().display()),
        );
        let processor = WarehouseProcessor::new(
            ctx,
            format!("file://{}", input_dir.path().display()),
            writer,
        );

        let err = processor.process_song_data().await.unwrap_err();
        assert_eq!(err.stage(), Some("read_song_data"));
    }
}
