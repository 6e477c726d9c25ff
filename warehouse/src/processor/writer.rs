use std::sync::Arc;

use common::{Error, Result};
use datafusion::config::TableParquetOptions;
use datafusion::dataframe::{DataFrame, DataFrameWriteOptions};
use datafusion::execution::context::SessionContext;
use futures::TryStreamExt;
use object_store::ObjectStore;
use object_store::path::Path as ObjectPath;
use tracing::{debug, info};
use url::Url;

/// Persists warehouse tables as partitioned, snappy-compressed parquet under
/// `<output_root>/<table>/`.
///
/// Each write is a full overwrite: everything already under the destination
/// prefix is deleted first, and the write is only reported successful once
/// parquet objects are observable at the destination.
pub struct TableWriter {
    ctx: Arc<SessionContext>,
    output_root: String,
}

impl TableWriter {
    pub fn new(ctx: Arc<SessionContext>, output_root: &str) -> Self {
        Self {
            ctx,
            output_root: output_root.trim_end_matches('/').to_string(),
        }
    }

    pub async fn write_table(
        &self,
        df: DataFrame,
        table: &str,
        partition_cols: &[&str],
    ) -> Result<()> {
        let dest = format!("{}/{}/", self.output_root, table);

        self.clear_destination(&dest).await?;

        let mut write_options = DataFrameWriteOptions::new();
        if !partition_cols.is_empty() {
            write_options = write_options
                .with_partition_by(partition_cols.iter().map(|c| c.to_string()).collect());
        }

        let mut parquet_options = TableParquetOptions::default();
        parquet_options.global.compression = Some("snappy".to_string());

        info!("Writing table '{}' to {}", table, dest);
        df.write_parquet(&dest, write_options, Some(parquet_options))
            .await?;

        self.verify_destination(&dest, table).await
    }

    fn store_and_prefix(&self, dest: &str) -> Result<(Arc<dyn ObjectStore>, ObjectPath)> {
        let url = Url::parse(dest)?;
        let store = self.ctx.runtime_env().object_store_registry.get_store(&url)?;
        let prefix = ObjectPath::from_url_path(url.path())
            .map_err(|e| Error::InvalidInput(format!("invalid destination '{}': {}", dest, e)))?;
        Ok((store, prefix))
    }

    /// Deletes every object under the destination prefix so the new table
    /// fully replaces the previous run's output.
    async fn clear_destination(&self, dest: &str) -> Result<()> {
        let (store, prefix) = self.store_and_prefix(dest)?;

        let mut objects = store.list(Some(&prefix));
        let mut removed = 0usize;
        loop {
            match objects.try_next().await {
                Ok(Some(meta)) => {
                    store.delete(&meta.location).await?;
                    removed += 1;
                }
                Ok(None) => break,
                // Nothing written there yet
                Err(object_store::Error::NotFound { .. }) => break,
                Err(e) => return Err(e.into()),
            }
        }

        if removed > 0 {
            debug!("Cleared {} objects under {}", removed, dest);
        }
        Ok(())
    }

    async fn verify_destination(&self, dest: &str, table: &str) -> Result<()> {
        let (store, prefix) = self.store_and_prefix(dest)?;

        let mut objects = store.list(Some(&prefix));
        while let Some(meta) = objects.try_next().await? {
            if meta.location.as_ref().ends_with(".parquet") {
                return Ok(());
            }
        }

        Err(Error::Storage(format!(
            "no parquet objects found under '{}' after writing table '{}'",
            dest, table
        )))
    }
}
