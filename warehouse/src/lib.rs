pub mod processor;
pub mod session;

use std::sync::Arc;

use common::Result;
use common::config::Settings;
use processor::WarehouseProcessor;
use processor::writer::TableWriter;
use tracing::info;

/// Runs the complete warehouse ETL: both top-level stages, halting on the
/// first failed stage.
pub async fn run_warehouse_pipeline(config_path: &str) -> Result<()> {
    // Load configuration before touching any storage
    let settings = Settings::new(config_path)?;

    let ctx = Arc::new(session::build_session(&settings)?);
    let writer = TableWriter::new(ctx.clone(), &settings.locations.output_root);
    let processor = WarehouseProcessor::new(ctx, settings.locations.input_root.clone(), writer);

    processor.process_song_data().await?;
    processor.process_log_data().await?;

    info!("All warehouse tables written to {}", settings.locations.output_root);
    Ok(())
}
