use common::{Error, Result};
use datafusion::dataframe::DataFrame;
use datafusion::execution::context::SessionContext;
use datafusion::prelude::NdJsonReadOptions;
use tracing::debug;

/// Loads every file matching `path` (a URL, possibly with glob segments) as
/// one JSON object per line.
///
/// Fields absent from a given record surface as nulls; a glob that matches
/// nothing, or a file that is not valid JSON-per-line, is fatal for the
/// calling stage.
pub async fn read_ndjson(ctx: &SessionContext, path: &str) -> Result<DataFrame> {
    debug!("Reading JSON records from {}", path);

    let options = NdJsonReadOptions::default().file_extension(".json");
    let df = ctx.read_json(path, options).await?;

    // An empty glob match yields a schemaless table rather than an error
    if df.schema().fields().is_empty() {
        return Err(Error::InvalidInput(format!(
            "no records matched '{}'",
            path
        )));
    }

    Ok(df)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn reads_one_record_per_line_across_files() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("a.json"),
            "{\"song_id\":\"S1\",\"year\":2000}\n{\"song_id\":\"S2\",\"year\":2001}\n",
        )
        .unwrap();
        fs::write(dir.path().join("b.json"), "{\"song_id\":\"S3\",\"year\":2002}\n").unwrap();

        let ctx = SessionContext::new();
        let df = read_ndjson(&ctx, &format!("{}/*.json", dir.path().display()))
            .await
            .unwrap();

        assert_eq!(df.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn records_missing_a_field_read_as_null() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("a.json"),
            "{\"song_id\":\"S1\",\"title\":\"T\"}\n{\"song_id\":\"S2\"}\n",
        )
        .unwrap();

        let ctx = SessionContext::new();
        let df = read_ndjson(&ctx, &format!("{}/*.json", dir.path().display()))
            .await
            .unwrap();

        let with_title = df
            .filter(datafusion::prelude::col("title").is_not_null())
            .unwrap();
        assert_eq!(with_title.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn empty_glob_match_is_fatal() {
        let dir = TempDir::new().unwrap();

        let ctx = SessionContext::new();
        let result = read_ndjson(&ctx, &format!("{}/*.json", dir.path().display())).await;

        assert!(result.is_err());
    }
}
