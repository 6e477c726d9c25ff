use std::sync::Arc;

use common::config::{S3Config, Settings};
use common::{Error, Result};
use datafusion::execution::context::SessionContext;
use object_store::aws::AmazonS3Builder;
use url::Url;

/// Builds the DataFusion session the whole run shares.
///
/// Credentials come in through [`Settings`] and are handed straight to the
/// per-bucket object stores; nothing is exported into the process
/// environment.
pub fn build_session(settings: &Settings) -> Result<SessionContext> {
    let ctx = SessionContext::new();

    for root in [
        &settings.locations.input_root,
        &settings.locations.output_root,
    ] {
        register_store_for(&ctx, root, settings.s3.as_ref())?;
    }

    Ok(ctx)
}

fn register_store_for(ctx: &SessionContext, root: &str, s3: Option<&S3Config>) -> Result<()> {
    let url = Url::parse(root)?;

    match url.scheme() {
        // The default registry already serves file:// URLs
        "file" => Ok(()),
        "s3" => {
            let bucket = url.host_str().ok_or_else(|| {
                Error::InvalidInput(format!("s3 URL '{}' has no bucket name", root))
            })?;
            let s3 = s3.ok_or_else(|| {
                Error::InvalidInput(format!(
                    "location '{}' requires an [s3] block in the configuration",
                    root
                ))
            })?;

            let store = AmazonS3Builder::new()
                .with_bucket_name(bucket)
                .with_region(&s3.region)
                .with_access_key_id(&s3.access_key)
                .with_secret_access_key(&s3.secret_key)
                .with_endpoint(&s3.endpoint)
                .with_allow_http(s3.allow_http)
                .build()?;

            let bucket_url = Url::parse(&format!("s3://{}", bucket))?;
            ctx.runtime_env()
                .register_object_store(&bucket_url, Arc::new(store));
            Ok(())
        }
        other => Err(Error::InvalidInput(format!(
            "unsupported storage scheme '{}' in '{}'",
            other, root
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::config::Locations;

    fn settings(input: &str, output: &str, s3: Option<S3Config>) -> Settings {
        Settings {
            locations: Locations {
                input_root: input.to_string(),
                output_root: output.to_string(),
            },
            s3,
        }
    }

    #[test]
    fn file_roots_need_no_s3_block() {
        let settings = settings("file:///data/in", "file:///data/out", None);
        assert!(build_session(&settings).is_ok());
    }

    #[test]
    fn s3_root_without_credentials_is_rejected() {
        let settings = settings("s3://events", "file:///data/out", None);
        let err = build_session(&settings).err().unwrap();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn s3_root_with_credentials_registers() {
        let s3 = S3Config {
            endpoint: "http://localhost:9000".to_string(),
            region: "us-east-1".to_string(),
            access_key: "test".to_string(),
            secret_key: "test".to_string(),
            allow_http: true,
        };
        let settings = settings("s3://events", "s3://tables", Some(s3));
        assert!(build_session(&settings).is_ok());
    }

    #[test]
    fn unknown_scheme_is_rejected() {
        let settings = settings("ftp://events", "file:///data/out", None);
        assert!(build_session(&settings).is_err());
    }
}
