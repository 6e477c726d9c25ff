use config::{Config, ConfigError};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub locations: Locations,
    /// Required whenever either location root uses the s3:// scheme.
    pub s3: Option<S3Config>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Locations {
    /// Root URL holding `song_data/` and `log_data/` (s3:// or file://).
    pub input_root: String,
    /// Root URL the five warehouse table directories are written under.
    pub output_root: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct S3Config {
    #[serde(default = "default_s3_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_s3_region")]
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
    #[serde(default)]
    pub allow_http: bool,
}

fn default_s3_endpoint() -> String {
    "http://localhost:9000".to_string()
}

fn default_s3_region() -> String {
    "us-east-1".to_string()
}

impl Settings {
    pub fn new(path: &str) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("WAREHOUSE").separator("__"));

        let config = builder.build()?;

        let settings: Settings = config.try_deserialize()?;

        debug!(
            input_root = %settings.locations.input_root,
            output_root = %settings.locations.output_root,
            "Loaded warehouse configuration"
        );

        Ok(settings)
    }
}
