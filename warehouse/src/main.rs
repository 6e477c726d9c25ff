use clap::{Arg, Command};
use std::process;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let matches = Command::new("Warehouse Pipeline Manager")
        .version("1.0")
        .about("Builds the song-play star-schema warehouse from raw event logs")
        .subcommand(
            Command::new("etl")
                .about("Run the full warehouse ETL")
                .arg(
                    Arg::new("config")
                        .short('c')
                        .long("config")
                        .value_name("FILE")
                        .help("Sets a custom config file"),
                ),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("etl", etl_matches)) => {
            let config_path = etl_matches
                .get_one::<String>("config")
                .map(|s| s.as_str())
                .unwrap_or("config/warehouse.toml");
            tracing::info!("Starting warehouse ETL with config: {}", config_path);

            if let Err(e) = warehouse::run_warehouse_pipeline(config_path).await {
                tracing::error!("Warehouse ETL error: {}", e);
                process::exit(1);
            }
        }

        _ => {
            eprintln!("Please specify a valid subcommand");
            process::exit(1);
        }
    }
}
