mod config;
mod db;
mod models;
mod processor;

use anyhow::bail;
use config::AppConfig;
use db::store::{PgDeviceStore, StoreConfig};
use processor::device_processor;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load config
    let config = AppConfig::load()?;

    // Init logging; stdout is reserved for the result
    tracing_subscriber::fmt()
        .with_env_filter(&config.log_level)
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 2 {
        bail!("invalid number of command line arguments: expected one JSON record");
    }
    let incoming = device_processor::parse_record(args[1].as_bytes())?;

    // Init DB
    let pool = db::init_pool(&config).await?;
    db::ensure_schema(&pool, config.schema_timeout()).await?;
    info!("Connected to database");

    let store = PgDeviceStore::new(pool, StoreConfig::from_app(&config));
    let outcome = device_processor::process_record(&store, incoming).await;

    info!(
        "Finished device {} (first observation: {})",
        outcome.record.device, outcome.created
    );

    let mut output = outcome.record;
    output.generated = None;
    println!("{}", serde_json::to_string(&output)?);

    Ok(())
}
