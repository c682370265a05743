use anyhow::Context;
use tracing::info;
use vendmon_core::AppConfig;
use vendmon_db::Database;
use vendmon_vendor::{CatalogLoader, VendorRegistry};
use vendmon_worker::{AmqpConnector, Supervisor};

fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,vendmon=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    info!("Starting vendmon-worker v{}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load_with_env().context("failed to load configuration")?;

    let loader = CatalogLoader::new(&config.vendors.catalog_dir)
        .context("failed to open vendor catalog directory")?;
    let registry = VendorRegistry::load_from(&loader).context("failed to load vendors")?;
    info!(vendors = ?registry.names(), "vendor registry ready");

    let database = Database::connect(&config.database)
        .await
        .context("failed to open database")?;
    database
        .run_migrations()
        .await
        .context("failed to run database migrations")?;

    let handle = Supervisor::new(&config, registry, database.clone())
        .start(AmqpConnector::new(&config.broker));

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    info!("Ctrl-C received; stopping consume loops");

    for report in handle.stop().await {
        info!(
            queue = %report.queue,
            state = %report.state,
            processed = report.stats.processed,
            skipped = report.stats.skipped,
            restarts = report.restarts,
            last_error = ?report.last_error,
            "consume loop finished"
        );
    }

    database.close().await;
    Ok(())
}
