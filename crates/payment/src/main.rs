use anyhow::{Context, Result};
use payment::{config::Config, handler::AppRouter, state::AppState};
use shared::{
    config::{ConnectionManager, ConnectionPool},
    utils::{LoggerOptions, Telemetry, init_logger},
};
use tracing::{error, info};

const SERVICE_NAME: &str = "payment-service";

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let config = Config::init().context("Failed to load configuration")?;

    let telemetry = Telemetry::init(SERVICE_NAME, &config.otel_endpoint)
        .context("Failed to initialize telemetry")?;

    let _log_guard = init_logger(
        telemetry.logger_provider(),
        SERVICE_NAME,
        LoggerOptions {
            is_dev: config.is_dev,
            enable_file: config.enable_file_log,
        },
    )
    .context("Failed to initialize logger")?;

    let result = run(&config).await;

    if let Err(e) = &result {
        error!("❌ Payment service stopped with error: {e:#}");
    }

    if let Err(e) = telemetry.shutdown() {
        eprintln!("Failed to shutdown telemetry: {e}");
    }

    result
}

async fn run(config: &Config) -> Result<()> {
    let pool = ConnectionManager::new_pool(
        &config.database_url,
        config.db_min_conn,
        config.db_max_conn,
    )
    .await
    .context("Failed to initialize database pool")?;

    if config.run_migrations {
        run_migrations(&pool)
            .await
            .context("Failed to run database migrations")?;
    }

    let state = AppState::new(pool, config)
        .await
        .context("Failed to create AppState")?;

    info!("✅ Application setup completed, starting HTTP server");

    AppRouter::serve(config.port, state).await?;

    info!("✅ Payment service shutdown complete.");
    Ok(())
}

async fn run_migrations(pool: &ConnectionPool) -> Result<()> {
    info!("Running database migrations");
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
