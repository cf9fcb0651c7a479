use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

use vidgate_api::routes::build_router;
use vidgate_api::server::start_server;
use vidgate_api::state::AppState;
use vidgate_core::Config;
use vidgate_db::PgRecordStore;
use vidgate_provider::HttpVideoProvider;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .acquire_timeout(Duration::from_secs(config.database.timeout_seconds))
        .connect(&config.database.url)
        .await?;

    let store = PgRecordStore::new(pool);
    store.run_migrations().await?;

    let provider = HttpVideoProvider::new(&config.provider)?;

    let state = Arc::new(AppState::new(
        Arc::new(store),
        Arc::new(provider),
        config.clone(),
    ));
    let router = build_router(state);

    start_server(&config, router).await?;

    Ok(())
}
