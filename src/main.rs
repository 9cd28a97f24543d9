//! taskboard - HTTP Server Entry Point
//!
//! Starts the HTTP server that exposes the task queue API.

use taskboard::api;
use taskboard::config::Config;
use taskboard::store::{create_task_store, seed_initial_tasks};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskboard=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!(
        "Loaded configuration: store={:?}, data_dir={}",
        config.store_kind,
        config.data_dir.display()
    );

    // Initialize the task store and seed the sample queue if empty
    let store = create_task_store(config.store_kind, config.data_dir.clone()).await?;
    seed_initial_tasks(store.as_ref(), config.seed_tasks).await?;

    // Start HTTP server
    info!("Starting server on {}:{}", config.host, config.port);
    api::serve(config, store).await?;

    Ok(())
}
