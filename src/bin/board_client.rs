//! board-client - demo polling client.
//!
//! Connects to a taskboard server, starts a reconciliation session for one
//! user and logs every snapshot change until ctrl-c. Environment:
//! - `TASKBOARD_URL` - server base URL, defaults to `http://127.0.0.1:8000`
//! - `TASKBOARD_USER` - required username for the session

use anyhow::Context;
use taskboard::client::{ApiClient, Session};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskboard=debug,board_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let base_url =
        std::env::var("TASKBOARD_URL").unwrap_or_else(|_| "http://127.0.0.1:8000".to_string());
    let username = std::env::var("TASKBOARD_USER").context("TASKBOARD_USER must be set")?;

    let api = ApiClient::new(&base_url)?;
    let health = api.health().await?;
    info!(
        "Connected to {} (version {}, persistent store: {})",
        base_url, health.version, health.persistent_store
    );

    let session = Session::start(api, username.clone());
    let mut snapshots = session.snapshots();

    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow().clone();
                info!(
                    "board for {}: {} queued, {} mine",
                    username,
                    snapshot.queue.len(),
                    snapshot.mine.len()
                );
                for task in &snapshot.mine {
                    info!("  #{} {} [{}]", task.id, task.title, task.status);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Logging out");
                break;
            }
        }
    }

    session.shutdown().await;
    Ok(())
}
