//! Service lifecycle: startup, serving, shutdown.

use std::future::Future;

use tokio::net::TcpListener;
use tracing::info;

use crate::api::{create_router, AppState};
use crate::config::Config;
use crate::error::StartupError;
use crate::metrics::{spawn_upkeep, Metrics, UPKEEP_INTERVAL};
use crate::store::{seed, MessageStore};

/// Open the store, apply the schema, seed an empty table and build the
/// metrics registry.
///
/// Any failure here is fatal: the service never starts half-initialized.
pub async fn init_state(config: &Config) -> Result<AppState, StartupError> {
    config.validate().map_err(StartupError::InvalidConfig)?;

    let store =
        MessageStore::connect(&config.database_url, config.database_max_connections).await?;

    let seeded = store.seed_if_empty(&seed::default_messages()).await?;
    if seeded > 0 {
        info!(count = seeded, "seeded_messages");
    }

    let metrics = Metrics::new()?;
    Ok(AppState::new(store, metrics))
}

/// Serve the API on `listener` until `shutdown` resolves.
pub async fn serve<F>(
    listener: TcpListener,
    state: AppState,
    shutdown: F,
) -> Result<(), StartupError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let store = state.store.clone();
    let upkeep = spawn_upkeep(state.metrics.clone(), UPKEEP_INTERVAL);
    let router = create_router(state);

    info!(addr = %listener.local_addr()?, "app_started");
    let served = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await;

    upkeep.abort();
    served?;

    store.close().await;
    info!("app_shutdown");
    Ok(())
}
