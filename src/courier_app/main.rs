/**
 * Courier Sync Entry Point
 *
 * Runs the offline courier queue headless: opens the local action store,
 * refreshes the job list, and keeps draining queued actions in the background
 * until Ctrl-C.
 */

use courier_sync::courier_app::api_client::HttpJobsApi;
use courier_sync::courier_app::config::Config;
use courier_sync::courier_app::local_db::{sqlite::SqliteStorage, LocalActionStore};
use courier_sync::courier_app::offline::ActionQueueManager;
use courier_sync::courier_app::sync::{
    ConnectivityMonitor, NetworkStatus, SyncConfig, SyncEvent, SyncService,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file if present
    dotenv::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&env_filter))
        .init();

    let config = Config::from_env()?;
    tracing::info!("[STARTUP] backend at {}", config.server_url());

    let storage = match &config.app().database_path {
        Some(path) => SqliteStorage::open(path).await?,
        None => SqliteStorage::open_default().await?,
    };
    let store =
        LocalActionStore::open_or_recover(Arc::new(storage), config.app().storage_quota_bytes)
            .await?;

    let api = Arc::new(HttpJobsApi::new(config.clone())?);
    let monitor = ConnectivityMonitor::with_probe(
        NetworkStatus::Online,
        api.clone(),
        config.app().probe_failure_threshold,
    );
    let manager = ActionQueueManager::new(api, Arc::new(store), monitor.clone(), config.app());

    let _notices = manager.on_sync_status_change(|event| match event {
        SyncEvent::WentOffline => tracing::warn!("Offline: actions will be queued"),
        SyncEvent::Reconnected => tracing::info!("Back online"),
        SyncEvent::DrainFinished { remaining, .. } if *remaining > 0 => {
            tracing::warn!("Partial sync: {} actions still queued", remaining)
        }
        SyncEvent::ActionDeadLettered { job_id, kind, reason, .. } => {
            tracing::error!("{} for job {} needs attention: {}", kind, job_id, reason)
        }
        SyncEvent::AuthRequired { status } => {
            tracing::error!("Sign in again ({}); queued actions are kept", status)
        }
        SyncEvent::StorageWarning { message, .. } => tracing::warn!("{}", message),
        _ => {}
    });

    monitor.force_check().await;
    match manager.refresh().await {
        Ok(result) => tracing::info!("[STARTUP] loaded {} jobs", result.refreshed),
        Err(e) => {
            tracing::warn!("[STARTUP] could not load jobs ({}), working from the local queue", e);
        }
    }
    tracing::info!("[STARTUP] {} actions pending", manager.pending_count().await);

    let mut sync = SyncService::new(manager.clone(), SyncConfig::from(config.app()));
    sync.start()?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    sync.stop().await;

    let status = manager.status().await;
    tracing::info!(
        "{} actions pending, {} dead-lettered",
        status.pending_operations,
        status.dead_letters
    );
    Ok(())
}
