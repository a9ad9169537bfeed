//! Queue and job fixtures

use super::mock_api::MockJobsApi;
use courier_sync::courier_app::local_db::{LocalActionStore, MemoryStorage, StorageBackend};
use courier_sync::courier_app::offline::ActionQueueManager;
use courier_sync::courier_app::sync::{ConnectivityMonitor, NetworkStatus, SyncEvent};
use courier_sync::shared::{
    AppConfig, CourierAction, DeliveryJob, DeliveryProof, FailureReport, JobStatus,
    MediaReference,
};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Everything a queue test needs
pub struct TestQueue {
    pub api: Arc<MockJobsApi>,
    pub manager: ActionQueueManager,
    pub monitor: ConnectivityMonitor,
}

/// Jobs in every interesting starting state
pub fn sample_jobs() -> Vec<DeliveryJob> {
    vec![
        DeliveryJob::new("J1", JobStatus::Available),
        DeliveryJob::new("J2", JobStatus::Accepted),
        DeliveryJob::new("J3", JobStatus::OutForDelivery),
        DeliveryJob::new("J4", JobStatus::OutForDelivery),
    ]
}

pub async fn queue_with(
    backend: Arc<dyn StorageBackend>,
    status: NetworkStatus,
    config: &AppConfig,
) -> TestQueue {
    let store = LocalActionStore::open(backend, config.storage_quota_bytes)
        .await
        .expect("store opens");
    let api = Arc::new(MockJobsApi::new());
    let monitor = ConnectivityMonitor::new(status);
    let manager = ActionQueueManager::new(api.clone(), Arc::new(store), monitor.clone(), config);
    manager.load_jobs(sample_jobs()).await;
    TestQueue {
        api,
        manager,
        monitor,
    }
}

/// In-memory queue with default configuration
pub async fn queue(status: NetworkStatus) -> TestQueue {
    queue_with(Arc::new(MemoryStorage::new()), status, &AppConfig::default()).await
}

pub fn status_update(status: JobStatus) -> CourierAction {
    CourierAction::UpdateStatus {
        status,
        reason: None,
    }
}

/// Delivery proof carrying `photos` inline previews of `preview_bytes` each
pub fn proof_with_photos(photos: usize, preview_bytes: usize) -> CourierAction {
    let photos = (0..photos)
        .map(|i| {
            MediaReference::new(format!("file:///photos/{}.jpg", i), "image/jpeg", 250_000)
                .with_preview("p".repeat(preview_bytes))
        })
        .collect();
    CourierAction::SubmitDeliveryProof(DeliveryProof {
        photos,
        otp: Some("4821".into()),
        ..Default::default()
    })
}

pub fn failure_report(reason: &str) -> CourierAction {
    CourierAction::SubmitFailureReport(FailureReport {
        reason: reason.into(),
        ..Default::default()
    })
}

/// Events already delivered to `rx`
pub fn drain_events(rx: &mut broadcast::Receiver<SyncEvent>) -> Vec<SyncEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
