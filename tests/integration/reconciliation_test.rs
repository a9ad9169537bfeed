//! Refresh reconciliation tests: server list merged into the optimistic board

use crate::common::*;
use assert_matches::assert_matches;
use courier_sync::courier_app::api_client::ApiError;
use courier_sync::courier_app::local_db::DeadLetterReason;
use courier_sync::courier_app::offline::QueueError;
use courier_sync::courier_app::sync::{NetworkStatus, SyncEvent};
use courier_sync::shared::{CourierAction, DeliveryJob, JobId, JobStatus};
use pretty_assertions::assert_eq;

#[tokio::test]
async fn test_terminal_server_state_dead_letters_conflicting_actions() {
    let q = queue(NetworkStatus::Offline).await;
    assert_ok!(q.manager.submit("J2", status_update(JobStatus::PickedUp)).await);
    assert_ok!(q.manager.submit("J2", status_update(JobStatus::InTransit)).await);
    assert_job_status!(q.manager, "J2", local: JobStatus::InTransit, confirmed: JobStatus::Accepted);

    q.api.set_jobs(vec![
        DeliveryJob::new("J1", JobStatus::Available),
        DeliveryJob::new("J2", JobStatus::Failed),
    ]);
    let mut events = q.manager.sync_events().subscribe();
    let result = assert_ok!(q.manager.refresh().await);

    assert!(result.has_conflicts());
    assert_eq!(result.conflicts.len(), 1);
    assert_eq!(result.conflicts[0].job_id, JobId::from("J2"));
    assert_eq!(result.conflicts[0].actions.len(), 2);

    assert_eq!(q.manager.pending_count().await, 0);
    let dead = q.manager.dead_letters().await;
    assert_eq!(dead.len(), 2);
    assert!(dead.iter().all(|d| d.reason
        == DeadLetterReason::Conflict {
            server_status: JobStatus::Failed
        }));

    let view = assert_job_status!(q.manager, "J2", local: JobStatus::Failed, confirmed: JobStatus::Failed);
    assert!(view.conflict.is_some());
    assert!(drain_events(&mut events).contains(&SyncEvent::ConflictDetected {
        job_id: JobId::from("J2"),
        server_status: JobStatus::Failed,
        local_status: JobStatus::InTransit,
    }));
}

#[tokio::test]
async fn test_pending_actions_stay_ahead_of_lagging_server() {
    let q = queue(NetworkStatus::Offline).await;
    assert_ok!(q.manager.submit("J2", status_update(JobStatus::PickedUp)).await);

    q.api.set_jobs(vec![DeliveryJob::new("J2", JobStatus::Accepted)]);
    let result = assert_ok!(q.manager.refresh().await);

    assert!(!result.has_conflicts());
    assert!(result.superseded.is_empty());
    assert_eq!(q.manager.pending_count().await, 1);
    assert_job_status!(q.manager, "J2", local: JobStatus::PickedUp, confirmed: JobStatus::Accepted);
}

#[tokio::test]
async fn test_actions_the_server_already_passed_are_dropped() {
    let q = queue(NetworkStatus::Offline).await;
    assert_ok!(q.manager.submit("J2", status_update(JobStatus::PickedUp)).await);
    let queued = q.manager.store().list().await[0].id;

    q.api.set_jobs(vec![DeliveryJob::new("J2", JobStatus::InTransit)]);
    let result = assert_ok!(q.manager.refresh().await);

    assert_eq!(result.superseded, vec![queued]);
    assert_eq!(q.manager.pending_count().await, 0);
    assert!(q.manager.dead_letters().await.is_empty());
    assert_job_status!(q.manager, "J2", local: JobStatus::InTransit, confirmed: JobStatus::InTransit);
}

#[tokio::test]
async fn test_refresh_adds_new_jobs_and_drops_unlisted_idle_ones() {
    let q = queue(NetworkStatus::Offline).await;
    assert_ok!(q.manager.submit("J1", CourierAction::AcceptJob).await);

    q.api.set_jobs(vec![
        DeliveryJob::new("J3", JobStatus::OutForDelivery),
        DeliveryJob::new("J5", JobStatus::Available),
    ]);
    let result = assert_ok!(q.manager.refresh().await);

    assert_eq!(result.refreshed, 2);
    let mut removed = result.removed.clone();
    removed.sort();
    assert_eq!(removed, vec![JobId::from("J2"), JobId::from("J4")]);

    // J1 is unlisted but still has a queued accept
    assert_job_status!(q.manager, "J1", local: JobStatus::Accepted, confirmed: JobStatus::Available);
    assert_job_status!(q.manager, "J5", local: JobStatus::Available, confirmed: JobStatus::Available);
    assert!(q.manager.job(&JobId::from("J2")).is_none());
}

#[tokio::test]
async fn test_refresh_with_refused_credentials_pauses_sync() {
    let q = queue(NetworkStatus::Online).await;
    q.api.fail_fetch(ApiError::Unauthorized { status: 403 });
    let mut events = q.manager.sync_events().subscribe();

    let err = q.manager.refresh().await.unwrap_err();

    assert_matches!(err, QueueError::Api(ApiError::Unauthorized { status: 403 }));
    assert!(q.manager.awaiting_credentials());
    assert!(drain_events(&mut events).contains(&SyncEvent::AuthRequired { status: 403 }));
    let status = q.manager.status().await;
    assert_eq!(status.last_error.as_deref(), Some("authentication required (403)"));
}

#[tokio::test]
async fn test_delivered_on_server_leaves_nothing_to_replay() {
    let q = queue(NetworkStatus::Offline).await;
    assert_ok!(q.manager.submit("J2", status_update(JobStatus::PickedUp)).await);
    assert_ok!(q.manager.submit("J2", status_update(JobStatus::OutForDelivery)).await);
    assert_ok!(q.manager.submit("J2", proof_with_photos(1, 16)).await);
    let queued: Vec<_> = q.manager.store().list().await.iter().map(|a| a.id).collect();
    assert_eq!(queued.len(), 3);

    q.api.set_jobs(vec![DeliveryJob::new("J2", JobStatus::Delivered)]);
    let result = assert_ok!(q.manager.refresh().await);

    assert!(!result.has_conflicts());
    assert_eq!(result.superseded, queued);
    assert_eq!(q.manager.pending_count().await, 0);
    assert!(q.manager.dead_letters().await.is_empty());

    q.monitor.report(NetworkStatus::Online);
    let report = q.manager.drain().await;

    assert_eq!(report.sent, 0);
    assert!(q.api.attempts().is_empty());
    assert_job_status!(q.manager, "J2", local: JobStatus::Delivered, confirmed: JobStatus::Delivered);
}
