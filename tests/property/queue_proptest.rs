//! Property-based tests for the offline queue: no loss, per-job ordering and
//! idempotent optimistic updates.

use crate::common::*;
use courier_sync::courier_app::offline::JobBoard;
use courier_sync::courier_app::sync::NetworkStatus;
use courier_sync::shared::{CourierAction, DeliveryJob, JobId, JobStatus, PendingAction};
use proptest::prelude::*;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

const STATUSES: [JobStatus; 8] = [
    JobStatus::Available,
    JobStatus::Accepted,
    JobStatus::PickedUp,
    JobStatus::InTransit,
    JobStatus::OutForDelivery,
    JobStatus::Delivered,
    JobStatus::Failed,
    JobStatus::Returned,
];

fn job_for(index: u8) -> &'static str {
    ["J1", "J2", "J3", "J4"][index as usize % 4]
}

fn action_for(choice: u8) -> CourierAction {
    match choice % 7 {
        0 => CourierAction::AcceptJob,
        1 => status_update(JobStatus::PickedUp),
        2 => status_update(JobStatus::InTransit),
        3 => status_update(JobStatus::OutForDelivery),
        4 => proof_with_photos(1, 8),
        5 => failure_report("address not found"),
        _ => CourierAction::RejectJob { reason: None },
    }
}

struct DrainRun {
    queued: Vec<(Uuid, JobId)>,
    attempts: Vec<Attempt>,
    dead_letters: Vec<Uuid>,
    remaining: usize,
}

/// Submit `steps` offline, script the server's answers, reconnect and drain
fn offline_then_drain(steps: Vec<(u8, u8)>, refusals: Vec<bool>) -> DrainRun {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    runtime.block_on(async move {
        let q = queue(NetworkStatus::Offline).await;
        for (job, choice) in steps {
            // Transitions the board refuses never reach the queue
            let _ = q.manager.submit(job_for(job), action_for(choice)).await;
        }
        let queued: Vec<(Uuid, JobId)> = q
            .manager
            .store()
            .list()
            .await
            .into_iter()
            .map(|a| (a.id, a.job_id))
            .collect();

        for refuse in refusals {
            if refuse {
                q.api.respond_status(409, "refused");
            } else {
                q.api.respond(Ok(None));
            }
        }

        q.monitor.report(NetworkStatus::Online);
        let report = q.manager.drain().await;
        DrainRun {
            queued,
            attempts: q.api.attempts(),
            dead_letters: q
                .manager
                .dead_letters()
                .await
                .into_iter()
                .map(|d| d.action.id)
                .collect(),
            remaining: report.remaining,
        }
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn test_every_queued_action_is_confirmed_or_dead_lettered(
        steps in prop::collection::vec((0u8..4, 0u8..7), 0..16),
        refusals in prop::collection::vec(any::<bool>(), 0..16),
    ) {
        let run = offline_then_drain(steps, refusals);
        prop_assert_eq!(run.remaining, 0);

        let confirmed: Vec<Uuid> = run
            .attempts
            .iter()
            .filter(|a| a.succeeded)
            .map(|a| a.action_id)
            .collect();
        let confirmed_set: HashSet<Uuid> = confirmed.iter().copied().collect();
        let dead: HashSet<Uuid> = run.dead_letters.iter().copied().collect();
        prop_assert_eq!(confirmed.len(), confirmed_set.len());

        for (id, _) in &run.queued {
            prop_assert!(
                confirmed_set.contains(id) != dead.contains(id),
                "action {} must be confirmed exactly once or dead-lettered",
                id
            );
        }
        prop_assert_eq!(confirmed_set.len() + dead.len(), run.queued.len());
        prop_assert_eq!(run.attempts.len(), run.queued.len());
    }

    #[test]
    fn test_actions_for_one_job_are_attempted_in_creation_order(
        steps in prop::collection::vec((0u8..4, 0u8..7), 0..16),
        refusals in prop::collection::vec(any::<bool>(), 0..16),
    ) {
        let run = offline_then_drain(steps, refusals);

        let mut queued_by_job: HashMap<JobId, Vec<Uuid>> = HashMap::new();
        for (id, job) in &run.queued {
            queued_by_job.entry(job.clone()).or_default().push(*id);
        }
        let mut attempted_by_job: HashMap<JobId, Vec<Uuid>> = HashMap::new();
        for attempt in &run.attempts {
            attempted_by_job
                .entry(attempt.job_id.clone())
                .or_default()
                .push(attempt.action_id);
        }
        prop_assert_eq!(queued_by_job, attempted_by_job);
    }

    #[test]
    fn test_repeating_a_transition_is_idempotent(from in 0usize..8, to in 0usize..8) {
        let (from, to) = (STATUSES[from], STATUSES[to]);
        if from.can_transition_to(to) {
            prop_assert_eq!(from.advance(to).and_then(|s| s.advance(to)), Ok(to));
        } else {
            prop_assert!(from.advance(to).is_err());
        }
    }

    #[test]
    fn test_repeated_optimistic_update_changes_status_once(target in 2usize..5) {
        let target = STATUSES[target];
        let mut board = JobBoard::new();
        board.load(vec![DeliveryJob::new("J1", JobStatus::Accepted)], &[]);
        let job = JobId::from("J1");

        let first = PendingAction::new("J1", status_update(target));
        let second = PendingAction::new("J1", status_update(target));
        prop_assert!(board.apply_optimistic(&first).is_ok());
        prop_assert!(board.apply_optimistic(&second).is_err());

        let entry = board.get(&job).unwrap();
        prop_assert_eq!(entry.local_status, target);
        prop_assert_eq!(entry.pending.len(), 1);
        prop_assert_eq!(entry.confirmed_status(), JobStatus::Accepted);
    }
}
