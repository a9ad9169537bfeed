//! Scripted jobs API for integration tests
//!
//! Answers `send_action` from a queue of canned responses (unscripted calls
//! succeed with no body) and records every attempt, so tests can assert on
//! replay order and on how often each action reached the "server".

use async_trait::async_trait;
use courier_sync::courier_app::api_client::{ApiError, JobsApi};
use courier_sync::courier_app::sync::{ConnectivityMonitor, ConnectivityProbe, NetworkStatus};
use courier_sync::shared::{ActionKind, DeliveryJob, JobId, PendingAction};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

/// One `send_action` call as the mock saw it
#[derive(Debug, Clone, PartialEq)]
pub struct Attempt {
    pub action_id: Uuid,
    pub job_id: JobId,
    pub kind: ActionKind,
    pub succeeded: bool,
}

#[derive(Debug)]
pub struct MockJobsApi {
    responses: Mutex<VecDeque<Result<Option<DeliveryJob>, ApiError>>>,
    attempts: Mutex<Vec<Attempt>>,
    jobs: Mutex<Vec<DeliveryJob>>,
    fetch_error: Mutex<Option<ApiError>>,
    tokens: Mutex<Vec<Option<String>>>,
    /// Call index at which the connection drops, and the monitor to notify
    drop_connection: Mutex<Option<(usize, ConnectivityMonitor)>>,
    latency: Mutex<Option<Duration>>,
    healthy: AtomicBool,
}

impl Default for MockJobsApi {
    fn default() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            attempts: Mutex::new(Vec::new()),
            jobs: Mutex::new(Vec::new()),
            fetch_error: Mutex::new(None),
            tokens: Mutex::new(Vec::new()),
            drop_connection: Mutex::new(None),
            latency: Mutex::new(None),
            healthy: AtomicBool::new(true),
        }
    }
}

impl MockJobsApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the response for the next unanswered `send_action`
    pub fn respond(&self, response: Result<Option<DeliveryJob>, ApiError>) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn respond_status(&self, status: u16, message: &str) {
        self.respond(Err(ApiError::from_status(status, message)));
    }

    /// Job list served by `fetch_jobs`
    pub fn set_jobs(&self, jobs: Vec<DeliveryJob>) {
        *self.jobs.lock().unwrap() = jobs;
    }

    pub fn fail_fetch(&self, error: ApiError) {
        *self.fetch_error.lock().unwrap() = Some(error);
    }

    /// On the `call`-th send (0-based) report the network as gone and fail
    /// the request with a connection error
    pub fn drop_connection_on_call(&self, call: usize, monitor: ConnectivityMonitor) {
        *self.drop_connection.lock().unwrap() = Some((call, monitor));
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = Some(latency);
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    pub fn attempts(&self) -> Vec<Attempt> {
        self.attempts.lock().unwrap().clone()
    }

    /// Ids the server accepted, in order
    pub fn confirmed_ids(&self) -> Vec<Uuid> {
        self.attempts()
            .into_iter()
            .filter(|a| a.succeeded)
            .map(|a| a.action_id)
            .collect()
    }

    pub fn attempted_kinds(&self) -> Vec<(JobId, ActionKind)> {
        self.attempts()
            .into_iter()
            .map(|a| (a.job_id, a.kind))
            .collect()
    }

    pub fn tokens(&self) -> Vec<Option<String>> {
        self.tokens.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobsApi for MockJobsApi {
    async fn send_action(&self, action: &PendingAction) -> Result<Option<DeliveryJob>, ApiError> {
        let latency = *self.latency.lock().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let call = self.attempts.lock().unwrap().len();
        let dropped = {
            let drop_connection = self.drop_connection.lock().unwrap();
            match drop_connection.as_ref() {
                Some((at, monitor)) if *at == call => Some(monitor.clone()),
                _ => None,
            }
        };

        let response = match dropped {
            Some(monitor) => {
                monitor.report(NetworkStatus::Offline);
                Err(ApiError::Network("connection reset".into()))
            }
            None => self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(None)),
        };

        self.attempts.lock().unwrap().push(Attempt {
            action_id: action.id,
            job_id: action.job_id.clone(),
            kind: action.kind(),
            succeeded: response.is_ok(),
        });
        response
    }

    async fn fetch_jobs(&self) -> Result<Vec<DeliveryJob>, ApiError> {
        if let Some(error) = self.fetch_error.lock().unwrap().clone() {
            return Err(error);
        }
        Ok(self.jobs.lock().unwrap().clone())
    }

    fn set_token(&self, token: Option<String>) {
        self.tokens.lock().unwrap().push(token);
    }
}

#[async_trait]
impl ConnectivityProbe for MockJobsApi {
    async fn probe(&self) -> Result<(), ApiError> {
        if self.healthy.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ApiError::Timeout)
        }
    }
}
