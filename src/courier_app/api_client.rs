/**
 * Courier Jobs API Client
 *
 * HTTP client for the backend job endpoints used by the offline queue.
 * Every courier action maps to exactly one request; responses are classified
 * so the queue knows whether to retry, wait for credentials or give up.
 *
 * # Endpoints
 *
 * - `POST  /jobs/{id}/accept`
 * - `POST  /jobs/{id}/reject`
 * - `PATCH /jobs/{id}/status`
 * - `POST  /jobs/{id}/complete`
 * - `POST  /jobs/{id}/fail`
 * - `GET   /jobs`
 */

use crate::courier_app::config::Config;
use crate::courier_app::sync::network_monitor::ConnectivityProbe;
use crate::shared::{CourierAction, DeliveryJob, JobStatus, MediaReference, PendingAction};
use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use thiserror::Error;

/// How the queue should react to a failed request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Offline, timeout or server trouble; try again later
    Retryable,
    /// Credential missing or refused; keep the action and re-authenticate
    Auth,
    /// The server refused the action itself; never retried
    Rejected,
}

/// Errors returned by the jobs API
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ApiError {
    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("authentication required ({status})")]
    Unauthorized { status: u16 },

    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("request rejected {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Classify a non-success HTTP status
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => ApiError::Unauthorized { status },
            408 | 429 => ApiError::Server { status, message },
            s if s >= 500 => ApiError::Server { status, message },
            _ => ApiError::Rejected { status, message },
        }
    }

    pub fn class(&self) -> FailureClass {
        match self {
            ApiError::Timeout | ApiError::Network(_) | ApiError::Server { .. } => {
                FailureClass::Retryable
            }
            ApiError::Unauthorized { .. } => FailureClass::Auth,
            ApiError::Rejected { .. } | ApiError::Decode(_) => FailureClass::Rejected,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized { status }
            | ApiError::Server { status, .. }
            | ApiError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else if let Some(status) = err.status() {
            ApiError::from_status(status.as_u16(), err.to_string())
        } else if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

/// Backend operations the offline queue depends on
#[async_trait]
pub trait JobsApi: Send + Sync {
    /// Replay one courier action. Returns the updated job when the backend
    /// sends one back.
    async fn send_action(&self, action: &PendingAction) -> Result<Option<DeliveryJob>, ApiError>;

    /// Fetch the courier's current job list
    async fn fetch_jobs(&self) -> Result<Vec<DeliveryJob>, ApiError>;

    /// Install a fresh credential after re-authentication
    fn set_token(&self, token: Option<String>);
}

#[derive(Debug, Serialize)]
struct StatusBody<'a> {
    status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct RejectBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct PhotoBody<'a> {
    id: String,
    uri: &'a str,
    content_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a str>,
}

impl<'a> From<&'a MediaReference> for PhotoBody<'a> {
    fn from(photo: &'a MediaReference) -> Self {
        Self {
            id: photo.id.to_string(),
            uri: &photo.local_uri,
            content_type: &photo.content_type,
            data: photo.preview.as_deref(),
        }
    }
}

#[derive(Debug, Serialize)]
struct CompleteBody<'a> {
    photos: Vec<PhotoBody<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    otp: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    recipient_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    notes: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct FailBody<'a> {
    reason: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    notes: Option<&'a str>,
    photos: Vec<PhotoBody<'a>>,
}

/// The job list endpoint answers either a bare array or `{ "jobs": [...] }`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JobsResponse {
    List(Vec<DeliveryJob>),
    Wrapped { jobs: Vec<DeliveryJob> },
}

/// `reqwest`-backed implementation of [`JobsApi`]
#[derive(Debug)]
pub struct HttpJobsApi {
    config: RwLock<Config>,
    client: Client,
}

impl HttpJobsApi {
    pub fn new(config: Config) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(config.app().request_timeout())
            .build()
            .map_err(|e| ApiError::Network(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            config: RwLock::new(config),
            client,
        })
    }

    fn config(&self) -> Config {
        match self.config.read() {
            Ok(config) => config.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let config = self.config();
        let mut request = self.client.request(method, config.api_url(path));
        if let Some(token) = config.get_token() {
            request = request.header("Authorization", format!("Bearer {}", token));
        }
        request
    }

    fn build_action_request(&self, pending: &PendingAction) -> reqwest::RequestBuilder {
        let job = pending.job_id.as_str();
        let request = match &pending.action {
            CourierAction::AcceptJob => {
                self.request(Method::POST, &format!("/jobs/{}/accept", job))
            }
            CourierAction::RejectJob { reason } => self
                .request(Method::POST, &format!("/jobs/{}/reject", job))
                .json(&RejectBody {
                    reason: reason.as_deref(),
                }),
            CourierAction::UpdateStatus { status, reason } => self
                .request(Method::PATCH, &format!("/jobs/{}/status", job))
                .json(&StatusBody {
                    status: *status,
                    reason: reason.as_deref(),
                }),
            CourierAction::SubmitDeliveryProof(proof) => self
                .request(Method::POST, &format!("/jobs/{}/complete", job))
                .json(&CompleteBody {
                    photos: proof.photos.iter().map(PhotoBody::from).collect(),
                    otp: proof.otp.as_deref(),
                    recipient_name: proof.recipient_name.as_deref(),
                    notes: proof.notes.as_deref(),
                }),
            CourierAction::SubmitFailureReport(report) => self
                .request(Method::POST, &format!("/jobs/{}/fail", job))
                .json(&FailBody {
                    reason: &report.reason,
                    notes: report.notes.as_deref(),
                    photos: report.photos.iter().map(PhotoBody::from).collect(),
                }),
            CourierAction::ReturnToSupplier { reason } => self
                .request(Method::PATCH, &format!("/jobs/{}/status", job))
                .json(&StatusBody {
                    status: JobStatus::Returned,
                    reason: Some(reason.as_str()),
                }),
        };
        request.header("Idempotency-Key", pending.id.to_string())
    }

    async fn error_for(response: reqwest::Response) -> ApiError {
        let status = response.status();
        let message = response
            .text()
            .await
            .ok()
            .filter(|body| !body.is_empty())
            .unwrap_or_else(|| status.to_string());
        ApiError::from_status(status.as_u16(), message)
    }
}

#[async_trait]
impl JobsApi for HttpJobsApi {
    async fn send_action(&self, action: &PendingAction) -> Result<Option<DeliveryJob>, ApiError> {
        let response = self.build_action_request(action).send().await?;

        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let body = response.bytes().await?;
        if body.is_empty() {
            return Ok(None);
        }
        match serde_json::from_slice::<DeliveryJob>(&body) {
            Ok(job) => Ok(Some(job)),
            Err(e) => {
                tracing::debug!(
                    "[Api] {} for job {} returned a non-job body: {}",
                    action.kind(),
                    action.job_id,
                    e
                );
                Ok(None)
            }
        }
    }

    async fn fetch_jobs(&self) -> Result<Vec<DeliveryJob>, ApiError> {
        let response = self.request(Method::GET, "/jobs").send().await?;
        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }
        let jobs = response
            .json::<JobsResponse>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok(match jobs {
            JobsResponse::List(jobs) | JobsResponse::Wrapped { jobs } => jobs,
        })
    }

    fn set_token(&self, token: Option<String>) {
        match self.config.write() {
            Ok(mut config) => config.set_token(token),
            Err(poisoned) => poisoned.into_inner().set_token(token),
        }
    }
}

#[async_trait]
impl ConnectivityProbe for HttpJobsApi {
    async fn probe(&self) -> Result<(), ApiError> {
        let path = self.config().app().probe_path.clone();
        let response = self.request(Method::GET, &path).send().await?;
        // Any answer from the server proves reachability, except a gateway
        // telling us the backend is down.
        if response.status().is_server_error() {
            return Err(Self::error_for(response).await);
        }
        Ok(())
    }
}
