//! HTTP client tests against a wiremock server

use crate::common::*;
use assert_matches::assert_matches;
use courier_sync::courier_app::api_client::{ApiError, FailureClass, HttpJobsApi, JobsApi};
use courier_sync::courier_app::config::Config;
use courier_sync::courier_app::sync::ConnectivityProbe;
use courier_sync::shared::{AppConfig, CourierAction, JobId, JobStatus, PendingAction};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> HttpJobsApi {
    let mut config = Config::with_builder(
        AppConfig::builder()
            .server_url(server.uri())
            .request_timeout(Duration::from_millis(300)),
    )
    .unwrap();
    config.set_token(Some("courier-token".into()));
    HttpJobsApi::new(config).unwrap()
}

#[tokio::test]
async fn test_accept_posts_with_idempotency_key() {
    let server = MockServer::start().await;
    let action = PendingAction::new("J1", CourierAction::AcceptJob);

    Mock::given(method("POST"))
        .and(path("/jobs/J1/accept"))
        .and(header("Idempotency-Key", action.id.to_string().as_str()))
        .and(header("Authorization", "Bearer courier-token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": "J1", "status": "accepted"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let job = assert_ok!(client_for(&server).send_action(&action).await).expect("job echoed");
    assert_eq!(job.id, JobId::from("J1"));
    assert_eq!(job.status, JobStatus::Accepted);
}

#[tokio::test]
async fn test_status_update_patches_status_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/jobs/J2/status"))
        .and(body_json(json!({"status": "picked_up"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let action = PendingAction::new("J2", status_update(JobStatus::PickedUp));
    let job = assert_ok!(client_for(&server).send_action(&action).await);
    assert!(job.is_none());
}

#[tokio::test]
async fn test_return_to_supplier_uses_status_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/jobs/J3/status"))
        .and(body_json(json!({"status": "returned", "reason": "parcel damaged"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let action = PendingAction::new(
        "J3",
        CourierAction::ReturnToSupplier {
            reason: "parcel damaged".into(),
        },
    );
    assert_ok!(client_for(&server).send_action(&action).await);
}

#[tokio::test]
async fn test_delivery_proof_posts_complete_payload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/jobs/J3/complete"))
        .and(body_partial_json(json!({"otp": "4821"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": "J3", "status": "delivered"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let action = PendingAction::new("J3", proof_with_photos(2, 8));
    let job = assert_ok!(client_for(&server).send_action(&action).await);
    assert_eq!(job.map(|j| j.status), Some(JobStatus::Delivered));

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["photos"].as_array().map(|p| p.len()), Some(2));
}

#[tokio::test]
async fn test_failure_report_posts_fail_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/jobs/J4/fail"))
        .and(body_partial_json(json!({"reason": "recipient not home"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let action = PendingAction::new("J4", failure_report("recipient not home"));
    assert_ok!(client_for(&server).send_action(&action).await);
}

#[tokio::test]
async fn test_error_statuses_are_classified() {
    let server = MockServer::start().await;
    let cases = [
        ("J1", 409, FailureClass::Rejected),
        ("J2", 503, FailureClass::Retryable),
        ("J3", 429, FailureClass::Retryable),
        ("J4", 401, FailureClass::Auth),
    ];
    for (job, status, _) in cases {
        Mock::given(method("POST"))
            .and(path(format!("/jobs/{}/accept", job)))
            .respond_with(ResponseTemplate::new(status).set_body_string("nope"))
            .mount(&server)
            .await;
    }

    let client = client_for(&server);
    for (job, status, class) in cases {
        let err = client
            .send_action(&PendingAction::new(job, CourierAction::AcceptJob))
            .await
            .unwrap_err();
        assert_eq!(err.class(), class, "status {}", status);
        assert_eq!(err.status(), Some(status));
    }
}

#[tokio::test]
async fn test_slow_server_times_out_as_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/jobs/J1/accept"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .send_action(&PendingAction::new("J1", CourierAction::AcceptJob))
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::Timeout);
    assert_eq!(err.class(), FailureClass::Retryable);
}

#[tokio::test]
async fn test_fetch_jobs_accepts_wrapped_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/jobs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jobs": [
                {"id": "J1", "status": "available", "pickup_address": "1 Dock Rd"},
                {"id": "J2", "status": "in_transit"}
            ]
        })))
        .mount(&server)
        .await;

    let jobs = assert_ok!(client_for(&server).fetch_jobs().await);
    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[0].pickup_address, "1 Dock Rd");
    assert_eq!(jobs[1].status, JobStatus::InTransit);
}

#[tokio::test]
async fn test_probe_reports_reachability() {
    let server = MockServer::start().await;
    let client = client_for(&server);

    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    assert_matches!(client.probe().await, Err(ApiError::Server { status: 503, .. }));
    assert_ok!(client.probe().await);
}

#[tokio::test]
async fn test_new_token_is_sent_after_set_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/jobs"))
        .and(header("Authorization", "Bearer renewed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.set_token(Some("renewed".into()));
    assert!(assert_ok!(client.fetch_jobs().await).is_empty());
}
