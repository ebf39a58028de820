// Drives the whole flow through the HTTP client against an in-process fake of the booking service

use booking_flow_suite::fixtures::{created_booking, default_credentials, updated_booking};
use booking_flow_suite::{
    ApiError, ClientConfig, FlowError, FlowRunner, RestfulBookerClient, Step,
};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "abc123";

fn client_for(server: &MockServer) -> RestfulBookerClient {
    RestfulBookerClient::new(ClientConfig {
        base_url: server.uri(),
        timeout_ms: 5000,
    })
    .unwrap()
}

async fn mount_auth(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/auth"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": TOKEN})))
        .mount(server)
        .await;
}

// Mounts a fake that follows the service's contract for booking 1
async fn mount_booking_service(server: &MockServer) {
    mount_auth(server).await;

    Mock::given(method("POST"))
        .and(path("/booking"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "bookingid": 1,
            "booking": created_booking(),
        })))
        .expect(1)
        .mount(server)
        .await;

    // First read sees the created booking, reads after the delete see nothing
    Mock::given(method("GET"))
        .and(path("/booking/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(created_booking()))
        .up_to_n_times(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/booking/1"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
        .mount(server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/booking/1"))
        .and(header("cookie", "token=abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(updated_booking()))
        .with_priority(1)
        .mount(server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/booking/1"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Forbidden"))
        .mount(server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/booking/1"))
        .and(header("cookie", "token=abc123"))
        .respond_with(ResponseTemplate::new(201).set_body_string("Created"))
        .with_priority(1)
        .mount(server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/booking/1"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Forbidden"))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/booking"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"bookingid": 1}, {"bookingid": 2}])),
        )
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/ping"))
        .respond_with(ResponseTemplate::new(201).set_body_string("Created"))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_flow_against_fake_service() {
    let server = MockServer::start().await;
    mount_booking_service(&server).await;

    let client = client_for(&server);
    let runner = FlowRunner::new(&client, default_credentials());
    let report = runner.run_all().await;

    assert!(report.is_success(), "{:?}", report.failures);
    let mut expected = Step::SERIAL.to_vec();
    expected.extend(Step::SMOKE);
    assert_eq!(report.completed_steps(), expected);

    let stats = runner.stats();
    assert_eq!(stats.requests_sent, 10);
    // The two refusals and the 404 after delete are contract successes for the flow, not the client
    assert_eq!(stats.requests_failed, 3);
}

#[tokio::test]
async fn test_auth_outage_stops_before_any_booking_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/booking"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let failures = FlowRunner::new(&client, default_credentials())
        .run_serial()
        .await
        .into_result()
        .unwrap_err();

    assert_eq!(failures.steps(), vec![Step::Authenticate]);
    assert!(matches!(
        failures.failures[0].error,
        FlowError::Api(ApiError::UnexpectedStatus { actual: 503, .. })
    ));
}

#[tokio::test]
async fn test_auth_outage_still_runs_health_check() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/booking"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ping"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let report = FlowRunner::new(&client, default_credentials())
        .run_all()
        .await;

    assert!(report.completed.is_empty());
    assert_eq!(
        report.failed_steps(),
        vec![Step::Authenticate, Step::ListBookingIds, Step::HealthCheck]
    );
    let failures = report.into_result().unwrap_err();
    assert!(failures.failures.iter().all(|f| matches!(
        f.error,
        FlowError::Api(ApiError::UnexpectedStatus { actual: 503, .. })
    )));
}

#[tokio::test]
async fn test_update_echo_mismatch_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/booking/1"))
        .and(header("cookie", "token=abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(created_booking()))
        .with_priority(1)
        .mount(&server)
        .await;
    mount_booking_service(&server).await;

    let client = client_for(&server);
    let report = FlowRunner::new(&client, default_credentials())
        .run_serial()
        .await;

    assert_eq!(report.failed_step(), Some(Step::UpdateBooking));
    assert_eq!(
        report.completed_steps(),
        vec![
            Step::Authenticate,
            Step::CreateBooking,
            Step::ReadBooking,
            Step::RejectUnauthenticatedUpdate,
        ]
    );
}

#[tokio::test]
async fn test_empty_ping_body_fails_health_check() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/booking"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ping"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let report = FlowRunner::new(&client, default_credentials())
        .run_smoke_checks()
        .await;

    assert_eq!(report.completed_steps(), vec![Step::ListBookingIds]);
    let failures = report.into_result().unwrap_err();
    assert_eq!(failures.steps(), vec![Step::HealthCheck]);
    assert!(matches!(
        failures.failures[0].error,
        FlowError::AssertionFailed {
            step: Step::HealthCheck,
            ..
        }
    ));
}

#[tokio::test]
async fn test_ping_with_200_is_a_contract_violation() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/booking"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ping"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let failures = FlowRunner::new(&client, default_credentials())
        .run_smoke_checks()
        .await
        .into_result()
        .unwrap_err();

    assert_eq!(failures.steps(), vec![Step::HealthCheck]);
    assert!(failures.to_string().contains("expected 201, got 200"));
}
