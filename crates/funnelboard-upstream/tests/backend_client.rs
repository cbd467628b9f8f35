//! `BackendClient` against a local `wiremock` server.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use funnelboard_core::series::SeriesKind;
use funnelboard_core::source::{FetchWindow, SeriesSource};
use funnelboard_upstream::{BackendClient, UpstreamError};

fn client(server: &MockServer, retries: u32) -> BackendClient {
    BackendClient::new(&server.uri(), Duration::from_secs(2), retries, Duration::ZERO)
        .expect("failed to build test BackendClient")
}

#[tokio::test]
async fn unbounded_fetch_requests_all_data() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/lead/"))
        .and(query_param("count_only", "true"))
        .and(query_param("all_data", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"date": "2025-01-01", "count": 4},
            {"date": "2025-01-02", "count": 6}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let points = client(&server, 0)
        .fetch_series(SeriesKind::Leads, &FetchWindow::default())
        .await
        .expect("points");
    assert_eq!(points.len(), 2);
    assert!(points.iter().all(|p| p.kind == SeriesKind::Leads));
    assert_eq!(points[1].count, 6);
}

#[tokio::test]
async fn bounded_fetch_requests_periods() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/session/"))
        .and(query_param("from", "2025-01-01"))
        .and(query_param("to", "2025-01-31"))
        .and(query_param("period", "true"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"periods": {"2025-01-03": 12, "2025-01-04": 0}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let window = FetchWindow::new(Some("2025-01-01"), Some("2025-01-31"));
    let points = client(&server, 0)
        .fetch_series(SeriesKind::Sessions, &window)
        .await
        .expect("points");
    assert_eq!(points.len(), 2);
    assert!(points.iter().any(|p| p.date == "2025-01-03" && p.count == 12));
}

#[tokio::test]
async fn unexpected_shape_is_an_empty_series() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/client/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"total": 9})))
        .mount(&server)
        .await;

    let points = client(&server, 0)
        .fetch_series(SeriesKind::Clients, &FetchWindow::default())
        .await
        .expect("points");
    assert!(points.is_empty());
}

#[tokio::test]
async fn non_json_body_is_a_deserialize_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/client/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let result = client(&server, 2)
        .fetch_series(SeriesKind::Clients, &FetchWindow::default())
        .await;
    assert!(matches!(result, Err(UpstreamError::Deserialize { .. })));
}

#[tokio::test]
async fn server_errors_are_retried_then_surface() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/lead/"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let result = client(&server, 2)
        .fetch_series(SeriesKind::Leads, &FetchWindow::default())
        .await;
    assert!(matches!(
        result,
        Err(UpstreamError::UnexpectedStatus { status: 503, .. })
    ));
}

#[tokio::test]
async fn not_found_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/lead/"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let result = client(&server, 2)
        .fetch_series(SeriesKind::Leads, &FetchWindow::default())
        .await;
    assert!(matches!(
        result,
        Err(UpstreamError::UnexpectedStatus { status: 404, .. })
    ));
}

#[tokio::test]
async fn recovers_when_a_retry_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/session/"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/session/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"date": "2025-01-01", "count": 1}])),
        )
        .mount(&server)
        .await;

    let points = client(&server, 2)
        .fetch_series(SeriesKind::Sessions, &FetchWindow::default())
        .await
        .expect("points after retry");
    assert_eq!(points.len(), 1);
}

#[tokio::test]
async fn slow_backend_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/lead/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let client = BackendClient::new(
        &server.uri(),
        Duration::from_millis(50),
        0,
        Duration::ZERO,
    )
    .expect("client");
    let result = client
        .fetch_series(SeriesKind::Leads, &FetchWindow::default())
        .await;
    assert!(matches!(result, Err(UpstreamError::Timeout { .. })));
}

#[tokio::test]
async fn series_source_impl_wraps_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/client/"))
        .respond_with(ResponseTemplate::new(400))
        .mount(&server)
        .await;

    let source: &dyn SeriesSource = &client(&server, 0);
    let err = source
        .fetch(SeriesKind::Clients, &FetchWindow::default())
        .await
        .expect_err("bad request");
    assert!(err.downcast_ref::<UpstreamError>().is_some());
}
