use crate::common::monitor;
use pulsewatch::modules::monitor::model::Verdict;
use pulsewatch::services::monitor::executor::DEFAULT_USER_AGENT;
use pulsewatch::services::monitor::{HealthCheckExecutor, Prober};
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// =============================================================================
// INTEGRATION TESTS - HTTP HEALTH CHECK
// =============================================================================

async fn probe_status(code: u16) -> pulsewatch::services::monitor::ProbeResult {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(code))
        .mount(&server)
        .await;

    let mut m = monitor(1, 3);
    m.url = format!("{}/health", server.uri());

    HealthCheckExecutor::new(Duration::from_secs(5), DEFAULT_USER_AGENT)
        .unwrap()
        .probe(&m)
        .await
}

#[tokio::test]
async fn test_success_and_redirect_codes_are_up() {
    for code in [200, 204, 304] {
        let result = probe_status(code).await;
        assert_eq!(result.verdict, Verdict::Up, "status {}", code);
        assert_eq!(result.status_code, Some(code));
        assert!(result.error.is_none());
    }
}

#[tokio::test]
async fn test_client_and_server_errors_are_down() {
    for code in [400, 404, 500, 503] {
        let result = probe_status(code).await;
        assert_eq!(result.verdict, Verdict::Down, "status {}", code);
        assert_eq!(result.latency_ms, 0);
        assert_eq!(result.status_code, Some(code));
    }
}

#[tokio::test]
async fn test_timeout_is_down() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let mut m = monitor(2, 3);
    m.url = server.uri();

    let executor = HealthCheckExecutor::new(Duration::from_millis(200), DEFAULT_USER_AGENT).unwrap();
    let result = executor.probe(&m).await;

    assert_eq!(result.verdict, Verdict::Down);
    assert_eq!(result.status_code, None);
    assert_eq!(result.error.as_deref(), Some("Request timeout"));
}

#[tokio::test]
async fn test_unreachable_host_is_down() {
    let mut m = monitor(3, 3);
    m.url = "http://127.0.0.1:9/health".to_string();

    let executor = HealthCheckExecutor::new(Duration::from_secs(2), DEFAULT_USER_AGENT).unwrap();
    let result = executor.probe(&m).await;

    assert_eq!(result.verdict, Verdict::Down);
    assert!(result.error.is_some());
}

#[tokio::test]
async fn test_malformed_url_is_down() {
    let mut m = monitor(4, 3);
    m.url = "not a url".to_string();

    let result = HealthCheckExecutor::default().probe(&m).await;
    assert_eq!(result.verdict, Verdict::Down);
}

#[tokio::test]
async fn test_sends_configured_user_agent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("user-agent", "Pulsewatch-Test/2.0"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut m = monitor(5, 3);
    m.url = server.uri();

    let executor = HealthCheckExecutor::new(Duration::from_secs(5), "Pulsewatch-Test/2.0").unwrap();
    let result = executor.probe(&m).await;

    assert_eq!(result.verdict, Verdict::Up);
}

#[tokio::test]
async fn test_large_body_is_read_to_the_end() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![b'x'; 4 * 1024 * 1024]))
        .mount(&server)
        .await;

    let mut m = monitor(6, 3);
    m.url = server.uri();

    let executor = HealthCheckExecutor::new(Duration::from_secs(5), DEFAULT_USER_AGENT).unwrap();
    let result = executor.probe(&m).await;

    assert_eq!(result.verdict, Verdict::Up);
    assert_eq!(result.status_code, Some(200));
}
