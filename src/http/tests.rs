//! Tests for the HTTP client module

use super::*;
use crate::error::Error;
use std::collections::BTreeMap;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client() -> HttpClient {
    HttpClient::with_config(HttpClientConfig::default().no_rate_limit()).unwrap()
}

#[test]
fn test_config_default() {
    let config = HttpClientConfig::default();
    assert_eq!(config.timeout, Duration::from_secs(30));
    assert!(config.rate_limit.is_some());
    assert!(config.user_agent.starts_with("fairway-etl/"));
}

#[test]
fn test_config_builder() {
    let config = HttpClientConfig::default()
        .timeout(Duration::from_secs(5))
        .rate_limit(RateLimiterConfig::per_second(2))
        .header("Accept-Language", "ko-KR");

    assert_eq!(config.timeout, Duration::from_secs(5));
    assert_eq!(config.rate_limit, Some(RateLimiterConfig::new(2, 2)));
    assert_eq!(
        config.default_headers.get("Accept-Language").map(String::as_str),
        Some("ko-KR")
    );

    let client = HttpClient::with_config(config).unwrap();
    assert!(client.has_rate_limiter());
}

#[tokio::test]
async fn test_get_text_sends_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/schedule"))
        .and(header("X-Api-Key", "secret"))
        .and(header("Accept-Language", "ko-KR"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<table></table>"))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::with_config(
        HttpClientConfig::default()
            .no_rate_limit()
            .header("Accept-Language", "ko-KR"),
    )
    .unwrap();
    let headers = BTreeMap::from([("X-Api-Key".to_string(), "secret".to_string())]);

    let body = client
        .get_text(&format!("{}/schedule", server.uri()), &headers)
        .await
        .unwrap();
    assert_eq!(body, "<table></table>");
}

#[tokio::test]
async fn test_server_error_is_retryable_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let err = client()
        .get_text(&server.uri(), &BTreeMap::new())
        .await
        .unwrap_err();

    match &err {
        Error::HttpStatus { status, body } => {
            assert_eq!(*status, 503);
            assert_eq!(body, "maintenance");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_not_found_is_not_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client()
        .get_text(&server.uri(), &BTreeMap::new())
        .await
        .unwrap_err();
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_long_error_body_is_truncated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("오류".repeat(400)))
        .mount(&server)
        .await;

    let err = client()
        .get_text(&server.uri(), &BTreeMap::new())
        .await
        .unwrap_err();
    let Error::HttpStatus { body, .. } = err else {
        panic!("expected HttpStatus");
    };
    assert!(body.len() <= 512);
    assert!(body.starts_with("오류"));
}

#[tokio::test]
async fn test_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let client = HttpClient::with_config(
        HttpClientConfig::default()
            .no_rate_limit()
            .timeout(Duration::from_millis(50)),
    )
    .unwrap();

    let err = client
        .get_text(&server.uri(), &BTreeMap::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Timeout { timeout_ms: 50 }));
    assert!(err.is_retryable());
}
