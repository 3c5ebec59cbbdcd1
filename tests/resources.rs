//! Integration tests for GET /api/resources.
//!
//! A wiremock server stands in for Hourglass; the coursetrack router is
//! driven in-process via `tower::ServiceExt::oneshot`.

use axum::body::Body;
use http::Request;
use tower::ServiceExt;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use coursetrack::config::{ApiKey, Config, UpstreamConfig};
use coursetrack::proxy::{create_router, AppState};

const TEST_KEY: &str = "hg-test-key-0123456789";

/// Build a coursetrack app pointed at the given upstream base URL.
fn app_for_url(base_url: String) -> axum::Router {
    let config = Config {
        upstream: UpstreamConfig {
            base_url,
            api_key: Some(ApiKey::from(TEST_KEY)),
            timeout_secs: 5,
            follow_redirects: true,
        },
        ..Config::default()
    };
    create_router(AppState::new(config).expect("build app state"))
}

fn app_for(upstream: &MockServer) -> axum::Router {
    app_for_url(upstream.uri())
}

/// Parse the response body as JSON and return (status_code, headers, json_value).
async fn send(
    app: axum::Router,
    uri: &str,
) -> (http::StatusCode, http::HeaderMap, serde_json::Value) {
    let request = Request::get(uri).body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body_bytes = axum::body::to_bytes(response.into_body(), 1_048_576)
        .await
        .expect("read body");
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap_or_default();
    (status, headers, json)
}

/// Query string of the only request Hourglass received.
async fn single_upstream_query(upstream: &MockServer) -> Option<String> {
    let received = upstream.received_requests().await.expect("recording enabled");
    assert_eq!(received.len(), 1, "exactly one upstream call expected");
    received[0].url.query().map(|q| q.to_string())
}

#[tokio::test]
async fn forwards_filters_and_key_and_returns_upstream_json() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/resources"))
        .and(query_param("activeOnly", "true"))
        .and(query_param("resourceType", "Course"))
        .and(query_param("serviceOffering", "8"))
        .and(header("x-api-key", TEST_KEY))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            { "id": 101, "name": "Intro to Rust", "resourceType": "Course" },
            { "id": 102, "name": "Advanced Rust", "resourceType": "Course" }
        ])))
        .expect(1)
        .mount(&upstream)
        .await;

    let (status, headers, json) = send(
        app_for(&upstream),
        "/api/resources?activeOnly=true&resourceType=Course&serviceOffering=8",
    )
    .await;

    assert_eq!(status, http::StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 2);
    assert_eq!(json[0]["name"], "Intro to Rust");

    assert!(headers.get("x-coursetrack-request-id").is_some());
    assert!(headers.get("x-coursetrack-latency-ms").is_some());
    assert_eq!(headers.get("x-coursetrack-upstream-status").unwrap(), "200");

    assert_eq!(
        single_upstream_query(&upstream).await.as_deref(),
        Some("activeOnly=true&resourceType=Course&serviceOffering=8")
    );
}

#[tokio::test]
async fn active_only_defaults_to_true() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/resources"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&upstream)
        .await;

    let (status, _, _) = send(app_for(&upstream), "/api/resources").await;

    assert_eq!(status, http::StatusCode::OK);
    assert_eq!(
        single_upstream_query(&upstream).await.as_deref(),
        Some("activeOnly=true")
    );
}

#[tokio::test]
async fn empty_filters_are_not_forwarded() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/resources"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&upstream)
        .await;

    let (status, _, _) = send(
        app_for(&upstream),
        "/api/resources?activeOnly=no&resourceType=&serviceOffering=&page=3",
    )
    .await;

    assert_eq!(status, http::StatusCode::OK);
    assert_eq!(
        single_upstream_query(&upstream).await.as_deref(),
        Some("activeOnly=false")
    );
}

#[tokio::test]
async fn invalid_active_only_is_rejected_without_upstream_call() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&upstream)
        .await;

    let (status, headers, json) =
        send(app_for(&upstream), "/api/resources?activeOnly=sometimes").await;

    assert_eq!(status, http::StatusCode::UNPROCESSABLE_ENTITY);
    assert!(json["detail"].as_str().unwrap().contains("activeOnly"));
    assert!(headers.get("x-coursetrack-request-id").is_some());
    assert!(headers.get("x-coursetrack-upstream-status").is_none());
}

#[tokio::test]
async fn upstream_json_error_is_passed_through() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/resources"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(serde_json::json!({ "message": "Service offering not found" })),
        )
        .mount(&upstream)
        .await;

    let (status, headers, json) =
        send(app_for(&upstream), "/api/resources?serviceOffering=999").await;

    assert_eq!(status, http::StatusCode::NOT_FOUND);
    assert_eq!(json["detail"]["message"], "Service offering not found");
    assert_eq!(headers.get("x-coursetrack-upstream-status").unwrap(), "404");
}

#[tokio::test]
async fn upstream_text_error_is_wrapped() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/resources"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&upstream)
        .await;

    let (status, _, json) = send(app_for(&upstream), "/api/resources").await;

    assert_eq!(status, http::StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["detail"]["detail"], "boom");
}

#[tokio::test]
async fn upstream_unauthorized_is_passed_through() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/resources"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(serde_json::json!({ "error": "invalid key" })),
        )
        .mount(&upstream)
        .await;

    let (status, _, json) = send(app_for(&upstream), "/api/resources").await;

    assert_eq!(status, http::StatusCode::UNAUTHORIZED);
    assert_eq!(json["detail"]["error"], "invalid key");
}

#[tokio::test]
async fn non_json_success_is_internal_error() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/resources"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&upstream)
        .await;

    let (status, _, json) = send(app_for(&upstream), "/api/resources").await;

    assert_eq!(status, http::StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json["detail"]
        .as_str()
        .unwrap()
        .starts_with("Internal server error"));
}

#[tokio::test]
async fn unreachable_upstream_is_503() {
    // Reserve a port, then free it so nothing is listening there
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let (status, headers, json) =
        send(app_for_url(format!("http://{}", addr)), "/api/resources").await;

    assert_eq!(status, http::StatusCode::SERVICE_UNAVAILABLE);
    assert!(json["detail"]
        .as_str()
        .unwrap()
        .starts_with("Service unavailable"));
    assert!(headers.get("x-coursetrack-upstream-status").is_none());
}

#[tokio::test]
async fn served_over_tcp() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/resources"))
        .and(query_param("resourceType", "Course"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{ "id": 7 }])))
        .expect(1)
        .mount(&upstream)
        .await;

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = app_for(&upstream);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let response = reqwest::get(format!(
        "http://{}/api/resources?activeOnly=true&resourceType=Course",
        addr
    ))
    .await
    .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let json: serde_json::Value = response.json().await.unwrap();
    assert_eq!(json[0]["id"], 7);
}

#[tokio::test]
async fn repeated_query_key_uses_last_value() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/resources"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&upstream)
        .await;

    let (status, headers, json) = send(
        app_for(&upstream),
        "/api/resources?activeOnly=true&activeOnly=false&resourceType=Course&resourceType=Workshop",
    )
    .await;

    assert_eq!(status, http::StatusCode::OK, "{}", json);
    assert!(headers.get("x-coursetrack-request-id").is_some());
    assert!(headers.get("x-coursetrack-latency-ms").is_some());
    assert_eq!(
        single_upstream_query(&upstream).await.as_deref(),
        Some("activeOnly=false&resourceType=Workshop")
    );
}

#[tokio::test]
async fn repeated_invalid_value_gets_detail_body_and_request_id() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&upstream)
        .await;

    let (status, headers, json) = send(
        app_for(&upstream),
        "/api/resources?activeOnly=true&activeOnly=sometimes",
    )
    .await;

    assert_eq!(status, http::StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        headers.get(http::header::CONTENT_TYPE).unwrap(),
        "application/json"
    );
    assert!(json["detail"].as_str().unwrap().contains("sometimes"));
    assert!(headers.get("x-coursetrack-request-id").is_some());
}

#[tokio::test]
async fn unknown_route_still_carries_request_id() {
    let upstream = MockServer::start().await;

    let request = Request::get("/api/nope").body(Body::empty()).unwrap();
    let response = app_for(&upstream).oneshot(request).await.unwrap();

    assert_eq!(response.status(), http::StatusCode::NOT_FOUND);
    assert!(response.headers().get("x-coursetrack-request-id").is_some());
    assert!(response.headers().get("x-coursetrack-latency-ms").is_some());
}
