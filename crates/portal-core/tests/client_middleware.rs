//! Request pipeline behavior: bearer header, 401 handling, demo probes.

use std::sync::Arc;

use portal_core::api::{ApiClient, ApiError, ProbeResult, RequestBody, DEMO_ENDPOINTS};
use portal_core::auth::{MemoryTokenStore, TokenStore};
use portal_core::models::ApiStatus;
use portal_core::navigation::{History, Navigation, NavigationKind, Route};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer, store: Arc<MemoryTokenStore>, history: Arc<History>) -> ApiClient {
    ApiClient::with_session(&format!("{}/api/v1", server.uri()), store, history)
        .expect("client should build")
}

#[tokio::test]
async fn test_bearer_header_attached_when_token_stored() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/items/"))
        .and(header("authorization", "Bearer tok-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [], "count": 0})))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryTokenStore::with_token("tok-123"));
    let api = client(&server, store, Arc::new(History::new()));

    let items: serde_json::Value = api.get_json("/items/").await.expect("request should succeed");
    assert_eq!(items["count"], 0);
}

#[tokio::test]
async fn test_no_header_without_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/utils/health-check/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .mount(&server)
        .await;

    let api = client(&server, Arc::new(MemoryTokenStore::new()), Arc::new(History::new()));
    assert_eq!(api.health_check().await, ApiStatus::Online);

    let requests = server.received_requests().await.expect("recording enabled");
    assert_eq!(requests.len(), 1);
    assert!(requests[0].headers.get("authorization").is_none());
    assert_eq!(
        requests[0].headers.get("accept").and_then(|v| v.to_str().ok()),
        Some("application/json")
    );
}

#[tokio::test]
async fn test_any_401_logs_out_and_redirects() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/items/"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "Not authenticated"})))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryTokenStore::with_token("tok-123"));
    let history = Arc::new(History::new());
    let api = client(&server, store.clone(), history.clone());

    let err = api
        .request(Method::GET, "/items/", RequestBody::Empty)
        .await
        .unwrap_err();

    // The caller still sees the failure
    assert!(err.is_unauthorized());
    assert_eq!(err.detail().as_deref(), Some("Not authenticated"));
    assert_eq!(store.get().unwrap(), None);
    assert_eq!(
        history.entries(),
        vec![Navigation { route: Route::Login, kind: NavigationKind::Redirect }]
    );
}

#[tokio::test]
async fn test_other_failures_pass_through_untouched() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/items/"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({"detail": "Not enough privileges"})))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryTokenStore::with_token("tok-123"));
    let history = Arc::new(History::new());
    let api = client(&server, store.clone(), history.clone());

    let err = api.get_json::<serde_json::Value>("/items/").await.unwrap_err();

    assert_eq!(err.status(), Some(StatusCode::FORBIDDEN));
    assert_eq!(store.get().unwrap().as_deref(), Some("tok-123"));
    assert!(history.entries().is_empty());
}

#[tokio::test]
async fn test_undecodable_body_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/users/me"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(&server)
        .await;

    let api = client(&server, Arc::new(MemoryTokenStore::with_token("t")), Arc::new(History::new()));

    let err = api.current_user().await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_configure_sends_default_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/utils/health-check/"))
        .and(header("x-client", "portal-test"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut headers = HeaderMap::new();
    headers.insert("x-client", HeaderValue::from_static("portal-test"));
    let api = ApiClient::configure(&format!("{}/api/v1", server.uri()), headers)
        .expect("client should build");

    assert_eq!(api.health_check().await, ApiStatus::Online);
}

#[tokio::test]
async fn test_health_check_offline() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/utils/health-check/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let api = client(&server, Arc::new(MemoryTokenStore::new()), Arc::new(History::new()));
    assert_eq!(api.health_check().await, ApiStatus::Offline);

    let unreachable = ApiClient::configure("http://127.0.0.1:9/api/v1", HeaderMap::new())
        .expect("client should build");
    assert_eq!(unreachable.health_check().await, ApiStatus::Offline);
}

#[tokio::test]
async fn test_probe_demo_endpoints() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/utils/health-check/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(true)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/users/me"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "Not authenticated"})))
        .mount(&server)
        .await;

    let api = client(&server, Arc::new(MemoryTokenStore::new()), Arc::new(History::new()));

    let health = api.probe(&DEMO_ENDPOINTS[0]).await;
    assert_eq!(health, ProbeResult::Success { status: 200, body: json!(true) });

    let me = api.probe(&DEMO_ENDPOINTS[1]).await;
    assert_eq!(
        me,
        ProbeResult::Failure { status: Some(401), error: "Not authenticated".to_string() }
    );

    let login = DEMO_ENDPOINTS.iter().find(|e| e.method == "POST").expect("POST endpoint");
    assert_eq!(api.probe(login).await, ProbeResult::Skipped);
}

#[tokio::test]
async fn test_unsendable_request_is_not_a_network_error() {
    // Parses as a URL, but reqwest refuses to send anything but http(s)
    let api = ApiClient::configure("ftp://localhost/api/v1", HeaderMap::new())
        .expect("client should build");

    let err = api.get_json::<serde_json::Value>("/items/").await.unwrap_err();

    assert!(matches!(err, ApiError::InvalidRequest(_)), "unexpected error: {:?}", err);
    assert_eq!(err.status(), None);
    assert!(err.to_string().starts_with("Invalid request: "));
}
