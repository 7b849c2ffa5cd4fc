use std::sync::Arc;

use serde_json::{Value, json};
use storepilot_agents::{ApiExecutor, HttpRequestSpec, Journal, RestExecutor};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

// "ck_test:cs_test"
const EXPECTED_AUTH: &str = "Basic Y2tfdGVzdDpjc190ZXN0";

fn executor(base_url: Option<String>) -> RestExecutor {
    RestExecutor::new(
        base_url,
        "ck_test",
        "cs_test",
        Arc::new(Journal::in_memory(true)),
    )
}

#[tokio::test]
async fn test_placeholder_resolves_against_store_url() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wp-json/wc/v3/orders"))
        .and(header("Authorization", EXPECTED_AUTH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}, {"id": 2}])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let executor = executor(Some(format!("{}/wp-json", mock_server.uri())));
    let outcome = executor
        .execute(&HttpRequestSpec::new("GET", "{base_url}/wc/v3/orders"))
        .await;

    assert_eq!(outcome.status, 200);
    assert_eq!(outcome.body, json!([{"id": 1}, {"id": 2}]));
    assert!(outcome.is_success());
}

#[tokio::test]
async fn test_store_credentials_replace_caller_authorization() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/wc/v3/orders"))
        .and(body_json(json!({"status": "pending"})))
        .respond_with(|req: &Request| {
            let auth = req
                .headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            let custom = req
                .headers
                .get("x-trace")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            ResponseTemplate::new(201).set_body_json(json!({"auth": auth, "trace": custom}))
        })
        .mount(&mock_server)
        .await;

    let mut request = HttpRequestSpec::new("post", format!("{}/wc/v3/orders", mock_server.uri()))
        .with_body(json!({"status": "pending"}));
    request
        .headers
        .insert("authorization".to_string(), json!("Bearer stolen"));
    request.headers.insert("X-Trace".to_string(), json!("abc"));

    let outcome = executor(None).execute(&request).await;

    assert_eq!(outcome.status, 201);
    assert_eq!(outcome.body["auth"], EXPECTED_AUTH);
    assert_eq!(outcome.body["trace"], "abc");
}

#[tokio::test]
async fn test_non_json_body_comes_back_as_string() {
    let mock_server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/wc/v3/products/9"))
        .respond_with(ResponseTemplate::new(500).set_body_string("<html>fatal error</html>"))
        .mount(&mock_server)
        .await;

    let executor = executor(Some(mock_server.uri()));
    let outcome = executor
        .execute(&HttpRequestSpec::new("DELETE", "{base_url}/wc/v3/products/9"))
        .await;

    assert_eq!(outcome.status, 500);
    assert_eq!(outcome.body, Value::String("<html>fatal error</html>".to_string()));
    assert!(!outcome.is_success());
}

#[tokio::test]
async fn test_placeholder_without_store_url_is_reported() {
    let outcome = executor(None)
        .execute(&HttpRequestSpec::new("GET", "{base_url}/wc/v3/orders"))
        .await;

    assert_eq!(outcome.status, 0);
    assert!(
        outcome.body["error"]
            .as_str()
            .unwrap()
            .contains("store base URL is not configured")
    );
}

#[tokio::test]
async fn test_request_and_response_are_traced() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wc/v3/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let journal = Arc::new(Journal::in_memory(true));
    let executor = RestExecutor::new(Some(mock_server.uri()), "ck_test", "cs_test", journal.clone());
    executor
        .execute(&HttpRequestSpec::new("GET", "/wc/v3/orders"))
        .await;

    let traces = journal.traces(10);
    assert_eq!(traces.len(), 2);
    assert!(traces[0].content.starts_with("API Response:"));
    assert!(traces[1].content.starts_with("Executing API request:"));
}
