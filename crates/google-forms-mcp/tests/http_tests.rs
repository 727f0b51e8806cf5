//! End-to-end tests of the HTTP surface using axum's Router.
//!
//! Google is replaced by a wiremock server; requests go through the full
//! middleware stack via `tower::ServiceExt::oneshot`.

use std::time::Duration;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use futures::StreamExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use google_forms_mcp::config::Config;
use google_forms_mcp::server::McpServer;
use google_forms_mcp::server::transport::SESSION_HEADER;
use google_forms_mcp::session::{SessionManager, SessionRecord};

fn build_test_router(mock_server: &MockServer, sessions: SessionManager) -> axum::Router {
    let config = Config::for_testing(&mock_server.uri());
    McpServer::with_sessions(config, sessions).unwrap().into_router()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}

fn rpc(uri: &str, message: &Value) -> Request<Body> {
    Request::post(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(message.to_string()))
        .unwrap()
}

fn tool_call(name: &str, arguments: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "tools/call",
        "params": {"name": name, "arguments": arguments}
    })
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_and_ready() {
    let mock_server = MockServer::start().await;
    let app = build_test_router(&mock_server, SessionManager::in_memory());

    let response =
        app.clone().oneshot(Request::get("/health").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");

    let response = app.oneshot(Request::get("/ready").body(Body::empty()).unwrap()).await.unwrap();
    let ready = body_json(response).await;
    assert_eq!(ready["tools"], 8);
    assert_eq!(ready["streams"], 0);
}

// =============================================================================
// OAuth2 callback
// =============================================================================

#[tokio::test]
async fn test_callback_then_tool_call() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "AT1",
            "refresh_token": "RT1"
        })))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/forms/f1"))
        .and(header("authorization", "Bearer AT1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"formId": "f1", "info": {"title": "T"}})),
        )
        .mount(&mock_server)
        .await;
    let app = build_test_router(&mock_server, SessionManager::in_memory());

    let response = app
        .clone()
        .oneshot(
            Request::get("/oauth2/callback?code=c1&scope=forms.body%20drive.file&state=sess-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "Success! Go back to your client.");

    let response = app
        .oneshot(rpc("/mcp?sessionId=sess-1", &tool_call("getForm", json!({"formId": "f1"}))))
        .await
        .unwrap();
    let reply = body_json(response).await;
    let text = reply["result"]["content"][0]["text"].as_str().unwrap();
    assert!(text.contains("\"formId\":\"f1\""));
}

#[tokio::test]
async fn test_callback_missing_params() {
    let mock_server = MockServer::start().await;
    let app = build_test_router(&mock_server, SessionManager::in_memory());

    for uri in ["/oauth2/callback?state=s", "/oauth2/callback?code=c", "/oauth2/callback"] {
        let response =
            app.clone().oneshot(Request::get(uri).body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
    }
}

#[tokio::test]
async fn test_callback_without_access_token() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token_type": "Bearer"})))
        .mount(&mock_server)
        .await;
    let sessions = SessionManager::in_memory();
    let app = build_test_router(&mock_server, sessions.clone());

    let response = app
        .oneshot(Request::get("/oauth2/callback?code=c&state=s").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(body_text(response).await.contains("Access token not found"));
    assert!(sessions.get_session("s").await.is_none());
}

#[tokio::test]
async fn test_callback_token_endpoint_failure() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;
    let app = build_test_router(&mock_server, SessionManager::in_memory());

    let response = app
        .oneshot(Request::get("/oauth2/callback?code=c&state=s").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_callback_consent_denied() {
    let mock_server = MockServer::start().await;
    let app = build_test_router(&mock_server, SessionManager::in_memory());

    let response = app
        .oneshot(
            Request::get("/oauth2/callback?error=access_denied&state=s")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(response).await.contains("access_denied"));
}

// =============================================================================
// Streamable HTTP
// =============================================================================

#[tokio::test]
async fn test_initialize_mints_session() {
    let mock_server = MockServer::start().await;
    let app = build_test_router(&mock_server, SessionManager::in_memory());

    let response = app
        .oneshot(rpc(
            "/mcp",
            &json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {"protocolVersion": "2025-03-26"}}),
        ))
        .await
        .unwrap();

    let session = response.headers().get(SESSION_HEADER).unwrap().to_str().unwrap().to_string();
    assert!(uuid::Uuid::parse_str(&session).is_ok());

    let reply = body_json(response).await;
    assert_eq!(reply["result"]["protocolVersion"], "2025-03-26");
    assert_eq!(reply["result"]["serverInfo"]["name"], "google-forms-mcp");
}

#[tokio::test]
async fn test_initialize_keeps_query_session() {
    let mock_server = MockServer::start().await;
    let app = build_test_router(&mock_server, SessionManager::in_memory());

    let response = app
        .oneshot(rpc("/mcp?sessionId=mine", &json!({"jsonrpc": "2.0", "id": 1, "method": "initialize"})))
        .await
        .unwrap();
    assert_eq!(response.headers().get(SESSION_HEADER).unwrap(), "mine");
}

#[tokio::test]
async fn test_tools_list() {
    let mock_server = MockServer::start().await;
    let app = build_test_router(&mock_server, SessionManager::in_memory());

    let response =
        app.oneshot(rpc("/mcp", &json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}))).await.unwrap();
    let reply = body_json(response).await;

    let names: Vec<&str> = reply["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"startOauth2"));
    assert!(names.contains(&"listMyForms"));
    assert_eq!(names.len(), 8);
}

#[tokio::test]
async fn test_start_oauth2_uses_query_session() {
    let mock_server = MockServer::start().await;
    let app = build_test_router(&mock_server, SessionManager::in_memory());

    let response = app.oneshot(rpc("/mcp?sessionId=abc", &tool_call("startOauth2", json!({})))).await.unwrap();
    let reply = body_json(response).await;

    let text = reply["result"]["content"][0]["text"].as_str().unwrap();
    assert!(text.contains("state=abc"));
}

#[tokio::test]
async fn test_start_oauth2_uses_session_header() {
    let mock_server = MockServer::start().await;
    let app = build_test_router(&mock_server, SessionManager::in_memory());

    let request = Request::post("/mcp")
        .header("Content-Type", "application/json")
        .header(SESSION_HEADER, "from-header")
        .body(Body::from(tool_call("startOauth2", json!({})).to_string()))
        .unwrap();
    let reply = body_json(app.oneshot(request).await.unwrap()).await;

    let text = reply["result"]["content"][0]["text"].as_str().unwrap();
    assert!(text.contains("state=from-header"));
}

#[tokio::test]
async fn test_tool_error_maps_to_jsonrpc_error() {
    let mock_server = MockServer::start().await;
    let sessions = SessionManager::in_memory();
    sessions.upsert_session(SessionRecord::new("s", "AT", "RT")).await;
    let app = build_test_router(&mock_server, sessions);

    let response = app
        .clone()
        .oneshot(rpc("/mcp?sessionId=s", &tool_call("deleteForm", json!({"formId": "f1"}))))
        .await
        .unwrap();
    let reply = body_json(response).await;
    assert_eq!(reply["error"]["code"], -32000);
    assert!(reply["error"]["message"].as_str().unwrap().contains("deleting forms"));

    let response = app
        .oneshot(rpc("/mcp?sessionId=other", &tool_call("listMyForms", json!({}))))
        .await
        .unwrap();
    let reply = body_json(response).await;
    assert_eq!(reply["error"]["code"], -32000);
    assert!(reply["error"]["message"].as_str().unwrap().contains("Session other not found"));
}

#[tokio::test]
async fn test_unknown_tool_and_method() {
    let mock_server = MockServer::start().await;
    let app = build_test_router(&mock_server, SessionManager::in_memory());

    let reply = body_json(app.clone().oneshot(rpc("/mcp", &tool_call("nope", json!({})))).await.unwrap()).await;
    assert_eq!(reply["error"]["code"], -32602);

    let reply = body_json(
        app.oneshot(rpc("/mcp", &json!({"jsonrpc": "2.0", "id": 3, "method": "resources/list"})))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(reply["error"]["code"], -32601);
    assert_eq!(reply["id"], 3);
}

#[tokio::test]
async fn test_parse_error() {
    let mock_server = MockServer::start().await;
    let app = build_test_router(&mock_server, SessionManager::in_memory());

    let request = Request::post("/mcp").body(Body::from("{not json")).unwrap();
    let reply = body_json(app.oneshot(request).await.unwrap()).await;
    assert_eq!(reply["error"]["code"], -32700);
}

#[tokio::test]
async fn test_notification_is_accepted() {
    let mock_server = MockServer::start().await;
    let app = build_test_router(&mock_server, SessionManager::in_memory());

    let response = app
        .oneshot(rpc("/mcp", &json!({"jsonrpc": "2.0", "method": "notifications/initialized"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
}

// =============================================================================
// Legacy SSE
// =============================================================================

async fn read_until<S>(stream: &mut S, needle: &str) -> String
where
    S: futures::Stream<Item = Result<axum::body::Bytes, axum::Error>> + Unpin,
{
    let mut seen = String::new();
    tokio::time::timeout(Duration::from_secs(5), async {
        while !seen.contains(needle) {
            let chunk = stream.next().await.unwrap().unwrap();
            seen.push_str(&String::from_utf8_lossy(&chunk));
        }
    })
    .await
    .unwrap();
    seen
}

#[tokio::test]
async fn test_sse_announces_endpoint_and_relays_responses() {
    let mock_server = MockServer::start().await;
    let app = build_test_router(&mock_server, SessionManager::in_memory());

    let response = app
        .clone()
        .oneshot(Request::get("/sse?sessionId=s1").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let mut events = response.into_body().into_data_stream();

    let seen = read_until(&mut events, "sessionId=s1").await;
    assert!(seen.contains("event: endpoint"));
    assert!(seen.contains("http://localhost:3000/messages?sessionId=s1"));

    let response = app
        .oneshot(rpc("/messages?sessionId=s1", &json!({"jsonrpc": "2.0", "id": 9, "method": "ping"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let seen = read_until(&mut events, "\"id\":9").await;
    assert!(seen.contains("event: message"));
}

#[tokio::test]
async fn test_sse_endpoint_round_trips_reserved_characters() {
    let mock_server = MockServer::start().await;
    let app = build_test_router(&mock_server, SessionManager::in_memory());

    let response = app
        .clone()
        .oneshot(Request::get("/sse?sessionId=a%26b%20c").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let mut events = response.into_body().into_data_stream();

    let seen = read_until(&mut events, "\n\n").await;
    let endpoint = seen
        .lines()
        .find_map(|line| line.strip_prefix("data: "))
        .and_then(|data| url::Url::parse(data).ok())
        .unwrap();
    let sessions: Vec<String> = endpoint
        .query_pairs()
        .filter(|(k, _)| k == "sessionId")
        .map(|(_, v)| v.into_owned())
        .collect();
    assert_eq!(sessions, vec!["a&b c".to_string()]);

    let uri = format!("{}?{}", endpoint.path(), endpoint.query().unwrap());
    let response = app
        .oneshot(rpc(&uri, &json!({"jsonrpc": "2.0", "id": 9, "method": "ping"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    read_until(&mut events, "\"id\":9").await;
}

#[tokio::test]
async fn test_disconnected_sse_stream_is_released() {
    let mock_server = MockServer::start().await;
    let app = build_test_router(&mock_server, SessionManager::in_memory());

    let response = app
        .clone()
        .oneshot(Request::get("/sse?sessionId=s2").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let mut events = response.into_body().into_data_stream();
    read_until(&mut events, "sessionId=s2").await;

    let response =
        app.clone().oneshot(Request::get("/ready").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(body_json(response).await["streams"], 1);

    drop(events);

    let ping = json!({"jsonrpc": "2.0", "id": 1, "method": "ping"});
    let response = app.clone().oneshot(rpc("/messages?sessionId=s2", &ping)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.oneshot(Request::get("/ready").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(body_json(response).await["streams"], 0);
}

#[tokio::test]
async fn test_messages_require_open_stream() {
    let mock_server = MockServer::start().await;
    let app = build_test_router(&mock_server, SessionManager::in_memory());

    let ping = json!({"jsonrpc": "2.0", "id": 1, "method": "ping"});

    let response = app.clone().oneshot(rpc("/messages?sessionId=ghost", &ping)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.oneshot(rpc("/messages", &ping)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
