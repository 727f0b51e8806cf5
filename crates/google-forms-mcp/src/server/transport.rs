//! HTTP transport for the MCP server.
//!
//! Serves JSON-RPC 2.0 over two transports sharing one dispatcher:
//! - Streamable HTTP on `POST /mcp`, session carried in `Mcp-Session-Id`
//! - Legacy HTTP+SSE on `GET /sse` plus `POST /messages?sessionId=...`
//!
//! The OAuth2 redirect lands on the same router. Every route runs behind the
//! session correlation middleware, so handlers see the caller's session as an
//! `Extension<SessionId>`.

use std::borrow::Cow;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Extension, Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware,
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, post},
};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use url::Url;

use super::callback::handle_oauth_callback;
use super::middleware::{SESSION_QUERY_PARAM, correlate_session};
use super::streams::StreamRegistry;
use crate::config::CALLBACK_PATH;
use crate::session::SessionId;
use crate::tools::{McpTool, ToolContext};

/// Header carrying the session id on the streamable HTTP transport.
pub const SESSION_HEADER: &str = "Mcp-Session-Id";

/// Protocol version answered when the client does not name one.
const DEFAULT_PROTOCOL_VERSION: &str = "2024-11-05";

/// JSON-RPC error codes.
mod codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const TOOL_ERROR: i32 = -32000;
}

/// JSON-RPC 2.0 request.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
    #[serde(default)]
    pub id: Option<serde_json::Value>,
}

/// JSON-RPC 2.0 response.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: Cow<'static, str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: Option<serde_json::Value>,
}

/// JSON-RPC 2.0 error.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
}

impl JsonRpcResponse {
    const VERSION: &'static str = "2.0";

    #[must_use]
    pub fn success(id: Option<serde_json::Value>, result: serde_json::Value) -> Self {
        Self { jsonrpc: Cow::Borrowed(Self::VERSION), result: Some(result), error: None, id }
    }

    #[must_use]
    pub fn error(id: Option<serde_json::Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: Cow::Borrowed(Self::VERSION),
            result: None,
            error: Some(JsonRpcError { code, message: message.into() }),
            id,
        }
    }
}

/// MCP tool info for tools/list response.
#[derive(Debug, Serialize)]
pub struct McpToolInfo {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: serde_json::Value,
}

/// Shared state for HTTP handlers.
pub struct HttpState {
    pub tools: Vec<Box<dyn McpTool>>,
    pub ctx: ToolContext,
    pub streams: StreamRegistry,
    /// Public base URL used in SSE endpoint announcements.
    pub base_url: String,
}

/// Create the HTTP router for MCP and the OAuth2 callback.
pub fn create_router(tools: Vec<Box<dyn McpTool>>, ctx: ToolContext, base_url: String) -> Router {
    let state = Arc::new(HttpState {
        tools,
        ctx,
        streams: StreamRegistry::new(),
        base_url: base_url.trim_end_matches('/').to_string(),
    });

    Router::new()
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        // Streamable HTTP transport
        .route("/mcp", post(handle_mcp_post))
        // Legacy HTTP+SSE transport
        .route("/sse", get(handle_sse))
        .route("/messages", post(handle_message_post))
        .route(CALLBACK_PATH, get(handle_oauth_callback))
        .layer(middleware::from_fn(correlate_session))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "google-forms-mcp",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn readiness_check(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ready",
        "service": "google-forms-mcp",
        "version": env!("CARGO_PKG_VERSION"),
        "streams": state.streams.open_count(),
        "tools": state.tools.len()
    }))
}

/// `POST /mcp`
///
/// The session is taken from `?sessionId=`, then the `Mcp-Session-Id`
/// header. `initialize` without either mints a new one.
async fn handle_mcp_post(
    State(state): State<Arc<HttpState>>,
    session: Option<Extension<SessionId>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let req = match parse_request(&body) {
        Ok(req) => req,
        Err(response) => return Json(response).into_response(),
    };

    let mut session = session.map(|Extension(id)| id).or_else(|| {
        headers
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(SessionId::from)
    });
    if session.is_none() && req.method == "initialize" {
        let minted = SessionId::generate();
        tracing::info!(session_id = %minted, "Created new session");
        session = Some(minted);
    }

    tracing::debug!(method = %req.method, session_id = ?session, "Handling MCP POST request");

    let mut response = match dispatch(&state, session.as_ref(), req).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    };

    if let Some(value) = session.and_then(|s| HeaderValue::from_str(s.as_str()).ok()) {
        response.headers_mut().insert(SESSION_HEADER, value);
    }
    response
}

/// `GET /sse`
///
/// Opens the event stream of the legacy transport. The first event names the
/// URL the client must POST its messages to.
async fn handle_sse(
    State(state): State<Arc<HttpState>>,
    session: Option<Extension<SessionId>>,
) -> Response {
    let session = session.map_or_else(SessionId::generate, |Extension(id)| id);
    let endpoint_url = match message_endpoint(&state.base_url, &session) {
        Ok(url) => url,
        Err(e) => {
            tracing::error!(error = %e, base_url = %state.base_url, "Cannot build SSE message endpoint");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Invalid server base URL").into_response();
        }
    };
    let subscription = state.streams.open(&session);

    tracing::info!(session_id = %session, "New SSE connection");

    let endpoint = Event::default().event("endpoint").data(endpoint_url.as_str());
    let live = subscription.filter_map(|message| async move {
        match message {
            Ok(data) => Some(Ok::<_, Infallible>(Event::default().event("message").data(data))),
            Err(e) => {
                tracing::debug!(error = %e, "SSE receiver lagged");
                None
            }
        }
    });

    (
        [("X-Accel-Buffering", "no"), ("Cache-Control", "no-cache, no-store, must-revalidate")],
        Sse::new(stream::once(async move { Ok::<_, Infallible>(endpoint) }).chain(live))
            .keep_alive(KeepAlive::new().interval(Duration::from_secs(15)).text("ping")),
    )
        .into_response()
}

/// `{base_url}/messages?sessionId={session}`, with the session id query-encoded.
fn message_endpoint(base_url: &str, session: &SessionId) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(base_url)?;
    url.path_segments_mut()
        .map_err(|()| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
        .pop_if_empty()
        .push("messages");
    url.query_pairs_mut().clear().append_pair(SESSION_QUERY_PARAM, session.as_str());
    Ok(url)
}

/// `POST /messages?sessionId=...`
///
/// Answers `202 Accepted`; the JSON-RPC response travels on the SSE stream.
async fn handle_message_post(
    State(state): State<Arc<HttpState>>,
    session: Option<Extension<SessionId>>,
    body: Bytes,
) -> Response {
    let Some(Extension(session)) = session else {
        return (StatusCode::BAD_REQUEST, "Missing sessionId").into_response();
    };
    if !state.streams.contains(&session) {
        return (StatusCode::NOT_FOUND, format!("No open stream for session {session}"))
            .into_response();
    }

    let req = match parse_request(&body) {
        Ok(req) => req,
        Err(response) => return (StatusCode::BAD_REQUEST, Json(response)).into_response(),
    };

    if let Some(response) = dispatch(&state, Some(&session), req).await {
        match serde_json::to_string(&response) {
            Ok(message) => {
                if !state.streams.publish(&session, message) {
                    tracing::warn!(session_id = %session, "SSE stream closed before response");
                }
            }
            Err(e) => tracing::error!(error = %e, "Failed to serialize response"),
        }
    }

    StatusCode::ACCEPTED.into_response()
}

fn parse_request(body: &[u8]) -> Result<JsonRpcRequest, JsonRpcResponse> {
    serde_json::from_slice(body).map_err(|e| {
        tracing::debug!(error = %e, "Rejected malformed JSON-RPC message");
        JsonRpcResponse::error(None, codes::PARSE_ERROR, format!("Parse error: {e}"))
    })
}

/// Handle one JSON-RPC message. Returns `None` for notifications.
pub async fn dispatch(
    state: &HttpState,
    session: Option<&SessionId>,
    req: JsonRpcRequest,
) -> Option<JsonRpcResponse> {
    let is_notification = req.id.is_none();

    let response = match req.method.as_str() {
        "initialize" => JsonRpcResponse::success(req.id, handle_initialize(&req.params)),
        "tools/list" => handle_tools_list(req.id, &state.tools),
        "tools/call" => handle_tools_call(req.id, &req.params, state, session).await,
        "ping" => JsonRpcResponse::success(req.id, serde_json::json!({})),
        "notifications/initialized" | "initialized" | "notifications/cancelled" => {
            if is_notification {
                return None;
            }
            JsonRpcResponse::success(req.id, serde_json::json!({}))
        }
        _ => {
            if is_notification {
                return None;
            }
            JsonRpcResponse::error(
                req.id,
                codes::METHOD_NOT_FOUND,
                format!("Method not found: {}", req.method),
            )
        }
    };

    Some(response)
}

fn handle_initialize(params: &serde_json::Value) -> serde_json::Value {
    let protocol_version = params
        .get("protocolVersion")
        .and_then(|v| v.as_str())
        .unwrap_or(DEFAULT_PROTOCOL_VERSION);

    tracing::info!("MCP initialize: protocol version {}", protocol_version);

    serde_json::json!({
        "protocolVersion": protocol_version,
        "capabilities": {
            "tools": {
                "listChanged": false
            }
        },
        "serverInfo": {
            "name": "google-forms-mcp",
            "version": env!("CARGO_PKG_VERSION")
        }
    })
}

fn handle_tools_list(id: Option<serde_json::Value>, tools: &[Box<dyn McpTool>]) -> JsonRpcResponse {
    let tool_list: Vec<McpToolInfo> = tools
        .iter()
        .map(|t| McpToolInfo {
            name: t.name(),
            description: t.description(),
            input_schema: t.input_schema(),
        })
        .collect();

    JsonRpcResponse::success(id, serde_json::json!({ "tools": tool_list }))
}

async fn handle_tools_call(
    id: Option<serde_json::Value>,
    params: &serde_json::Value,
    state: &HttpState,
    session: Option<&SessionId>,
) -> JsonRpcResponse {
    let Some(tool_name) = params.get("name").and_then(|v| v.as_str()) else {
        return JsonRpcResponse::error(id, codes::INVALID_PARAMS, "Missing 'name' parameter");
    };

    let Some(tool) = state.tools.iter().find(|t| t.name() == tool_name) else {
        return JsonRpcResponse::error(
            id,
            codes::INVALID_PARAMS,
            format!("Tool not found: {tool_name}"),
        );
    };

    let arguments = params.get("arguments").cloned().unwrap_or_else(|| serde_json::json!({}));

    tracing::info!(tool = %tool_name, session_id = ?session.map(SessionId::as_str), "Executing tool");

    match tool.execute(&state.ctx, session, arguments).await {
        Ok(text) => JsonRpcResponse::success(
            id,
            serde_json::json!({
                "content": [{
                    "type": "text",
                    "text": text
                }]
            }),
        ),
        Err(e) => {
            tracing::error!(tool = %tool_name, error = %e, "Tool execution failed");
            JsonRpcResponse::error(id, codes::TOOL_ERROR, e.to_user_message())
        }
    }
}
