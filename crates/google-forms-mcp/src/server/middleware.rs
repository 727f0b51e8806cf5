//! Session correlation middleware.
//!
//! Copies the `sessionId` query parameter into the request extensions as a
//! [`SessionId`]. Handlers read it with `Option<Extension<SessionId>>` and pass
//! it explicitly to the tools.

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::session::SessionId;

/// Query parameter carrying the session id.
pub const SESSION_QUERY_PARAM: &str = "sessionId";

/// Attach the request's session id, if any. Never rejects a request.
pub async fn correlate_session(mut req: Request, next: Next) -> Response {
    if let Some(session_id) = req.uri().query().and_then(session_id_from_query) {
        tracing::trace!(session_id = %session_id, "Correlated request to session");
        req.extensions_mut().insert(session_id);
    }

    next.run(req).await
}

/// Extract the first non-empty `sessionId` from a raw query string.
#[must_use]
pub fn session_id_from_query(query: &str) -> Option<SessionId> {
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, value)| key == SESSION_QUERY_PARAM && !value.is_empty())
        .map(|(_, value)| SessionId::from(value.into_owned()))
}

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::{Request as HttpRequest, StatusCode};
    use axum::routing::get;
    use axum::{Extension, Router, middleware};
    use tower::ServiceExt;

    use super::*;

    async fn echo_session(session: Option<Extension<SessionId>>) -> String {
        session.map_or_else(|| "none".to_string(), |Extension(id)| id.to_string())
    }

    fn app() -> Router {
        Router::new().route("/", get(echo_session)).layer(middleware::from_fn(correlate_session))
    }

    async fn body_of(uri: &str) -> (StatusCode, String) {
        let request = HttpRequest::builder().uri(uri).body(Body::empty()).unwrap();
        let response = app().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[test]
    fn test_parses_session_id() {
        assert_eq!(session_id_from_query("sessionId=abc").unwrap().as_str(), "abc");
        assert_eq!(session_id_from_query("x=1&sessionId=a%20b").unwrap().as_str(), "a b");
    }

    #[test]
    fn test_ignores_missing_or_empty() {
        assert!(session_id_from_query("other=1").is_none());
        assert!(session_id_from_query("sessionId=").is_none());
        assert!(session_id_from_query("").is_none());
    }

    #[tokio::test]
    async fn test_attaches_session_to_request() {
        let (status, body) = body_of("/?sessionId=sess-1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "sess-1");
    }

    #[tokio::test]
    async fn test_request_without_session_proceeds() {
        let (status, body) = body_of("/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "none");
    }
}
