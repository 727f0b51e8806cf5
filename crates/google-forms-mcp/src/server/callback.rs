//! OAuth2 redirect endpoint.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use super::transport::HttpState;
use crate::error::AuthError;

/// Body returned once the session holds fresh tokens.
pub const CALLBACK_SUCCESS: &str = "Success! Go back to your client.";

/// Query parameters Google appends to the redirect URI.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    /// Granted scopes, space separated. Logged only.
    pub scope: Option<String>,
    /// Session id echoed back from the authorization URL.
    pub state: Option<String>,
    /// Set instead of `code` when the user denies consent.
    pub error: Option<String>,
}

/// `GET /oauth2/callback`
///
/// Exchanges the authorization code and stores the tokens under the session
/// named by `state`.
pub async fn handle_oauth_callback(
    State(state): State<Arc<HttpState>>,
    Query(query): Query<CallbackQuery>,
) -> Response {
    if let Some(error) = query.error.as_deref() {
        tracing::warn!(error, "Authorization was not granted");
        return (StatusCode::BAD_REQUEST, format!("Authorization failed: {error}"))
            .into_response();
    }

    let Some(code) = query.code.as_deref().filter(|c| !c.is_empty()) else {
        return (StatusCode::BAD_REQUEST, "Missing code").into_response();
    };
    let Some(session_id) = query.state.as_deref().filter(|s| !s.is_empty()) else {
        return (StatusCode::BAD_REQUEST, "Missing state").into_response();
    };

    tracing::info!(
        session_id,
        scope = query.scope.as_deref().unwrap_or_default(),
        "OAuth2 redirect received"
    );

    match state.ctx.broker.exchange_code_for_tokens(code, session_id).await {
        Ok(()) => (StatusCode::OK, CALLBACK_SUCCESS).into_response(),
        Err(e) => {
            tracing::error!(session_id, error = %e, "Code exchange failed");
            (callback_error_status(&e), e.to_string()).into_response()
        }
    }
}

fn callback_error_status(err: &AuthError) -> StatusCode {
    match err {
        AuthError::MissingAccessToken | AuthError::SessionNotFound { .. } => {
            StatusCode::UNAUTHORIZED
        }
        AuthError::TokenEndpoint { .. }
        | AuthError::Http(_)
        | AuthError::Middleware(_)
        | AuthError::Protocol(_)
        | AuthError::Parse(_) => StatusCode::BAD_GATEWAY,
    }
}
