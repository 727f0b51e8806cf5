//! OAuth2 credential broker.
//!
//! Drives the authorization-code flow for Google and hands out authenticated
//! API clients. The broker keeps no per-session fields: all session state
//! round-trips through the [`SessionManager`], so one instance serves every
//! session concurrently.
//!
//! Flow:
//! 1. [`OAuthBroker::build_authorization_url`] binds the session id as `state`
//! 2. the user consents and Google redirects to `/oauth2/callback`
//! 3. [`OAuthBroker::exchange_code_for_tokens`] stores the issued pair
//! 4. [`OAuthBroker::authenticated_client`] rebuilds a client on every call

mod client;

pub use client::{OAuthClient, TokenResponse};

use std::sync::Arc;

use reqwest_middleware::ClientWithMiddleware;
use url::Url;

use crate::config::Config;
use crate::error::{AuthError, AuthResult};
use crate::google::{self, ApiEndpoints, GoogleClient};
use crate::session::{SessionManager, SessionRecord};

/// Tokens carried by an authenticated client handle.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_token: String,
    pub refresh_token: String,
}

impl From<&SessionRecord> for Credentials {
    fn from(record: &SessionRecord) -> Self {
        Self {
            access_token: record.access_token.clone(),
            refresh_token: record.refresh_token.clone(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("has_refresh_token", &!self.refresh_token.is_empty())
            .finish()
    }
}

/// Session-scoped OAuth2 credential broker.
pub struct OAuthBroker {
    sessions: SessionManager,
    oauth: Arc<OAuthClient>,
    http: ClientWithMiddleware,
    endpoints: ApiEndpoints,
    client_id: String,
    redirect_uri: String,
}

impl OAuthBroker {
    /// Create a broker with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built or the authorization URL is invalid.
    pub fn new(config: &Config, sessions: SessionManager) -> anyhow::Result<Self> {
        let http = google::build_http_client(config)?;
        Self::with_http_client(config, sessions, http)
    }

    /// Create a broker sharing an existing HTTP client.
    ///
    /// # Errors
    ///
    /// Returns error if a configured OAuth2 URL is invalid.
    pub fn with_http_client(
        config: &Config,
        sessions: SessionManager,
        http: ClientWithMiddleware,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            sessions,
            oauth: Arc::new(OAuthClient::new(http.clone(), config)?),
            http,
            endpoints: ApiEndpoints::from(config),
            client_id: config.client_id.clone(),
            redirect_uri: config.callback_url(),
        })
    }

    /// Session manager backing this broker.
    #[must_use]
    pub const fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Build the consent URL for a session.
    ///
    /// Requests offline access so Google issues a refresh token, and carries
    /// `session_id` as `state` so the callback can be tied back to the caller.
    /// Touches neither the network nor the session store.
    #[must_use]
    pub fn build_authorization_url<S: AsRef<str>>(&self, session_id: &str, scopes: &[S]) -> Url {
        tracing::info!(session_id = %session_id, "Initiating OAuth2");
        self.oauth.authorization_url(session_id, scopes)
    }

    /// Exchange an authorization code and store the issued tokens for the session.
    ///
    /// Both tokens are replaced; a missing refresh token is stored as an empty
    /// string. On any failure the session store is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MissingAccessToken`] if Google issued no access token,
    /// or the token endpoint / transport error.
    pub async fn exchange_code_for_tokens(&self, code: &str, session_id: &str) -> AuthResult<()> {
        tracing::info!(session_id = %session_id, "Handling OAuth2 callback");

        let response = self.oauth.exchange_code(code).await?;

        let Some(access_token) = response.access_token().map(str::to_owned) else {
            tracing::warn!(session_id = %session_id, "Token response carried no access token");
            return Err(AuthError::MissingAccessToken);
        };
        let refresh_token = response.refresh_token().unwrap_or_default().to_owned();

        let record = match self.sessions.get_session(session_id).await {
            Some(mut existing) => {
                existing.replace_tokens(access_token, refresh_token);
                existing
            }
            None => SessionRecord::new(session_id, access_token, refresh_token),
        };
        let has_refresh_token = record.has_refresh_token();

        self.sessions.upsert_session(record).await;

        tracing::info!(session_id = %session_id, has_refresh_token, "Session updated");
        Ok(())
    }

    /// Build an authenticated Google client from the session's stored tokens.
    ///
    /// A fresh handle is returned on every call. Expired access tokens are not
    /// refreshed here; the handle refreshes lazily when Google rejects a request.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::SessionNotFound`] if the session never completed a callback.
    pub async fn authenticated_client(&self, session_id: &str) -> AuthResult<GoogleClient> {
        let record = self
            .sessions
            .get_session(session_id)
            .await
            .ok_or_else(|| AuthError::session_not_found(session_id))?;

        Ok(GoogleClient::new(
            self.http.clone(),
            Arc::clone(&self.oauth),
            self.endpoints.clone(),
            Credentials::from(&record),
        ))
    }
}

impl std::fmt::Debug for OAuthBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthBroker")
            .field("client_id", &self.client_id)
            .field("redirect_uri", &self.redirect_uri)
            .finish()
    }
}
