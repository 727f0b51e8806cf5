//! Google Forms and Drive API client.
//!
//! Provides async HTTP client with:
//! - Connection pooling via reqwest
//! - Request logging middleware
//! - Bearer authentication from session credentials
//! - Lazy token refresh when Google answers 401
//!
//! Responses are returned as raw JSON; tools pass them through unchanged.

mod middleware;

pub use middleware::RequestLogging;

use std::sync::Arc;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use serde_json::{Value, json};
use tokio::sync::RwLock;
use url::Url;

use crate::auth::{Credentials, OAuthClient};
use crate::config::{Config, google};
use crate::error::{ClientError, ClientResult};

/// Drive query selecting the user's forms.
const FORMS_QUERY: &str = "mimeType='application/vnd.google-apps.form' and trashed=false";

/// Drive fields returned by `list_forms`.
const FORMS_FIELDS: &str = "files(id, name, createdTime, modifiedTime, owners)";

/// Build the shared HTTP client used for token and API requests.
///
/// # Errors
///
/// Returns error if HTTP client initialization fails.
pub fn build_http_client(config: &Config) -> anyhow::Result<ClientWithMiddleware> {
    let client = Client::builder()
        .timeout(config.request_timeout)
        .connect_timeout(config.connect_timeout)
        .pool_max_idle_per_host(google::MAX_KEEPALIVE)
        .pool_idle_timeout(google::KEEPALIVE_EXPIRY)
        .gzip(true)
        .build()?;

    Ok(ClientBuilder::new(client).with(RequestLogging).build())
}

/// Base URLs of the Google APIs.
#[derive(Debug, Clone)]
pub struct ApiEndpoints {
    pub forms: String,
    pub drive: String,
}

impl From<&Config> for ApiEndpoints {
    fn from(config: &Config) -> Self {
        Self {
            forms: config.forms_api_url.trim_end_matches('/').to_string(),
            drive: config.drive_api_url.trim_end_matches('/').to_string(),
        }
    }
}

/// Authenticated Google API client for a single session.
///
/// Built fresh by the broker for every call. Tokens refreshed by this handle
/// stay in the handle; they are not written back to the session.
pub struct GoogleClient {
    http: ClientWithMiddleware,
    oauth: Arc<OAuthClient>,
    endpoints: ApiEndpoints,
    credentials: RwLock<Credentials>,
}

impl GoogleClient {
    #[must_use]
    pub fn new(
        http: ClientWithMiddleware,
        oauth: Arc<OAuthClient>,
        endpoints: ApiEndpoints,
        credentials: Credentials,
    ) -> Self {
        Self { http, oauth, endpoints, credentials: RwLock::new(credentials) }
    }

    /// Current credentials of this handle.
    pub async fn credentials(&self) -> Credentials {
        self.credentials.read().await.clone()
    }

    /// Create a form from a Forms `Form` resource.
    ///
    /// # Errors
    ///
    /// Returns error on API failure.
    pub async fn create_form(&self, form: &Value) -> ClientResult<Value> {
        let url = api_url(&self.endpoints.forms, &["forms"])?;
        self.send(Method::POST, &url, &[], Some(form)).await
    }

    /// Get a form by ID.
    ///
    /// # Errors
    ///
    /// Returns error on API failure.
    pub async fn get_form(&self, form_id: &str) -> ClientResult<Value> {
        let url = api_url(&self.endpoints.forms, &["forms", form_id])?;
        self.send(Method::GET, &url, &[], None).await
    }

    /// Publish a form and start accepting responses.
    ///
    /// # Errors
    ///
    /// Returns error on API failure.
    pub async fn publish_form(&self, form_id: &str) -> ClientResult<Value> {
        let action = format!("{form_id}:setPublishSettings");
        let url = api_url(&self.endpoints.forms, &["forms", action.as_str()])?;
        let body = json!({
            "publishSettings": {
                "publishState": {
                    "isPublished": true,
                    "isAcceptingResponses": true
                }
            }
        });
        self.send(Method::POST, &url, &[], Some(&body)).await
    }

    /// Get a single form response.
    ///
    /// # Errors
    ///
    /// Returns error on API failure.
    pub async fn get_response(&self, form_id: &str, response_id: &str) -> ClientResult<Value> {
        let url = api_url(&self.endpoints.forms, &["forms", form_id, "responses", response_id])?;
        self.send(Method::GET, &url, &[], None).await
    }

    /// List responses of a form.
    ///
    /// # Errors
    ///
    /// Returns error on API failure.
    pub async fn list_responses(&self, form_id: &str) -> ClientResult<Value> {
        let url = api_url(&self.endpoints.forms, &["forms", form_id, "responses"])?;
        self.send(Method::GET, &url, &[], None).await
    }

    /// List forms in the user's Drive that are not trashed.
    ///
    /// # Errors
    ///
    /// Returns error on API failure.
    pub async fn list_forms(&self) -> ClientResult<Value> {
        let url = api_url(&self.endpoints.drive, &["files"])?;
        let params = [("q", FORMS_QUERY), ("fields", FORMS_FIELDS), ("spaces", "drive")];
        self.send(Method::GET, &url, &params, None).await
    }

    /// Send a request, refreshing the access token once if Google rejects it.
    async fn send(
        &self,
        method: Method,
        url: &Url,
        params: &[(&str, &str)],
        body: Option<&Value>,
    ) -> ClientResult<Value> {
        let access_token = self.credentials.read().await.access_token.clone();

        match self.send_once(method.clone(), url, params, body, &access_token).await {
            Err(err) if err.is_expired_token() => {
                let Some(access_token) = self.refresh_access_token().await? else {
                    return Err(err);
                };
                self.send_once(method, url, params, body, &access_token).await
            }
            other => other,
        }
    }

    async fn send_once(
        &self,
        method: Method,
        url: &Url,
        params: &[(&str, &str)],
        body: Option<&Value>,
        access_token: &str,
    ) -> ClientResult<Value> {
        let mut request =
            self.http.request(method, url.clone()).header(AUTHORIZATION, format!("Bearer {access_token}"));

        if !params.is_empty() {
            request = request.query(params);
        }

        if let Some(body) = body {
            request =
                request.header(CONTENT_TYPE, "application/json").body(serde_json::to_string(body)?);
        }

        let response = request.send().await?;
        let response = handle_response(response).await?;
        let text = response.text().await?;

        if text.trim().is_empty() {
            return Ok(json!({}));
        }

        serde_json::from_str(&text).map_err(ClientError::from)
    }

    /// Returns the new access token, or `None` when no refresh token is held.
    async fn refresh_access_token(&self) -> ClientResult<Option<String>> {
        let refresh_token = self.credentials.read().await.refresh_token.clone();
        if refresh_token.is_empty() {
            return Ok(None);
        }

        let response = self
            .oauth
            .refresh(&refresh_token)
            .await
            .map_err(|e| ClientError::Refresh(e.to_string()))?;

        let Some(access_token) = response.access_token().map(str::to_owned) else {
            return Err(ClientError::Refresh("no access token issued".to_string()));
        };

        let mut credentials = self.credentials.write().await;
        credentials.access_token.clone_from(&access_token);
        if let Some(rotated) = response.refresh_token() {
            credentials.refresh_token = rotated.to_owned();
        }

        tracing::debug!("Refreshed expired access token");
        Ok(Some(access_token))
    }
}

/// Append `segments` to an API base URL, each as exactly one path segment.
///
/// `/`, `?`, `#` and `%` inside a segment are percent-encoded, so a caller
/// supplied ID can never reach a different endpoint.
fn api_url(base: &str, segments: &[&str]) -> ClientResult<Url> {
    let mut url = Url::parse(base).map_err(|e| ClientError::invalid_url(format!("{base}: {e}")))?;
    url.path_segments_mut()
        .map_err(|()| ClientError::invalid_url(base))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Handle API response status codes.
async fn handle_response(response: reqwest::Response) -> ClientResult<reqwest::Response> {
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    match status.as_u16() {
        429 => {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(60);

            Err(ClientError::rate_limited(retry_after))
        }
        404 => {
            let text = response.text().await.unwrap_or_default();
            Err(ClientError::not_found(text))
        }
        400 => {
            let text = response.text().await.unwrap_or_default();
            Err(ClientError::bad_request(text))
        }
        401 | 403 => {
            let text = response.text().await.unwrap_or_default();
            Err(ClientError::unauthorized(status.as_u16(), text))
        }
        500..=599 => {
            let text = response.text().await.unwrap_or_default();
            Err(ClientError::server(status.as_u16(), text))
        }
        _ => {
            let text = response.text().await.unwrap_or_default();
            Err(ClientError::UnexpectedStatus { status: status.as_u16(), message: text })
        }
    }
}

impl std::fmt::Debug for GoogleClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleClient").field("endpoints", &self.endpoints).finish()
    }
}
