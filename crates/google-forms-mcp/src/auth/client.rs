//! OAuth2 client for Google's consent screen and token endpoint.
//!
//! Request shapes come from the `oauth2` crate; the requests themselves go out
//! through the shared middleware client so they are logged like API calls.

use std::future::Future;
use std::pin::Pin;

use oauth2::basic::{BasicClient, BasicErrorResponse, BasicTokenResponse};
use oauth2::{
    AsyncHttpClient, AuthType, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet,
    EndpointSet, HttpRequest, HttpResponse, RedirectUrl, RefreshToken, RequestTokenError, Scope,
    TokenResponse as _, TokenUrl,
};
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use url::Url;

use crate::config::Config;
use crate::error::{AuthError, AuthResult};

type GoogleOAuthClient =
    BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Tokens issued by the token endpoint. Every field is optional; callers decide what is required.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenResponse {
    /// The access token, if one was issued and is non-empty.
    #[must_use]
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref().filter(|t| !t.is_empty())
    }

    /// The refresh token, if one was issued and is non-empty.
    #[must_use]
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref().filter(|t| !t.is_empty())
    }
}

impl From<&BasicTokenResponse> for TokenResponse {
    fn from(issued: &BasicTokenResponse) -> Self {
        Self {
            access_token: Some(issued.access_token().secret().clone()),
            refresh_token: issued.refresh_token().map(|t| t.secret().clone()),
            expires_in: issued.expires_in().map(|d| d.as_secs()),
            scope: issued
                .scopes()
                .map(|scopes| scopes.iter().map(|s| s.to_string()).collect::<Vec<_>>().join(" ")),
        }
    }
}

/// Failures of the HTTP round trip to the token endpoint.
#[derive(thiserror::Error, Debug)]
enum TokenTransportError {
    #[error(transparent)]
    Middleware(#[from] reqwest_middleware::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Response(#[from] http::Error),

    #[error("token endpoint returned {status}")]
    Rejected { status: u16, body: String },
}

/// Confidential OAuth2 client. Client credentials travel in the request body.
pub struct OAuthClient {
    http: ClientWithMiddleware,
    oauth: GoogleOAuthClient,
    client_id: String,
    token_url: String,
}

impl OAuthClient {
    /// Build the client from configured endpoints and credentials.
    ///
    /// # Errors
    ///
    /// Returns error if the authorization, token or redirect URL is invalid.
    pub fn new(http: ClientWithMiddleware, config: &Config) -> anyhow::Result<Self> {
        let oauth = BasicClient::new(ClientId::new(config.client_id.clone()))
            .set_client_secret(ClientSecret::new(config.client_secret.clone()))
            .set_auth_uri(AuthUrl::new(config.auth_url.clone())?)
            .set_token_uri(TokenUrl::new(config.token_url.clone())?)
            .set_redirect_uri(RedirectUrl::new(config.callback_url())?)
            .set_auth_type(AuthType::RequestBody);

        Ok(Self {
            http,
            oauth,
            client_id: config.client_id.clone(),
            token_url: config.token_url.clone(),
        })
    }

    /// Consent URL requesting offline access, carrying `state` verbatim.
    #[must_use]
    pub fn authorization_url<S: AsRef<str>>(&self, state: &str, scopes: &[S]) -> Url {
        let state = state.to_owned();
        let (url, _) = self
            .oauth
            .authorize_url(move || CsrfToken::new(state))
            .add_scopes(scopes.iter().map(|s| Scope::new(s.as_ref().to_owned())))
            .add_extra_param("access_type", "offline")
            .url();
        url
    }

    /// Exchange an authorization code for tokens.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::TokenEndpoint`] on a non-2xx answer, or a transport/parse error.
    pub async fn exchange_code(&self, code: &str) -> AuthResult<TokenResponse> {
        let send = TokenHttpClient(&self.http);
        let result = self
            .oauth
            .exchange_code(AuthorizationCode::new(code.to_owned()))
            .request_async(&send)
            .await;
        token_response(result)
    }

    /// Obtain a new access token with a refresh token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::TokenEndpoint`] on a non-2xx answer, or a transport/parse error.
    pub async fn refresh(&self, refresh_token: &str) -> AuthResult<TokenResponse> {
        let send = TokenHttpClient(&self.http);
        let refresh_token = RefreshToken::new(refresh_token.to_owned());
        let result = self.oauth.exchange_refresh_token(&refresh_token).request_async(&send).await;
        token_response(result)
    }
}

impl std::fmt::Debug for OAuthClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthClient")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .finish()
    }
}

/// Token request sender handed to `oauth2`.
///
/// A named client with a boxed `Send` future keeps the callers' futures `Send`;
/// a closure client trips rustc's higher-ranked auto-trait inference.
struct TokenHttpClient<'a>(&'a ClientWithMiddleware);

impl<'c> AsyncHttpClient<'c> for TokenHttpClient<'_> {
    type Error = TokenTransportError;
    type Future = Pin<Box<dyn Future<Output = Result<HttpResponse, TokenTransportError>> + Send + 'c>>;

    fn call(&'c self, request: HttpRequest) -> Self::Future {
        Box::pin(send_token_request(self.0, request))
    }
}

async fn send_token_request(
    http: &ClientWithMiddleware,
    request: HttpRequest,
) -> Result<HttpResponse, TokenTransportError> {
    let (parts, body) = request.into_parts();

    let response = http
        .request(parts.method, parts.uri.to_string())
        .headers(parts.headers)
        .body(body)
        .send()
        .await?;

    let status = response.status();
    let headers = response.headers().clone();
    let body = response.bytes().await?;

    if !status.is_success() {
        return Err(TokenTransportError::Rejected {
            status: status.as_u16(),
            body: String::from_utf8_lossy(&body).into_owned(),
        });
    }

    let mut builder = http::Response::builder().status(status);
    if let Some(target) = builder.headers_mut() {
        *target = headers;
    }
    Ok(builder.body(body.to_vec())?)
}

fn token_response(
    result: Result<BasicTokenResponse, RequestTokenError<TokenTransportError, BasicErrorResponse>>,
) -> AuthResult<TokenResponse> {
    match result {
        Ok(issued) => Ok(TokenResponse::from(&issued)),
        Err(RequestTokenError::Request(err)) => Err(match err {
            TokenTransportError::Rejected { status, body } => {
                AuthError::TokenEndpoint { status, message: body }
            }
            TokenTransportError::Middleware(e) => AuthError::Middleware(e),
            TokenTransportError::Http(e) => AuthError::Http(e),
            TokenTransportError::Response(e) => AuthError::Protocol(e.to_string()),
        }),
        // A 2xx body without `token_type` or without an access token is still
        // an answer; the caller decides whether it is usable.
        Err(RequestTokenError::Parse(_, body)) => Ok(serde_json::from_slice(&body)?),
        Err(RequestTokenError::ServerResponse(err)) => Err(AuthError::Protocol(err.to_string())),
        Err(RequestTokenError::Other(message)) => Err(AuthError::Protocol(message)),
    }
}
