//! Configuration for the Google Forms MCP server.

use std::time::Duration;

/// Google endpoint constants.
pub mod google {
    use std::time::Duration;

    /// OAuth2 authorization endpoint.
    pub const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

    /// OAuth2 token endpoint.
    pub const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

    /// Forms API endpoint.
    pub const FORMS_API: &str = "https://forms.googleapis.com/v1";

    /// Drive API endpoint.
    pub const DRIVE_API: &str = "https://www.googleapis.com/drive/v3";

    /// Request timeout.
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    /// Connection timeout.
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Maximum keepalive connections.
    pub const MAX_KEEPALIVE: usize = 10;

    /// Keepalive expiry.
    pub const KEEPALIVE_EXPIRY: Duration = Duration::from_secs(30);
}

/// OAuth2 scopes requested by the server.
pub mod scopes {
    /// Create and edit forms.
    pub const FORMS_BODY: &str = "https://www.googleapis.com/auth/forms.body";

    /// Access Drive files created or opened by the app.
    pub const DRIVE_FILE: &str = "https://www.googleapis.com/auth/drive.file";

    /// Scopes requested by `startOauth2`.
    pub const DEFAULT: &[&str] = &[FORMS_BODY, DRIVE_FILE];
}

/// Default listen host.
pub const DEFAULT_HOST: &str = "localhost";

/// Default listen port.
pub const DEFAULT_PORT: u16 = 3000;

/// Path of the OAuth2 redirect handler.
pub const CALLBACK_PATH: &str = "/oauth2/callback";

/// Server configuration.
#[derive(Clone)]
pub struct Config {
    /// OAuth2 client id.
    pub client_id: String,

    /// OAuth2 client secret.
    pub client_secret: String,

    /// Listen host.
    pub host: String,

    /// Listen port.
    pub port: u16,

    /// Public base URL, used for the redirect URI and SSE endpoint announcements.
    pub base_url: String,

    /// Authorization endpoint (overridable for mock servers).
    pub auth_url: String,

    /// Token endpoint (overridable for mock servers).
    pub token_url: String,

    /// Forms API base URL.
    pub forms_api_url: String,

    /// Drive API base URL.
    pub drive_api_url: String,

    /// Request timeout.
    pub request_timeout: Duration,

    /// Connection timeout.
    pub connect_timeout: Duration,
}

impl Config {
    /// Create a configuration for the given OAuth2 client, listening on the defaults.
    #[must_use]
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            base_url: default_base_url(DEFAULT_HOST, DEFAULT_PORT),
            auth_url: google::AUTH_URL.to_string(),
            token_url: google::TOKEN_URL.to_string(),
            forms_api_url: google::FORMS_API.to_string(),
            drive_api_url: google::DRIVE_API.to_string(),
            request_timeout: google::REQUEST_TIMEOUT,
            connect_timeout: google::CONNECT_TIMEOUT,
        }
    }

    /// Set the listen address. The base URL follows unless one is given explicitly.
    #[must_use]
    pub fn with_listen(mut self, host: impl Into<String>, port: u16, base_url: Option<String>) -> Self {
        self.host = host.into();
        self.port = port;
        self.base_url = base_url
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| default_base_url(&self.host, port));
        self
    }

    /// Create a test configuration with every Google endpoint pointed at a mock server.
    #[must_use]
    pub fn for_testing(base_url: &str) -> Self {
        Self {
            client_id: "test-client-id".to_string(),
            client_secret: "test-client-secret".to_string(),
            host: "127.0.0.1".to_string(),
            port: 0,
            base_url: "http://localhost:3000".to_string(),
            auth_url: format!("{}/o/oauth2/v2/auth", base_url),
            token_url: format!("{}/token", base_url),
            forms_api_url: format!("{}/v1", base_url),
            drive_api_url: format!("{}/drive/v3", base_url),
            request_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(2),
        }
    }

    /// Create configuration from environment variables.
    ///
    /// Reads `GOOGLE_CLIENT_ID`, `GOOGLE_CLIENT_SECRET`, `HOST`, `PORT` and `BASE_URL`.
    ///
    /// # Errors
    ///
    /// Returns error if `PORT` is not a valid port number.
    pub fn from_env() -> anyhow::Result<Self> {
        let client_id = std::env::var("GOOGLE_CLIENT_ID").unwrap_or_default();
        let client_secret = std::env::var("GOOGLE_CLIENT_SECRET").unwrap_or_default();
        let host = std::env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
        let port = match std::env::var("PORT") {
            Ok(raw) => raw.parse()?,
            Err(_) => DEFAULT_PORT,
        };
        let base_url = std::env::var("BASE_URL").ok();

        Ok(Self::new(client_id, client_secret).with_listen(host, port, base_url))
    }

    /// OAuth2 redirect URI registered with Google.
    #[must_use]
    pub fn callback_url(&self) -> String {
        format!("{}{}", self.base_url, CALLBACK_PATH)
    }

    /// Check if OAuth2 client credentials are configured.
    #[must_use]
    pub fn has_client_credentials(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }
}

fn default_base_url(host: &str, port: u16) -> String {
    format!("http://{host}:{port}")
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("client_id", &self.client_id)
            .field("has_client_secret", &!self.client_secret.is_empty())
            .field("host", &self.host)
            .field("port", &self.port)
            .field("base_url", &self.base_url)
            .finish()
    }
}
