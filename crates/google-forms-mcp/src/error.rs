//! Error types for the Google Forms MCP server.
//!
//! Uses `thiserror` for structured error handling with automatic `From` implementations.

use std::time::Duration;

/// Errors from the OAuth2 credential broker and token endpoint.
#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    /// The token endpoint answered but issued no access token.
    #[error("Access token not found in token response")]
    MissingAccessToken,

    /// No credentials are stored for the session.
    #[error("Session {session_id} not found, please start OAuth2 authentication first")]
    SessionNotFound {
        /// Session the caller asked for
        session_id: String,
    },

    /// Token endpoint rejected the request.
    #[error("Token endpoint returned {status}: {message}")]
    TokenEndpoint {
        /// HTTP status code
        status: u16,
        /// Response body
        message: String,
    },

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Middleware error
    #[error("Middleware error: {0}")]
    Middleware(#[from] reqwest_middleware::Error),

    /// The token request could not be completed as OAuth2 prescribes
    #[error("OAuth2 token request failed: {0}")]
    Protocol(String),

    /// Token response was not valid JSON
    #[error("Failed to parse token response: {0}")]
    Parse(#[from] serde_json::Error),
}

impl AuthError {
    /// Create a session-not-found error.
    #[must_use]
    pub fn session_not_found(session_id: impl Into<String>) -> Self {
        Self::SessionNotFound { session_id: session_id.into() }
    }

    /// Returns true if the caller must (re-)authenticate to recover.
    #[must_use]
    pub const fn requires_authentication(&self) -> bool {
        matches!(self, Self::MissingAccessToken | Self::SessionNotFound { .. })
    }
}

/// Errors from the Forms/Drive API client.
#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    /// HTTP transport error (connection, DNS, TLS, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Middleware error
    #[error("Middleware error: {0}")]
    Middleware(#[from] reqwest_middleware::Error),

    /// Resource not found (404 response)
    #[error("Resource not found: {resource}")]
    NotFound {
        /// Description of the missing resource
        resource: String,
    },

    /// Invalid request parameters (400 response)
    #[error("Bad request: {message}")]
    BadRequest {
        /// Error message from API
        message: String,
    },

    /// Credentials rejected (401/403 response)
    #[error("Unauthorized ({status}): {message}")]
    Unauthorized {
        /// HTTP status code
        status: u16,
        /// Error message from API
        message: String,
    },

    /// Rate limited by Google (429 response)
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited {
        /// Suggested wait time before retry
        retry_after: Duration,
    },

    /// Server error (5xx response)
    #[error("Server error ({status}): {message}")]
    Server {
        /// HTTP status code
        status: u16,
        /// Error message
        message: String,
    },

    /// Unexpected HTTP status
    #[error("Unexpected status {status}: {message}")]
    UnexpectedStatus {
        /// HTTP status code
        status: u16,
        /// Response body or message
        message: String,
    },

    /// JSON parsing error
    #[error("Failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),

    /// Refreshing an expired access token failed
    #[error("Token refresh failed: {0}")]
    Refresh(String),

    /// Configured API base URL cannot carry a path
    #[error("Invalid API URL: {url}")]
    InvalidUrl {
        /// Offending base URL
        url: String,
    },
}

impl ClientError {
    /// Create a rate limited error with retry-after duration.
    #[must_use]
    pub fn rate_limited(seconds: u64) -> Self {
        Self::RateLimited { retry_after: Duration::from_secs(seconds) }
    }

    /// Create a not found error.
    #[must_use]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound { resource: resource.into() }
    }

    /// Create an invalid URL error.
    #[must_use]
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Create a bad request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest { message: message.into() }
    }

    /// Create an unauthorized error.
    #[must_use]
    pub fn unauthorized(status: u16, message: impl Into<String>) -> Self {
        Self::Unauthorized { status, message: message.into() }
    }

    /// Create a server error.
    #[must_use]
    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self::Server { status, message: message.into() }
    }

    /// Returns true for 401 responses, the only status that triggers a token refresh.
    #[must_use]
    pub const fn is_expired_token(&self) -> bool {
        matches!(self, Self::Unauthorized { status: 401, .. })
    }
}

/// Errors from MCP tool execution.
#[derive(thiserror::Error, Debug)]
pub enum ToolError {
    /// Error from the credential broker
    #[error("{0}")]
    Auth(#[from] AuthError),

    /// Error from the Google API client, surfaced unchanged
    #[error("{0}")]
    Client(#[from] ClientError),

    /// Input validation failed
    #[error("Validation error: {message}")]
    Validation {
        /// Field that failed validation
        field: String,
        /// Validation error message
        message: String,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The Google API has no such operation
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Internal tool logic error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ToolError {
    /// Create a validation error.
    #[must_use]
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation { field: field.into(), message: message.into() }
    }

    /// Create an unsupported-operation error.
    #[must_use]
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported(message.into())
    }

    /// Create an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Convert to a user-friendly error message for MCP response.
    #[must_use]
    pub fn to_user_message(&self) -> String {
        match self {
            Self::Validation { field, message } => {
                format!("Invalid input for '{field}': {message}")
            }
            _ => self.to_string(),
        }
    }
}

/// Result type alias for broker operations.
pub type AuthResult<T> = Result<T, AuthError>;

/// Result type alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Result type alias for tool operations.
pub type ToolResult<T> = Result<T, ToolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_not_found_directs_to_authenticate() {
        let err = AuthError::session_not_found("sess-9");
        let msg = err.to_string();
        assert!(msg.contains("sess-9"));
        assert!(msg.contains("start OAuth2 authentication first"));
        assert!(err.requires_authentication());
    }

    #[test]
    fn test_token_endpoint_error_is_not_auth_prompt() {
        let err = AuthError::TokenEndpoint { status: 500, message: "boom".into() };
        assert!(!err.requires_authentication());
    }

    #[test]
    fn test_only_401_is_expired_token() {
        assert!(ClientError::unauthorized(401, "expired").is_expired_token());
        assert!(!ClientError::unauthorized(403, "forbidden").is_expired_token());
        assert!(!ClientError::server(500, "oops").is_expired_token());
    }

    #[test]
    fn test_auth_error_surfaces_verbatim() {
        let err = ToolError::from(AuthError::MissingAccessToken);
        assert_eq!(err.to_user_message(), "Access token not found in token response");
    }

    #[test]
    fn test_tool_error_user_message() {
        let err = ToolError::validation("formId", "cannot be empty");
        assert!(err.to_user_message().contains("formId"));
        assert!(err.to_user_message().contains("cannot be empty"));
    }

    #[test]
    fn test_rate_limit_user_message() {
        let err = ToolError::from(ClientError::rate_limited(30));
        assert!(err.to_user_message().contains("30s"));
    }

    #[test]
    fn test_client_error_surfaces_verbatim() {
        let cases = [
            ClientError::not_found("form f1 does not exist"),
            ClientError::bad_request("invalid formId"),
            ClientError::unauthorized(403, "forbidden"),
            ClientError::server(503, "backend unavailable"),
            ClientError::rate_limited(30),
        ];
        for client_err in cases {
            let expected = client_err.to_string();
            let err = ToolError::from(client_err);
            assert_eq!(err.to_string(), expected);
            assert_eq!(err.to_user_message(), expected);
        }
    }
}
