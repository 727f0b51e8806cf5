//! Google Forms MCP Server
//!
//! A Model Context Protocol (MCP) server exposing Google Forms and Drive as
//! tools. Each MCP session authorizes itself through Google's OAuth2
//! authorization-code flow; the resulting tokens are kept in memory, keyed by
//! session id, and used for every later tool call of that session.
//!
//! # Example
//!
//! ```no_run
//! use google_forms_mcp::{config::Config, server::McpServer};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     McpServer::new(config)?.run_http().await
//! }
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod google;
pub mod models;
pub mod server;
pub mod session;
pub mod tools;

pub use auth::OAuthBroker;
pub use config::Config;
pub use error::{AuthError, ClientError, ToolError};
pub use session::{SessionId, SessionManager};
