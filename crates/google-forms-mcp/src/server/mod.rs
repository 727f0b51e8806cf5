//! MCP server implementation.
//!
//! Serves the MCP HTTP transports and the OAuth2 redirect endpoint from one
//! axum router. All sessions share a single [`OAuthBroker`].

pub mod callback;
pub mod middleware;
pub mod streams;
pub mod transport;

use std::sync::Arc;

use crate::auth::OAuthBroker;
use crate::config::Config;
use crate::session::SessionManager;
use crate::tools::{self, McpTool, ToolContext};

/// MCP server for Google Forms.
pub struct McpServer {
    config: Config,

    /// Tool execution context.
    ctx: ToolContext,

    /// Registered tools.
    tools: Vec<Box<dyn McpTool>>,
}

impl McpServer {
    /// Create a new MCP server with an in-memory session store.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client or authorization URL cannot be built.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        Self::with_sessions(config, SessionManager::in_memory())
    }

    /// Create a new MCP server backed by the given session manager.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client or authorization URL cannot be built.
    pub fn with_sessions(config: Config, sessions: SessionManager) -> anyhow::Result<Self> {
        let broker = OAuthBroker::new(&config, sessions)?;
        let ctx = ToolContext::new(Arc::new(broker));
        let tools = tools::register_all_tools();

        Ok(Self { config, ctx, tools })
    }

    /// Build the HTTP router without binding a socket.
    #[must_use]
    pub fn into_router(self) -> axum::Router {
        transport::create_router(self.tools, self.ctx, self.config.base_url)
    }

    /// Run the server in HTTP mode.
    ///
    /// # Errors
    ///
    /// Returns error on bind or server failure.
    pub async fn run_http(self) -> anyhow::Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let callback_url = self.config.callback_url();

        tracing::info!("Registered {} tools", self.tools.len());
        if !self.config.has_client_credentials() {
            tracing::warn!("GOOGLE_CLIENT_ID or GOOGLE_CLIENT_SECRET is not set");
        }

        let router = self.into_router();
        let listener = tokio::net::TcpListener::bind(&addr).await?;

        tracing::info!(addr = %addr, callback = %callback_url, "HTTP server listening");

        axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()).await?;

        tracing::info!("HTTP server shut down");
        Ok(())
    }

    /// Get tool by name.
    #[must_use]
    pub fn get_tool(&self, name: &str) -> Option<&dyn McpTool> {
        self.tools.iter().find(|t| t.name() == name).map(|t| t.as_ref())
    }

    /// Get tool context for execution.
    #[must_use]
    pub const fn context(&self) -> &ToolContext {
        &self.ctx
    }
}

impl std::fmt::Debug for McpServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpServer")
            .field("config", &self.config)
            .field("tools", &self.tools.len())
            .finish()
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Received shutdown signal");
}
