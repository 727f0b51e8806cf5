//! Authentication tool: startOauth2.

use serde_json::json;

use super::{McpTool, ToolContext};
use crate::config::scopes;
use crate::error::{ToolError, ToolResult};
use crate::session::SessionId;

/// Starts the OAuth2 consent flow for the calling session.
pub struct StartOauth2Tool;

#[async_trait::async_trait]
impl McpTool for StartOauth2Tool {
    fn name(&self) -> &'static str {
        "startOauth2"
    }

    fn description(&self) -> &'static str {
        "Start OAuth2 authentication. Returns a Google consent URL; once the user \
         approves, the other tools act on their behalf for this session."
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        session: Option<&SessionId>,
        _input: serde_json::Value,
    ) -> ToolResult<String> {
        let Some(session) = session else {
            return Err(ToolError::validation(
                "sessionId",
                "connect with a sessionId query parameter to start OAuth2",
            ));
        };

        let url = ctx.broker.build_authorization_url(session.as_str(), scopes::DEFAULT);

        Ok(format!("Please visit this URL to authenticate: {url}"))
    }
}
