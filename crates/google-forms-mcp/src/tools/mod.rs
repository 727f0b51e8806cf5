//! MCP tool implementations.
//!
//! Each tool:
//! 1. Parses and validates its input parameters
//! 2. Resolves an authenticated client for the caller's session
//! 3. Returns Google's JSON response as text

mod auth;
mod forms;
mod responses;

pub use auth::*;
pub use forms::*;
pub use responses::*;

use std::sync::Arc;

use serde_json::Value;

use crate::auth::OAuthBroker;
use crate::error::{AuthError, ToolResult};
use crate::google::GoogleClient;
use crate::session::SessionId;

/// Tool execution context.
pub struct ToolContext {
    /// Credential broker shared by all sessions.
    pub broker: Arc<OAuthBroker>,
}

impl ToolContext {
    /// Create a new tool context.
    #[must_use]
    pub fn new(broker: Arc<OAuthBroker>) -> Self {
        Self { broker }
    }

    /// Resolve the Google client for the calling session.
    ///
    /// A call without a session id fails the same way as an unknown session.
    pub async fn authenticated_client(&self, session: Option<&SessionId>) -> ToolResult<GoogleClient> {
        let Some(session) = session else {
            return Err(AuthError::session_not_found("<missing sessionId>").into());
        };
        Ok(self.broker.authenticated_client(session.as_str()).await?)
    }
}

/// Trait for MCP tools.
#[async_trait::async_trait]
pub trait McpTool: Send + Sync {
    /// Tool name (e.g., "createForm").
    fn name(&self) -> &'static str;

    /// Tool description for LLM.
    fn description(&self) -> &'static str;

    /// JSON Schema for input parameters.
    fn input_schema(&self) -> Value;

    /// Execute the tool on behalf of `session`.
    async fn execute(
        &self,
        ctx: &ToolContext,
        session: Option<&SessionId>,
        input: Value,
    ) -> ToolResult<String>;
}

/// Register all tools.
#[must_use]
pub fn register_all_tools() -> Vec<Box<dyn McpTool>> {
    vec![
        // Authentication (1)
        Box::new(auth::StartOauth2Tool),
        // Forms (5)
        Box::new(forms::CreateFormTool),
        Box::new(forms::DeleteFormTool),
        Box::new(forms::PublishFormTool),
        Box::new(forms::GetFormTool),
        Box::new(forms::ListMyFormsTool),
        // Responses (2)
        Box::new(responses::GetFormResponsesTool),
        Box::new(responses::ListFormResponsesTool),
    ]
}

/// Serialize a provider response as compact JSON text.
fn json_text(value: &Value) -> ToolResult<String> {
    Ok(serde_json::to_string(value)?)
}

/// Parse tool arguments, treating `null` as an empty object.
fn parse_input<T: serde::de::DeserializeOwned>(input: Value) -> ToolResult<T> {
    let input = if input.is_null() { Value::Object(serde_json::Map::new()) } else { input };
    Ok(serde_json::from_value(input)?)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_tool_names_are_unique() {
        let tools = register_all_tools();
        let names: HashSet<_> = tools.iter().map(|t| t.name()).collect();
        assert_eq!(names.len(), tools.len());
        assert_eq!(tools.len(), 8);
    }

    #[test]
    fn test_schemas_are_objects() {
        for tool in register_all_tools() {
            let schema = tool.input_schema();
            assert_eq!(schema["type"], "object", "{} schema", tool.name());
            assert!(!tool.description().is_empty());
        }
    }
}
