//! Response tools: getFormResponses, listFormResponses.

use serde_json::json;

use super::{McpTool, ToolContext, json_text, parse_input};
use crate::error::ToolResult;
use crate::models::{FormIdInput, FormResponseInput};
use crate::session::SessionId;

/// Fetches a single response of a form.
pub struct GetFormResponsesTool;

#[async_trait::async_trait]
impl McpTool for GetFormResponsesTool {
    fn name(&self) -> &'static str {
        "getFormResponses"
    }

    fn description(&self) -> &'static str {
        "Get one response submitted to a Google Form."
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "formId": {
                    "type": "string",
                    "description": "Form ID"
                },
                "responseId": {
                    "type": "string",
                    "description": "Response ID"
                }
            },
            "required": ["formId", "responseId"]
        })
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        session: Option<&SessionId>,
        input: serde_json::Value,
    ) -> ToolResult<String> {
        let params: FormResponseInput = parse_input(input)?;
        params.validate()?;

        let client = ctx.authenticated_client(session).await?;
        let response = client.get_response(&params.form_id, &params.response_id).await?;

        json_text(&response)
    }
}

/// Lists all responses of a form.
pub struct ListFormResponsesTool;

#[async_trait::async_trait]
impl McpTool for ListFormResponsesTool {
    fn name(&self) -> &'static str {
        "listFormResponses"
    }

    fn description(&self) -> &'static str {
        "List the responses submitted to a Google Form."
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "formId": {
                    "type": "string",
                    "description": "Form ID"
                }
            },
            "required": ["formId"]
        })
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        session: Option<&SessionId>,
        input: serde_json::Value,
    ) -> ToolResult<String> {
        let params: FormIdInput = parse_input(input)?;
        params.validate()?;

        let client = ctx.authenticated_client(session).await?;
        let responses = client.list_responses(&params.form_id).await?;

        json_text(&responses)
    }
}
