//! Form tools: createForm, deleteForm, publishForm, getForm, listMyForms.

use serde_json::json;

use super::{McpTool, ToolContext, json_text, parse_input};
use crate::error::{ToolError, ToolResult};
use crate::models::{CreateFormInput, FormIdInput};
use crate::session::SessionId;

/// Shared schema for tools taking only a form id.
fn form_id_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "formId": {
                "type": "string",
                "description": "Form ID (from the form's edit URL)"
            }
        },
        "required": ["formId"]
    })
}

/// Creates a new form.
pub struct CreateFormTool;

#[async_trait::async_trait]
impl McpTool for CreateFormTool {
    fn name(&self) -> &'static str {
        "createForm"
    }

    fn description(&self) -> &'static str {
        "Create a Google Form. Only the form info (title, document title) is applied \
         at creation; add items with a batch update afterwards."
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "form": {
                    "type": "string",
                    "description": "JSON text of the Forms API Form resource, e.g. {\"info\":{\"title\":\"Survey\"}}"
                }
            },
            "required": ["form"]
        })
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        session: Option<&SessionId>,
        input: serde_json::Value,
    ) -> ToolResult<String> {
        let params: CreateFormInput = parse_input(input)?;
        let form = params.parse_form()?;

        let client = ctx.authenticated_client(session).await?;
        let created = client.create_form(&form).await?;

        json_text(&created)
    }
}

/// Placeholder for form deletion, which the Forms API does not offer.
pub struct DeleteFormTool;

#[async_trait::async_trait]
impl McpTool for DeleteFormTool {
    fn name(&self) -> &'static str {
        "deleteForm"
    }

    fn description(&self) -> &'static str {
        "Delete a Google Form. Not supported by the Google Forms API; always fails."
    }

    fn input_schema(&self) -> serde_json::Value {
        form_id_schema()
    }

    async fn execute(
        &self,
        _ctx: &ToolContext,
        _session: Option<&SessionId>,
        _input: serde_json::Value,
    ) -> ToolResult<String> {
        Err(ToolError::unsupported("Google Forms API does not support deleting forms"))
    }
}

/// Publishes a form and opens it for responses.
pub struct PublishFormTool;

#[async_trait::async_trait]
impl McpTool for PublishFormTool {
    fn name(&self) -> &'static str {
        "publishForm"
    }

    fn description(&self) -> &'static str {
        "Publish a Google Form so that it accepts responses."
    }

    fn input_schema(&self) -> serde_json::Value {
        form_id_schema()
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
        let published = client.publish_form(&params.form_id).await?;

        json_text(&published)
    }
}

/// Fetches a form definition.
pub struct GetFormTool;

#[async_trait::async_trait]
impl McpTool for GetFormTool {
    fn name(&self) -> &'static str {
        "getForm"
    }

    fn description(&self) -> &'static str {
        "Get a Google Form including its info, settings and items."
    }

    fn input_schema(&self) -> serde_json::Value {
        form_id_schema()
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
        let form = client.get_form(&params.form_id).await?;

        json_text(&form)
    }
}

/// Lists forms in the user's Drive.
pub struct ListMyFormsTool;

#[async_trait::async_trait]
impl McpTool for ListMyFormsTool {
    fn name(&self) -> &'static str {
        "listMyForms"
    }

    fn description(&self) -> &'static str {
        "List the Google Forms in the user's Drive that are not in the trash."
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
        let client = ctx.authenticated_client(session).await?;
        let files = client.list_forms().await?;

        json_text(&files)
    }
}
