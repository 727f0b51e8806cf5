//! Input models for MCP tool parameters.
//!
//! Each tool deserializes its arguments into one of these structs and calls
//! `validate` before any credentials are resolved.

use serde::{Deserialize, Serialize};

use crate::error::{ToolError, ToolResult};

/// Input for tools addressing a single form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormIdInput {
    /// Form ID (as shown in the form's edit URL).
    pub form_id: String,
}

impl FormIdInput {
    pub fn validate(&self) -> ToolResult<()> {
        require_resource_id("formId", &self.form_id)
    }
}

/// Input for fetching one response of a form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormResponseInput {
    /// Form ID.
    pub form_id: String,

    /// Response ID.
    pub response_id: String,
}

impl FormResponseInput {
    pub fn validate(&self) -> ToolResult<()> {
        require_resource_id("formId", &self.form_id)?;
        require_resource_id("responseId", &self.response_id)
    }
}

/// Input for creating a form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFormInput {
    /// JSON text of the Forms `Form` resource, e.g. `{"info": {"title": "Survey"}}`.
    pub form: String,
}

impl CreateFormInput {
    /// Parse the embedded form document.
    ///
    /// # Errors
    ///
    /// Returns a validation error unless `form` holds a JSON object.
    pub fn parse_form(&self) -> ToolResult<serde_json::Value> {
        require_non_blank("form", &self.form)?;

        let value: serde_json::Value = serde_json::from_str(&self.form)
            .map_err(|e| ToolError::validation("form", format!("not valid JSON: {e}")))?;

        if !value.is_object() {
            return Err(ToolError::validation("form", "must be a JSON object"));
        }

        Ok(value)
    }
}

fn require_non_blank(field: &str, value: &str) -> ToolResult<()> {
    if value.trim().is_empty() {
        return Err(ToolError::validation(field, "cannot be empty"));
    }
    Ok(())
}

/// Google resource IDs are URL-safe base64: letters, digits, `-` and `_`.
fn require_resource_id(field: &str, value: &str) -> ToolResult<()> {
    require_non_blank(field, value)?;

    if !value.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_') {
        return Err(ToolError::validation(
            field,
            "may only contain letters, digits, '-' and '_'",
        ));
    }
    Ok(())
}
