//! Tool parameter models.
//!
//! All models use `#[serde(rename_all = "camelCase")]` to match the MCP tool schemas.

mod inputs;

pub use inputs::*;
