//! MCP `list_notes` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `list_notes` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ListNotesParams {
    #[schemars(description = "Include placeholder notes that have no content yet. Defaults to true.")]
    pub include_placeholders: Option<bool>,
}
