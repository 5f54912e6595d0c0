//! MCP `get_note` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `get_note` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct GetNoteParams {
    /// Note title or key. Titles are normalized the same way keys are.
    #[schemars(description = "Note title or key, e.g. 'React State Management' or 'react_state_management'")]
    pub title: String,

    /// Include the raw snippets that contributed to the note. Defaults to false.
    #[schemars(description = "Include the contributing snippets. Defaults to false.")]
    pub include_contexts: Option<bool>,
}
