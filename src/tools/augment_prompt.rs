//! MCP `augment_prompt` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `augment_prompt` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct AugmentPromptParams {
    /// The user's new message.
    #[schemars(description = "The user's new message, before a response is generated")]
    pub query: String,
}
