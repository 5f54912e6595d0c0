//! MCP `record_turn` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `record_turn` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RecordTurnParams {
    #[schemars(description = "The user's message for this turn")]
    pub query: String,

    #[schemars(description = "The assistant's final response for this turn")]
    pub response: String,
}
