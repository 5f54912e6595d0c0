//! Conversational memory for chat agents.
//!
//! secondbrain keeps every conversation turn, finds the earlier turn most
//! relevant to a new prompt, and distils turns into a deduplicated,
//! cross-linked set of topic notes.
//!
//! | Store | Holds | Written by |
//! |-------|-------|------------|
//! | **Interactions** | Query, response, embedding of each turn | `record_turn`, append-only |
//! | **Notes** | One Markdown note per topic, plus contributing snippets | Background note worker |
//! | **Links** | Directed `[[key]]` references between notes | Note merges, placeholders |
//!
//! # Architecture
//!
//! - **Storage**: SQLite (WAL), embeddings as little-endian f32 blobs
//! - **Embeddings**: any OpenAI-compatible `/embeddings` endpoint
//! - **Judgment**: any OpenAI-compatible `/chat/completions` endpoint, used for
//!   topic extraction, same-concept title matching and note merging
//! - **Retrieval**: exhaustive cosine scoring with a strict relevance threshold
//! - **Transport**: MCP over stdio or Streamable HTTP
//!
//! # Modules
//!
//! - [`config`]: configuration loading from TOML files and environment variables
//! - [`db`]: SQLite initialization, schema, migrations, and health checks
//! - [`embedding`]: text-to-vector provider trait and HTTP client
//! - [`judgment`]: text-generation oracle trait, prompts, and answer parsing
//! - [`memory`]: retrieval, note resolution and merging, and the two stores
//! - [`service`]: the `augment` / `record_turn` facade and background note worker
//! - [`error`]: the core error taxonomy

pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
pub mod judgment;
pub mod memory;
pub mod service;
