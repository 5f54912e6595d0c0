pub mod interactions;
pub mod merger;
pub mod notes;
pub mod resolver;
pub mod retrieval;
pub mod similarity;
pub mod stats;
pub mod types;

use chrono::{DateTime, SecondsFormat, Utc};

/// Encode an embedding as little-endian f32 bytes for BLOB storage.
pub fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|x| x.to_le_bytes()).collect()
}

/// Decode a stored embedding. Returns `None` for a blob that is not a whole
/// number of f32 values or that disagrees with the recorded dimension.
pub fn bytes_to_embedding(bytes: &[u8], expected_dim: Option<usize>) -> Option<Vec<f32>> {
    if bytes.is_empty() || bytes.len() % 4 != 0 {
        return None;
    }
    let vector: Vec<f32> = bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    match expected_dim {
        Some(dim) if dim != vector.len() => None,
        _ => Some(vector),
    }
}

/// Fixed-width RFC 3339 so stored timestamps sort lexically.
pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })
}

/// Truncate to at most `max_chars` characters, appending `marker` if cut.
pub(crate) fn truncate_chars(text: &str, max_chars: usize, marker: &str) -> (String, bool) {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => (format!("{}{marker}", &text[..cut]), true),
        None => (text.to_string(), false),
    }
}
