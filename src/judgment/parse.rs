//! Shape validation for raw oracle answers.

use serde::Deserialize;

use crate::error::{MemoryError, MemoryResult};
use crate::memory::types::TopicExtract;

#[derive(Deserialize)]
struct RawExtract {
    #[serde(alias = "primaryTopic", alias = "topic")]
    primary_topic: Option<String>,
    #[serde(alias = "entityType", alias = "type")]
    entity_type: Option<String>,
    summary: Option<String>,
    #[serde(default, alias = "relatedConcepts", alias = "related")]
    related_concepts: Vec<String>,
}

/// Parse a topic-extraction answer. Tolerates prose or code fences around the
/// JSON object; rejects a missing topic or summary.
pub fn topic_extract(answer: &str) -> MemoryResult<TopicExtract> {
    let start = answer
        .find('{')
        .ok_or_else(|| MemoryError::MalformedJudgmentOutput("no JSON object in answer".into()))?;
    let end = answer
        .rfind('}')
        .filter(|&end| end > start)
        .ok_or_else(|| MemoryError::MalformedJudgmentOutput("unterminated JSON object".into()))?;

    let raw: RawExtract = serde_json::from_str(&answer[start..=end])
        .map_err(|e| MemoryError::MalformedJudgmentOutput(format!("invalid extraction JSON: {e}")))?;

    let primary_topic = non_blank(raw.primary_topic)
        .ok_or_else(|| MemoryError::MalformedJudgmentOutput("missing primary_topic".into()))?;
    let summary = non_blank(raw.summary)
        .ok_or_else(|| MemoryError::MalformedJudgmentOutput("missing summary".into()))?;

    let related_concepts = raw
        .related_concepts
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();

    Ok(TopicExtract {
        primary_topic,
        entity_type: non_blank(raw.entity_type),
        summary,
        related_concepts,
    })
}

/// Parse a title-pick answer. `None` (any case) means no match.
pub fn picked_title(answer: &str) -> Option<String> {
    let line = answer.lines().map(str::trim).find(|l| !l.is_empty())?;
    let line = line.strip_prefix("- ").unwrap_or(line);
    let cleaned = line
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '`' || c == '*')
        .trim();

    if cleaned.is_empty() || cleaned.eq_ignore_ascii_case("none") {
        None
    } else {
        Some(cleaned.to_string())
    }
}

/// Strip a surrounding Markdown code fence, if any.
pub fn merged_markdown(answer: &str) -> String {
    let trimmed = answer.trim();
    if let Some(rest) = trimmed.strip_prefix("```") {
        let body = rest.split_once('\n').map(|(_, b)| b).unwrap_or("");
        let body = body.trim_end();
        let body = body.strip_suffix("```").unwrap_or(body);
        return body.trim().to_string();
    }
    trimmed.to_string()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_from_fenced_json() {
        let answer = "Sure!\n```json\n{\"primary_topic\": \"React State Management\", \
                      \"summary\": \"Hooks manage state.\", \
                      \"related_concepts\": [\"React\", \" \", \"State Management\"]}\n```";
        let extract = topic_extract(answer).unwrap();
        assert_eq!(extract.primary_topic, "React State Management");
        assert_eq!(extract.summary, "Hooks manage state.");
        assert_eq!(extract.related_concepts, vec!["React", "State Management"]);
        assert!(extract.entity_type.is_none());
    }

    #[test]
    fn extract_accepts_camel_case_keys() {
        let answer = r#"{"primaryTopic": "Ada Lovelace", "entityType": "person", "summary": "First programmer."}"#;
        let extract = topic_extract(answer).unwrap();
        assert_eq!(extract.primary_topic, "Ada Lovelace");
        assert_eq!(extract.entity_type.as_deref(), Some("person"));
        assert!(extract.related_concepts.is_empty());
    }

    #[test]
    fn extract_rejects_missing_summary() {
        let err = topic_extract(r#"{"primary_topic": "X", "summary": "   "}"#).unwrap_err();
        assert!(matches!(err, MemoryError::MalformedJudgmentOutput(_)));
    }

    #[test]
    fn extract_rejects_prose() {
        let err = topic_extract("I could not find a topic.").unwrap_err();
        assert!(matches!(err, MemoryError::MalformedJudgmentOutput(_)));
    }

    #[test]
    fn extract_rejects_wrong_shape() {
        let err = topic_extract(r#"{"primary_topic": 12, "summary": "s"}"#).unwrap_err();
        assert!(matches!(err, MemoryError::MalformedJudgmentOutput(_)));
    }

    #[test]
    fn picked_title_variants() {
        assert_eq!(picked_title("None"), None);
        assert_eq!(picked_title("  NONE \n"), None);
        assert_eq!(picked_title(""), None);
        assert_eq!(
            picked_title("\"react_hooks\"\n"),
            Some("react_hooks".to_string())
        );
        assert_eq!(picked_title("- `rust`"), Some("rust".to_string()));
    }

    #[test]
    fn merged_markdown_strips_fence() {
        let answer = "```markdown\n# Title\n\nBody\n```";
        assert_eq!(merged_markdown(answer), "# Title\n\nBody");
        assert_eq!(merged_markdown("  # Plain\n"), "# Plain");
        assert_eq!(merged_markdown("```\n```"), "");
    }
}
