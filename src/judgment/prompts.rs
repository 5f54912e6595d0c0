//! Prompt templates for the judgment tasks.

pub const EXTRACT_SYSTEM: &str = "You maintain a personal knowledge base built from \
conversations. You reply with a single JSON object and nothing else.";

pub const PICK_SYSTEM: &str = "You deduplicate note titles in a knowledge base. You reply \
with exactly one title copied verbatim from the list, or the word None.";

pub const MERGE_SYSTEM: &str = "You edit Markdown notes in a knowledge base. You reply with \
the complete updated note in Markdown and nothing else.";

pub fn extract_topic(query: &str, response: &str) -> String {
    format!(
        "Read this exchange and describe the single main topic it is about.\n\n\
         User: {query}\nAI: {response}\n\n\
         Reply with JSON of this exact shape:\n\
         {{\n  \"primary_topic\": \"short title of the main concept\",\n  \
         \"entity_type\": \"topic | person | event | journal | place | project\",\n  \
         \"summary\": \"two or three sentences capturing what was learned\",\n  \
         \"related_concepts\": [\"up to five closely related concept titles\"]\n}}"
    )
}

pub fn pick_similar_title(candidate: &str, existing: &[String]) -> String {
    let listing = existing
        .iter()
        .map(|t| format!("- {t}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "New topic: {candidate}\n\nExisting titles:\n{listing}\n\n\
         If one existing title names the same concept as the new topic (synonym, \
         abbreviation, different wording), reply with that title exactly as listed. \
         If none do, reply with None."
    )
}

pub fn merge_content(existing_markdown: &str, new_info: &str, update_marker: &str) -> String {
    format!(
        "Existing note:\n<<<\n{existing_markdown}\n>>>\n\n\
         New information:\n<<<\n{new_info}\n>>>\n\n\
         Produce the updated note following these rules:\n\
         1. Keep the first line (the '# ' title line) exactly as it is.\n\
         2. Write one synthesized summary that reflects both the existing note and the \
            new information. Do not simply append the new text.\n\
         3. Keep a '## Related' section listing every [[link]] from both inputs once.\n\
         4. Remove any older 'Last updated' lines, generation timestamps and '---' separators.\n\
         5. End with this single line: {update_marker}"
    )
}
