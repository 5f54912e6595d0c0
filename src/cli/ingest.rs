use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::Path;

use secondbrain::config::BrainConfig;

/// One line of the ingest file.
#[derive(Debug, Deserialize)]
struct TurnLine {
    query: String,
    response: String,
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
}

/// Record every turn in a JSONL file, then wait for the note worker to finish.
///
/// Blank lines are skipped. A malformed line aborts before anything is written.
pub async fn ingest(config: BrainConfig, file: &Path) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read ingest file: {}", file.display()))?;
    let turns = parse_lines(&text)?;

    let state = crate::server::setup_shared_state(config)?;
    let service = state.service;
    let mut failures = service
        .take_failures()
        .context("note failure channel already taken")?;

    println!("Ingesting {} turn(s)...", turns.len());

    let mut recorded = 0u64;
    let mut unembedded = 0u64;
    for turn in &turns {
        let record = service
            .ingest_turn(&turn.query, &turn.response, turn.timestamp)
            .await?;
        recorded += 1;
        if record.embedding.is_none() {
            unembedded += 1;
        }
    }

    service.shutdown().await;

    let mut failed_notes = 0u64;
    while let Ok(failure) = failures.try_recv() {
        eprintln!("  note for {} not updated: {}", failure.job_id, failure.error);
        failed_notes += 1;
    }

    println!(
        "Recorded {recorded} turn(s) ({unembedded} without embedding), {failed_notes} note update(s) failed."
    );
    Ok(())
}

fn parse_lines(text: &str) -> Result<Vec<TurnLine>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line).with_context(|| format!("line {}: invalid turn", i + 1))
        })
        .collect()
}
