use anyhow::Result;

use secondbrain::config::BrainConfig;

/// Display memory statistics in the terminal.
pub fn stats(config: &BrainConfig) -> Result<()> {
    let db_path = config.resolved_db_path();
    let conn = secondbrain::db::open_database(&db_path)?;

    let response = secondbrain::memory::stats::memory_stats(&conn, Some(&db_path))?;

    println!("Memory Statistics");
    println!("{}", "=".repeat(40));
    println!("  Interactions:        {}", response.interactions);
    println!("    with embedding:    {}", response.interactions_with_embedding);
    println!("    without:           {}", response.interactions_without_embedding);
    println!();
    println!("  Notes:               {}", response.notes);
    println!("    placeholders:      {}", response.placeholder_notes);
    println!("  Links:               {}", response.note_links);
    println!();
    println!("Database size:         {} bytes", response.db_size_bytes);

    if let Some(ref oldest) = response.oldest_interaction {
        println!("Oldest interaction:    {oldest}");
    }
    if let Some(ref newest) = response.newest_interaction {
        println!("Newest interaction:    {newest}");
    }

    Ok(())
}
