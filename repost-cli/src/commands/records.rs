//! Records command implementation.

use anyhow::{Context, Result};
use colored::Colorize;
use serde_json::json;

use crate::utils::{describe_record, open_existing_store};

/// Execute the records command.
pub async fn execute(db: String, limit: Option<usize>, json: bool) -> Result<()> {
    let store = open_existing_store(&db).await?;
    let snapshot = store.all().await.context("Failed to read record store")?;

    // Most recent sightings when limited
    let skip = limit.map_or(0, |limit| snapshot.len().saturating_sub(limit));
    let records = &snapshot[skip..];

    if json {
        let rendered = serde_json::to_string_pretty(&json!({
            "count": snapshot.len(),
            "records": records,
        }))
        .context("Failed to write JSON output")?;
        println!("{}", rendered);
        return Ok(());
    }

    if snapshot.is_empty() {
        println!("{}", "No records.".dimmed());
        return Ok(());
    }
    for record in records {
        println!("{}", describe_record(record));
    }
    println!();
    println!("   {} {}", "Total:".dimmed(), snapshot.len());
    Ok(())
}
