//! Lookup command implementation.

use anyhow::{bail, Context, Result};
use colored::Colorize;
use repost_core::{DuplicateIndex, EngineConfig, MatcherConfig};
use serde_json::json;
use tracing::info;

use crate::utils::{describe_record, open_existing_store, print_match_result};

/// Execute the lookup command.
///
/// Always recomputes against the whole store, so posts recorded after
/// `identity` show up as matches too.
pub async fn execute(identity: String, db: String, threshold: Option<u32>, json: bool) -> Result<()> {
    let store = open_existing_store(&db).await?;

    let Some(record) = store
        .get(&identity)
        .await
        .context("Failed to read record store")?
    else {
        bail!("No record for identity '{}' in {}", identity, db);
    };

    let defaults = EngineConfig::from_env().matcher;
    let config = MatcherConfig {
        threshold: threshold.unwrap_or(defaults.threshold),
        ..defaults
    };
    let index = DuplicateIndex::new(store, config);
    let Some(result) = index
        .refresh(&identity)
        .await
        .context("Failed to compute match result")?
    else {
        bail!("No record for identity '{}' in {}", identity, db);
    };
    info!(
        identity = %identity,
        matches = result.match_count,
        "Recomputed match result"
    );

    if json {
        let rendered = serde_json::to_string_pretty(&json!({
            "record": record,
            "result": result,
        }))
        .context("Failed to write JSON output")?;
        println!("{}", rendered);
    } else {
        println!("{}", describe_record(&record));
        println!("   {} {}", "Fingerprint:".dimmed(), record.fingerprint);
        println!("   {} {}", "Image:".dimmed(), record.content_locator);
        println!();
        print_match_result(&identity, &result);
    }
    Ok(())
}
