//! Common utility functions shared across CLI commands.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use colored::Colorize;
use repost_core::{open_store, MatchResult, Record, RecordStore};

/// Open the record store at `db`, which must already exist.
///
/// `db` is a filesystem path or a `sqlite:` URL; only plain paths are
/// checked for existence up front.
pub async fn open_existing_store(db: &str) -> Result<Arc<dyn RecordStore>> {
    if !db.starts_with("sqlite:") && !Path::new(db).exists() {
        bail!("Failed to read database: {} does not exist", db);
    }
    open_store(Some(db))
        .await
        .with_context(|| format!("Failed to open record store: {}", db))
}

/// Format a timestamp as a human-readable UTC string.
pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// One-line description of a record for listings.
pub fn describe_record(record: &Record) -> String {
    let mut line = record.identity.bold().to_string();
    if !record.origin.is_empty() {
        line.push_str(&format!(" {}", record.origin.cyan()));
    }
    if !record.title.is_empty() {
        line.push_str(&format!(" \"{}\"", record.title));
    }
    line.push_str(&format!(
        " {}",
        format!("(seen {})", format_timestamp(&record.observed_at)).dimmed()
    ));
    line
}

/// Print a match result under its identity.
pub fn print_match_result(identity: &str, result: &MatchResult) {
    if result.is_duplicate {
        let score = result
            .similarity_score
            .map(|s| format!(" ({}% similar)", s))
            .unwrap_or_default();
        println!(
            "{} {} matches {} other post(s){}",
            "REPOST".red().bold(),
            identity.bold(),
            result.match_count,
            score
        );
        for record in &result.matches {
            println!("   {} {}", "↳".dimmed(), describe_record(record));
            if !record.external_link.is_empty() {
                println!("     {}", record.external_link.dimmed());
            }
        }
    } else {
        println!("{} {}", "ORIGINAL".green().bold(), identity.bold());
    }
}
