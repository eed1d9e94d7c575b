//! Check command implementation.
//!
//! Runs a batch of posts through the intake scheduler and reports, for each
//! one, whether it reposts an image already on record.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use colored::Colorize;
use repost_core::{
    Candidate, Engine, EngineConfig, FeedListing, FingerprintSourceConfig, IntakeEvent,
    MatchResult, DEFAULT_MOCK_SEED,
};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use url::Url;

use crate::utils::print_match_result;

pub struct CheckOptions {
    pub file: PathBuf,
    pub db: String,
    pub memory: bool,
    pub json: bool,
    pub mock: bool,
    pub threshold: Option<u32>,
    pub cooldown_ms: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub proxy: Option<Url>,
}

/// What became of one input item.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum ItemReport {
    Recorded { identity: String, result: MatchResult },
    AlreadyRecorded { identity: String, result: Option<MatchResult> },
    Failed { identity: String, reason: String },
    DuplicateInBatch { identity: String },
}

/// Parse a JSON array of items, or a feed listing object.
pub fn parse_candidates(bytes: &[u8]) -> Result<Vec<Candidate>> {
    let value: Value = serde_json::from_slice(bytes).context("Failed to parse input as JSON")?;

    match value {
        Value::Array(_) => serde_json::from_value(value).context("Failed to parse items"),
        Value::Object(_) => {
            let listing: FeedListing =
                serde_json::from_value(value).context("Failed to parse feed listing")?;
            let total = listing.posts().count();
            let candidates = listing.candidates();
            if candidates.len() < total {
                info!(
                    ignored = total - candidates.len(),
                    "Skipped feed posts without an image"
                );
            }
            Ok(candidates)
        }
        _ => bail!("Failed to parse input: expected an array of items or a feed listing"),
    }
}

fn engine_config(options: &CheckOptions, batch_len: usize) -> EngineConfig {
    let mut config = EngineConfig::from_env();

    config.database_url = if options.memory {
        None
    } else {
        Some(options.db.clone())
    };
    if let Some(threshold) = options.threshold {
        config.matcher.threshold = threshold;
    }
    if let Some(ms) = options.cooldown_ms {
        config.scheduler.cooldown = Duration::from_millis(ms);
    }
    if let Some(secs) = options.timeout_secs {
        config.scheduler.fingerprint_timeout = Duration::from_secs(secs);
    }
    if let Some(proxy) = &options.proxy {
        config.scheduler.proxy_url = Some(proxy.clone());
    }
    if options.mock {
        config.source = FingerprintSourceConfig::Mock { seed: DEFAULT_MOCK_SEED };
    }
    // Every event of the batch fits without lagging
    config.scheduler.event_capacity = config.scheduler.event_capacity.max(batch_len);
    config
}

/// Execute the check command.
pub async fn execute(options: CheckOptions) -> Result<()> {
    let bytes = std::fs::read(&options.file)
        .with_context(|| format!("Failed to read input file: {}", options.file.display()))?;
    let candidates = parse_candidates(&bytes)?;
    info!(path = %options.file.display(), items = candidates.len(), "Read batch");

    if candidates.is_empty() {
        if !options.json {
            println!("{}", "No items to check.".dimmed());
        } else {
            println!("[]");
        }
        return Ok(());
    }

    let config = engine_config(&options, candidates.len());
    let engine = Engine::start(config)
        .await
        .context("Failed to start engine")?;

    let outcome = run_batch(&engine, &candidates).await;
    engine.shutdown().await;
    let reports = outcome?;

    let recorded = reports
        .iter()
        .filter(|r| matches!(r, ItemReport::Recorded { .. }))
        .count();
    let failed = reports
        .iter()
        .filter(|r| matches!(r, ItemReport::Failed { .. }))
        .count();

    if options.json {
        let rendered =
            serde_json::to_string_pretty(&reports).context("Failed to write JSON report")?;
        println!("{}", rendered);
    } else {
        print_reports(&reports, recorded, failed);
    }

    if recorded == 0 && failed > 0 {
        bail!("None of the {} item(s) could be fingerprinted", failed);
    }
    Ok(())
}

async fn run_batch(engine: &Engine, candidates: &[Candidate]) -> Result<Vec<ItemReport>> {
    let mut events = engine.scheduler.subscribe();
    let summary = engine
        .scheduler
        .enqueue(candidates.to_vec())
        .await
        .context("Failed to queue batch")?;
    debug!(?summary, "Batch queued");

    let mut outcomes: HashMap<String, IntakeEvent> = HashMap::new();
    let mut pending = summary.accepted;
    while pending > 0 {
        match events.recv().await {
            Ok(event) => {
                pending -= 1;
                outcomes.insert(event.identity().to_string(), event);
            }
            Err(RecvError::Lagged(missed)) => {
                warn!(missed, "Missed intake events");
                pending = pending.saturating_sub(missed as usize);
            }
            Err(RecvError::Closed) => break,
        }
    }
    engine
        .scheduler
        .wait_until_idle()
        .await
        .context("Intake scheduler stopped before the batch finished")?;

    let mut reported = std::collections::HashSet::new();
    let mut reports = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let identity = candidate.identity.clone();
        if !reported.insert(identity.clone()) {
            reports.push(ItemReport::DuplicateInBatch { identity });
            continue;
        }

        let report = match outcomes.remove(&identity) {
            Some(IntakeEvent::Recorded { result, .. }) => ItemReport::Recorded { identity, result },
            Some(IntakeEvent::Failed { reason, .. }) => ItemReport::Failed { identity, reason },
            Some(IntakeEvent::Skipped { .. }) | None => {
                let result = engine
                    .index
                    .get_match(&identity)
                    .await
                    .context("Failed to read match result")?;
                ItemReport::AlreadyRecorded { identity, result }
            }
        };
        reports.push(report);
    }
    Ok(reports)
}

fn print_reports(reports: &[ItemReport], recorded: usize, failed: usize) {
    let mut reposts = 0;
    for report in reports {
        match report {
            ItemReport::Recorded { identity, result } => {
                if result.is_duplicate {
                    reposts += 1;
                }
                print_match_result(identity, result);
            }
            ItemReport::AlreadyRecorded { identity, result } => {
                print!("{} ", "KNOWN".blue().bold());
                match result {
                    Some(result) if result.is_duplicate => println!(
                        "{} (already on record, {} match(es))",
                        identity.bold(),
                        result.match_count
                    ),
                    _ => println!("{} (already on record)", identity.bold()),
                }
            }
            ItemReport::Failed { identity, reason } => {
                println!("{} {} {}", "FAILED".yellow().bold(), identity.bold(), reason.dimmed());
            }
            ItemReport::DuplicateInBatch { identity } => {
                println!(
                    "{} {} {}",
                    "SKIPPED".dimmed(),
                    identity.bold(),
                    "(repeated in batch)".dimmed()
                );
            }
        }
    }

    println!();
    println!(
        "   {} {}   {} {}   {} {}",
        "Recorded:".dimmed(),
        recorded,
        "Reposts:".dimmed(),
        reposts.to_string().red(),
        "Failed:".dimmed(),
        failed
    );
}
