//! Example demonstrating intake tracing instrumentation.
//!
//! Fingerprints two real images over HTTP, one of them twice under
//! different identities, and prints the match results.
//!
//! Run with: cargo run -p repost-core --example intake_tracing

use std::time::Duration;

use repost_core::{Candidate, Engine, EngineConfig, IntakeEvent};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() {
    fmt()
        .with_env_filter(EnvFilter::new("repost_core=debug,info"))
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    println!("=== Intake Tracing Demo ===\n");

    let mut config = EngineConfig::from_env();
    config.scheduler.cooldown = Duration::from_millis(500);
    println!("Config: {:?}\n", config.scheduler);

    let engine = match Engine::start(config).await {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Failed to start engine: {}", e);
            return;
        }
    };
    let mut events = engine.scheduler.subscribe();

    let logo = "https://www.rust-lang.org/logos/rust-logo-512x512.png";
    let batch = vec![
        Candidate::new("first", logo).with_origin("r/rust"),
        Candidate::new("second", logo).with_origin("r/programming"),
    ];
    let total = batch.len();

    if let Err(e) = engine.scheduler.enqueue(batch).await {
        eprintln!("Failed to enqueue: {}", e);
        return;
    }

    for _ in 0..total {
        match events.recv().await {
            Ok(IntakeEvent::Recorded { identity, result }) => {
                println!("\n✅ {identity}");
                println!("   Repost:  {}", result.is_duplicate);
                println!("   Matches: {}", result.match_count);
                if let Some(score) = result.similarity_score {
                    println!("   Score:   {score}%");
                }
            }
            Ok(IntakeEvent::Failed { identity, reason }) => {
                println!("\n❌ {identity}: {reason}");
            }
            Ok(IntakeEvent::Skipped { identity }) => {
                println!("\n⏭  {identity}: already recorded");
            }
            Err(e) => {
                println!("\n❌ Event stream closed: {}", e);
                break;
            }
        }
    }

    engine.shutdown().await;
}
