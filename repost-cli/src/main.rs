//! Repost CLI - find reposted images in batches of posts.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};
use url::Url;

mod commands;
mod exit_codes;
mod utils;

use commands::check::CheckOptions;
use exit_codes::ExitCode;

const EXIT_CODES_HELP: &str = "\
Exit codes:
  0   Success
  1   General error
  64  Usage error (invalid arguments)
  65  Input is not a batch of posts
  66  Input file, database or record not found
  69  Fingerprint source or scheduler unavailable
  74  Record store I/O error";

#[derive(Parser)]
#[command(name = "repost")]
#[command(author, version, about = "Near-duplicate image detection for post feeds", long_about = None)]
#[command(after_help = EXIT_CODES_HELP)]
struct Cli {
    /// Log engine activity to stderr (repeat for more detail)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fingerprint a batch of posts and report reposts
    Check {
        /// JSON array of items, or a feed listing
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// SQLite database holding earlier sightings
        #[arg(long, default_value = "repost.db")]
        db: String,

        /// Keep records in memory only (nothing is persisted)
        #[arg(long, conflicts_with = "db")]
        memory: bool,

        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,

        /// Derive fingerprints from locators instead of fetching images (for testing)
        #[arg(long)]
        mock: bool,

        /// Maximum Hamming distance still considered the same image
        #[arg(long)]
        threshold: Option<u32>,

        /// Pause between consecutive fetches, in milliseconds
        #[arg(long)]
        cooldown_ms: Option<u64>,

        /// Bound on one fingerprint computation, in seconds
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Fallback download route, called with the image URL as `url`
        #[arg(long, value_name = "URL")]
        proxy: Option<Url>,
    },

    /// Show the duplicate status of a recorded post
    Lookup {
        /// Identity of the post
        #[arg(value_name = "IDENTITY")]
        identity: String,

        /// SQLite database holding the records
        #[arg(long, default_value = "repost.db")]
        db: String,

        /// Maximum Hamming distance still considered the same image
        #[arg(long)]
        threshold: Option<u32>,

        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// List recorded posts, oldest first
    Records {
        /// SQLite database holding the records
        #[arg(long, default_value = "repost.db")]
        db: String,

        /// Show only the most recent N records
        #[arg(long)]
        limit: Option<usize>,

        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Check {
            file,
            db,
            memory,
            json,
            mock,
            threshold,
            cooldown_ms,
            timeout_secs,
            proxy,
        } => {
            commands::check::execute(CheckOptions {
                file,
                db,
                memory,
                json,
                mock,
                threshold,
                cooldown_ms,
                timeout_secs,
                proxy,
            })
            .await
        }
        Commands::Lookup {
            identity,
            db,
            threshold,
            json,
        } => commands::lookup::execute(identity, db, threshold, json).await,
        Commands::Records { db, limit, json } => commands::records::execute(db, limit, json).await,
    }
}

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() {
                exit_codes::USAGE_ERROR
            } else {
                exit_codes::SUCCESS
            };
            // Help and version go to stdout
            let _ = e.print();
            std::process::exit(code);
        }
    };
    init_tracing(cli.verbose);

    let exit = match run(cli.command).await {
        Ok(()) => ExitCode::success(),
        Err(e) => ExitCode::from_anyhow(&e),
    };

    if let Some(message) = &exit.message {
        eprintln!("Error: {}", message);
    }
    std::process::exit(exit.code);
}
