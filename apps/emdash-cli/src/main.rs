//! Em dash replacement CLI
//!
//! Wires the engine, the file-system layer and the run log together:
//!
//! - `analyze` - report suggestions for each file and log them
//! - `apply` - back up, substitute and log a processing run per file
//! - `rules` - show the active rule table in resolution order
//! - `runs` - list recent processing runs

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

/// Default log store when neither `--database-url` nor `DATABASE_URL` is set
const DEFAULT_DATABASE_URL: &str = "sqlite:emdash-log.db?mode=rwc";

#[derive(Parser, Debug)]
#[command(name = "emdash")]
#[command(version, about = "Contextual em dash replacement for manuscript chapters")]
struct Args {
    /// JSON engine configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite URL of the run log (falls back to DATABASE_URL)
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Do not write to the run log
    #[arg(long, global = true)]
    no_log: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Suggest replacements without touching the files
    Analyze {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Threshold used to count manual-review cases
        #[arg(long)]
        threshold: Option<f64>,

        /// Print the full findings as JSON
        #[arg(long)]
        json: bool,
    },

    /// Replace em dashes whose suggestion clears the threshold
    Apply {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[arg(long)]
        threshold: Option<f64>,

        /// Compute statistics without writing
        #[arg(long)]
        dry_run: bool,

        /// Write here instead of overwriting (single file only)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Skip the timestamped backup before overwriting
        #[arg(long)]
        no_backup: bool,

        /// Reuse the last findings logged for each file instead of re-analyzing
        #[arg(long)]
        from_log: bool,
    },

    /// List the active rules in resolution order
    Rules,

    /// List recent processing runs
    Runs {
        #[arg(long, default_value = "10")]
        limit: u32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    // reports go to stdout, logs to stderr
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let database_url = args
        .database_url
        .or_else(|| std::env::var("DATABASE_URL").ok())
        .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

    let ctx = commands::Context::new(args.config.as_deref(), &database_url, !args.no_log).await?;
    commands::run(&ctx, args.command).await
}
