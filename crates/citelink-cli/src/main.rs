//! citelink - OpenAIRE graph dump extraction and dataset-citation aggregation
//!
//! Filters relation shards, harvests entity types and DOIs, converts the
//! Data Citation Corpus, and joins everything into per-pair relation
//! tables with corpus membership.

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod cmd;

#[derive(Parser)]
#[command(name = "citelink")]
#[command(about = "OpenAIRE graph dump extraction and dataset-citation aggregation")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Harvest entity types and DOIs from entity shards
    Harvest(cmd::harvest::HarvestArgs),
    /// Build the entity id filter from harvested type parts
    BuildFilter(cmd::build_filter::BuildFilterArgs),
    /// Extract in-scope relation lines from relation shards
    Extract(cmd::extract::ExtractArgs),
    /// Convert the Data Citation Corpus release to parquet
    Corpus(cmd::corpus::CorpusArgs),
    /// Aggregate relations and join against DOIs and the corpus
    Join(cmd::join::JoinArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Progress context (TTY auto-detect)
    let progress = Arc::new(citelink_core::ProgressContext::new());

    // Logging:
    //   TTY:     quiet (warn) unless --debug  — progress bars show activity
    //   non-TTY: info unless --debug          — logs are the only progress indicator
    let is_tty = progress.is_tty();
    let multi = if is_tty { Some(progress.multi()) } else { None };
    let quiet = if is_tty { !cli.debug } else { false };
    citelink_core::init_logging(quiet, cli.debug, multi);

    match cli.command {
        Command::Harvest(args) => cmd::harvest::run(args, &progress),
        Command::BuildFilter(args) => cmd::build_filter::run(args),
        Command::Extract(args) => cmd::extract::run(args, &progress),
        Command::Corpus(args) => cmd::corpus::run(args),
        Command::Join(args) => cmd::join::run(args),
    }
}
