//! Harvest subcommand - collect entity types and DOIs into parquet parts

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use citelink_core::SharedProgress;
use citelink_openaire::HarvestConfig;

#[derive(Args, Debug)]
pub struct HarvestArgs {
    /// Directory containing the dump's entity shards
    #[arg(long)]
    pub datadir: PathBuf,

    /// Output directory for parquet part files
    #[arg(short, long)]
    pub output: PathBuf,

    /// Glob for shards within the data directory
    #[arg(long, default_value = "*.tar")]
    pub shard_glob: String,

    /// Buffered rows before a part flush
    #[arg(long)]
    pub chunk_rows: Option<usize>,

    /// Number of parallel workers
    #[arg(short = 'j', long, default_value_t = 1)]
    pub n_jobs: usize,

    /// Zstd compression level for parquet parts
    #[arg(short, long, default_value_t = 3)]
    pub zstd_level: i32,
}

pub fn run(args: HarvestArgs, progress: &SharedProgress) -> Result<()> {
    let mut config = HarvestConfig::new(args.datadir, args.output);
    config.shard_glob = args.shard_glob;
    config.n_jobs = args.n_jobs;
    config.zstd_level = args.zstd_level;
    if let Some(chunk_rows) = args.chunk_rows {
        config.chunk_rows = chunk_rows;
    }

    let summary = citelink_openaire::run_harvest(&config, progress)?;

    println!();
    println!("=== Harvest Summary ===");
    println!(
        "Shards: {}/{} completed ({} failed)",
        summary.completed, summary.total_shards, summary.failed
    );
    println!("Entities seen: {}", summary.rows);
    println!("Time: {:.1}s", summary.elapsed.as_secs_f64());

    if summary.failed > 0 {
        anyhow::bail!("{} shards failed", summary.failed);
    }
    Ok(())
}
