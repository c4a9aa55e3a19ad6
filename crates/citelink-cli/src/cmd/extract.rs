//! Extract subcommand - filter relation shards against the id set

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use citelink_core::SharedProgress;
use citelink_openaire::ExtractConfig;

#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Directory containing the dump's relation shards
    #[arg(long)]
    pub datadir: PathBuf,

    /// Newline-delimited file of target-class entity ids
    #[arg(long)]
    pub ids_file: PathBuf,

    /// Output directory for gzip part files
    #[arg(short, long)]
    pub output: PathBuf,

    /// Glob for relation shards within the data directory
    #[arg(long, default_value = "relation_*.tar")]
    pub shard_glob: String,

    /// Number of parallel workers
    #[arg(short = 'j', long, default_value_t = 1)]
    pub n_jobs: usize,

    /// Uncompressed bytes per output part before rotation
    #[arg(long)]
    pub max_part_bytes: Option<u64>,
}

pub fn run(args: ExtractArgs, progress: &SharedProgress) -> Result<()> {
    let mut config = ExtractConfig::new(args.datadir, args.output, args.ids_file);
    config.shard_glob = args.shard_glob;
    config.n_jobs = args.n_jobs;
    if let Some(max_part_bytes) = args.max_part_bytes {
        config.max_part_bytes = max_part_bytes;
    }

    let summary = citelink_openaire::run_extract(&config, progress)?;

    println!();
    println!("=== Extract Summary ===");
    println!(
        "Shards: {}/{} completed ({} failed)",
        summary.completed, summary.total_shards, summary.failed
    );
    println!("Relations kept: {}", summary.rows);
    println!("Time: {:.1}s", summary.elapsed.as_secs_f64());

    if summary.failed > 0 {
        anyhow::bail!("{} shards failed", summary.failed);
    }
    Ok(())
}
