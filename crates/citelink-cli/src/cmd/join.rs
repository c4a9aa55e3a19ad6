//! Join subcommand - aggregate relations and join DOIs and the corpus

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use citelink_join::JoinConfig;

#[derive(Args, Debug)]
pub struct JoinArgs {
    /// Directory containing extracted relation parts (*_relations_part_*.gz)
    #[arg(long)]
    pub relations_dir: PathBuf,

    /// Directory containing harvested parquet parts
    #[arg(long)]
    pub harvest_dir: PathBuf,

    /// Converted corpus parquet file (omit for all-false membership)
    #[arg(long)]
    pub corpus: Option<PathBuf>,

    /// Output directory for the result tables
    #[arg(short, long)]
    pub output: PathBuf,

    /// DuckDB memory limit (e.g. "8GB")
    #[arg(long, default_value = "8GB")]
    pub memory_limit: String,

    /// Zstd compression level for the checkpoint parquet files
    #[arg(short, long, default_value_t = 3)]
    pub zstd_level: i32,
}

pub fn run(args: JoinArgs) -> Result<()> {
    let mut config = JoinConfig::new(args.relations_dir, args.harvest_dir, args.output);
    config.corpus_path = args.corpus;
    config.memory_limit = args.memory_limit;
    config.zstd_level = args.zstd_level;

    let summary = citelink_join::run(&config)?;

    println!();
    println!("=== Join Summary ===");
    println!(
        "Relation pairs: {} ({} in corpus)",
        summary.pairs, summary.pairs_in_corpus
    );
    println!(
        "Identifier rows: {} ({} in corpus)",
        summary.identifier_rows, summary.identifier_rows_in_corpus
    );
    println!("Provenance rows: {}", summary.provenance_rows);
    if summary.decode_errors > 0 {
        println!("Decode errors skipped: {}", summary.decode_errors);
    }
    Ok(())
}
