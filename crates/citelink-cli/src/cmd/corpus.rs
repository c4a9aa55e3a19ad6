//! Corpus subcommand - convert Data Citation Corpus releases to parquet

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use citelink_corpus::CorpusConfig;

#[derive(Args, Debug)]
pub struct CorpusArgs {
    /// Directory holding the corpus release files
    #[arg(long)]
    pub corpus_dir: PathBuf,

    /// Output directory for corpus.parquet
    #[arg(short, long)]
    pub output: PathBuf,

    /// Glob for release files within the corpus directory
    #[arg(long, default_value = "*.json")]
    pub file_glob: String,

    /// Zstd compression level
    #[arg(short, long, default_value_t = 3)]
    pub zstd_level: i32,
}

pub fn run(args: CorpusArgs) -> Result<()> {
    let mut config = CorpusConfig::new(args.corpus_dir, args.output);
    config.file_glob = args.file_glob;
    config.zstd_level = args.zstd_level;

    let summary = citelink_corpus::run_convert(&config)?;

    println!();
    println!("=== Corpus Summary ===");
    println!("Files: {}", summary.files);
    println!("Records: {}", summary.records);
    println!(
        "Non-DOI endpoints: {} publications, {} datasets",
        summary.non_doi_publications, summary.non_doi_datasets
    );
    println!("Time: {:.1}s", summary.elapsed.as_secs_f64());
    Ok(())
}
