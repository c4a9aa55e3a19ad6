//! Build-filter subcommand - derive the target-class id file from
//! harvested type parts

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use citelink_core::{collect_ids_from_parquet, save_id_filter};

#[derive(Args, Debug)]
pub struct BuildFilterArgs {
    /// Directory containing harvested type parts
    #[arg(long)]
    pub harvest_dir: PathBuf,

    /// Output path for the newline-delimited id file
    #[arg(short, long)]
    pub output: PathBuf,

    /// Entity class to collect ids for
    #[arg(long, default_value = "dataset")]
    pub entity_type: String,

    /// Glob for type parts within the harvest directory
    #[arg(long, default_value = "*_types_part_*.parquet")]
    pub type_glob: String,
}

pub fn run(args: BuildFilterArgs) -> Result<()> {
    let mut ids = collect_ids_from_parquet(&args.harvest_dir, &args.type_glob, &args.entity_type)
        .with_context(|| {
            format!(
                "Failed to collect {} ids from {}",
                args.entity_type,
                args.harvest_dir.display()
            )
        })?;
    save_id_filter(&mut ids, &args.output)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    println!();
    println!("=== Filter Summary ===");
    println!("{} ids: {}", args.entity_type, ids.len());
    println!("Written to: {}", args.output.display());
    Ok(())
}
