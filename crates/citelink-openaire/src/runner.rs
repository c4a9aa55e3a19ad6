//! Fan-out over dump shards with a bounded rayon worker pool.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use anyhow::{Context, Result, bail};
use citelink_core::filter::IdFilterSet;
use citelink_core::progress::SharedProgress;
use rayon::prelude::*;

use crate::config::{ExtractConfig, HarvestConfig, NON_ENTITY_PREFIXES};
use crate::extract::extract_shard;
use crate::harvest::harvest_shard;

/// Run summary for one fan-out stage
#[derive(Debug)]
pub struct RunSummary {
    pub total_shards: usize,
    pub completed: usize,
    pub failed: usize,
    pub rows: usize,
    pub elapsed: std::time::Duration,
}

impl RunSummary {
    fn log(&self, stage: &str, row_label: &str) {
        log::info!("=== {stage} summary ===");
        log::info!(
            "Shards: {}/{} completed ({} failed)",
            self.completed,
            self.total_shards,
            self.failed
        );
        log::info!("{row_label}: {}", self.rows);
        log::info!("Time: {:.1}s", self.elapsed.as_secs_f64());
    }
}

/// Discover shard files under `datadir` matching `pattern`, sorted.
fn discover_shards(datadir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let full = datadir.join(pattern);
    let full = full.to_string_lossy();
    let mut shards: Vec<PathBuf> = glob::glob(&full)
        .with_context(|| format!("invalid shard glob: {full}"))?
        .filter_map(|entry| entry.ok())
        .filter(|p| p.is_file())
        .collect();
    shards.sort();
    if shards.is_empty() {
        bail!("no shards match {full}");
    }
    Ok(shards)
}

fn shard_label(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Extract in-scope relation lines from every relation shard.
pub fn run_extract(config: &ExtractConfig, progress: &SharedProgress) -> Result<RunSummary> {
    let start = Instant::now();

    std::fs::create_dir_all(&config.outdir).context("Failed to create output directory")?;

    let ids = IdFilterSet::load(&config.ids_file)
        .with_context(|| format!("Failed to read id filter {}", config.ids_file.display()))?;
    log::info!("Loaded {} target-class ids", ids.len());
    let ids = Arc::new(ids);

    let shards = discover_shards(&config.datadir, &config.shard_glob)?;
    let total_shards = shards.len();
    log::info!(
        "Extracting from {} relation shards with {} workers",
        total_shards,
        config.n_jobs
    );

    let rows_counter = AtomicUsize::new(0);
    let completed_counter = AtomicUsize::new(0);
    let failed_counter = AtomicUsize::new(0);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.n_jobs)
        .build()
        .context("Failed to create thread pool")?;

    pool.install(|| {
        shards.par_iter().for_each(|shard| {
            let label = shard_label(shard);
            let pb = progress.shard_bar(&label);
            match extract_shard(shard, &config.outdir, &ids, config.max_part_bytes, &pb) {
                Ok(stats) => {
                    completed_counter.fetch_add(1, Ordering::Relaxed);
                    rows_counter.fetch_add(stats.rows_written, Ordering::Relaxed);
                    if progress.is_tty() {
                        pb.finish_and_clear();
                    } else {
                        stats.log(&label);
                    }
                }
                Err(e) => {
                    failed_counter.fetch_add(1, Ordering::Relaxed);
                    pb.finish_and_clear();
                    log::error!("{label}: {e}");
                }
            }
        });
    });

    let summary = RunSummary {
        total_shards,
        completed: completed_counter.load(Ordering::Relaxed),
        failed: failed_counter.load(Ordering::Relaxed),
        rows: rows_counter.load(Ordering::Relaxed),
        elapsed: start.elapsed(),
    };
    summary.log("Relation extraction", "Relations kept");
    Ok(summary)
}

/// Harvest (id, type) and (id, doi) tables from every entity shard.
pub fn run_harvest(config: &HarvestConfig, progress: &SharedProgress) -> Result<RunSummary> {
    let start = Instant::now();

    std::fs::create_dir_all(&config.outdir).context("Failed to create output directory")?;
    // stale .tmp files from an interrupted run would shadow new sinks
    citelink_core::sink::cleanup_tmp_files(&config.outdir)
        .context("Failed to clean up temporary files")?;

    let shards: Vec<PathBuf> = discover_shards(&config.datadir, &config.shard_glob)?
        .into_iter()
        .filter(|p| {
            let name = shard_label(p);
            !NON_ENTITY_PREFIXES
                .iter()
                .any(|prefix| name.starts_with(prefix))
        })
        .collect();
    if shards.is_empty() {
        bail!(
            "no entity shards left after skipping non-entity prefixes in {}",
            config.datadir.display()
        );
    }
    let total_shards = shards.len();
    log::info!(
        "Harvesting {} entity shards with {} workers",
        total_shards,
        config.n_jobs
    );

    let rows_counter = AtomicUsize::new(0);
    let completed_counter = AtomicUsize::new(0);
    let failed_counter = AtomicUsize::new(0);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.n_jobs)
        .build()
        .context("Failed to create thread pool")?;

    pool.install(|| {
        shards.par_iter().for_each(|shard| {
            let label = shard_label(shard);
            let pb = progress.shard_bar(&label);
            match harvest_shard(
                shard,
                &config.outdir,
                config.chunk_rows,
                config.zstd_level,
                &pb,
            ) {
                Ok(stats) => {
                    completed_counter.fetch_add(1, Ordering::Relaxed);
                    rows_counter.fetch_add(stats.type_rows, Ordering::Relaxed);
                    if progress.is_tty() {
                        pb.finish_and_clear();
                    } else {
                        stats.log(&label);
                    }
                }
                Err(e) => {
                    failed_counter.fetch_add(1, Ordering::Relaxed);
                    pb.finish_and_clear();
                    log::error!("{label}: {e}");
                }
            }
        });
    });

    let summary = RunSummary {
        total_shards,
        completed: completed_counter.load(Ordering::Relaxed),
        failed: failed_counter.load(Ordering::Relaxed),
        rows: rows_counter.load(Ordering::Relaxed),
        elapsed: start.elapsed(),
    };
    summary.log("Entity harvest", "Entities seen");
    Ok(summary)
}
