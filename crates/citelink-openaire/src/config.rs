//! Run configuration for the extraction and harvest stages

use std::path::PathBuf;

use citelink_core::part_writer::DEFAULT_MAX_PART_BYTES;

/// Entity-shard filename prefixes that carry no entity records and are
/// skipped by the harvester (the relation shards have their own stage).
pub const NON_ENTITY_PREFIXES: [&str; 5] = [
    "communities_infrastructures",
    "datasource",
    "organization",
    "project",
    "relation",
];

/// Default buffered rows before the harvester flushes a parquet part.
pub const DEFAULT_CHUNK_ROWS: usize = 10_000_000;

/// Configuration for a relation-extraction run.
pub struct ExtractConfig {
    /// Directory searched (recursively) for relation shard files
    pub datadir: PathBuf,
    /// Glob for relation shards within `datadir`
    pub shard_glob: String,
    /// Output directory for gzip part files
    pub outdir: PathBuf,
    /// Newline-delimited file of target-class entity ids
    pub ids_file: PathBuf,
    /// Worker pool size (1 = sequential)
    pub n_jobs: usize,
    /// Uncompressed-byte budget per output part
    pub max_part_bytes: u64,
}

impl ExtractConfig {
    pub fn new(datadir: PathBuf, outdir: PathBuf, ids_file: PathBuf) -> Self {
        Self {
            datadir,
            shard_glob: "relation_*.tar".to_string(),
            outdir,
            ids_file,
            n_jobs: 1,
            max_part_bytes: DEFAULT_MAX_PART_BYTES,
        }
    }
}

/// Configuration for a type/DOI harvest run.
pub struct HarvestConfig {
    /// Directory searched for entity shard files
    pub datadir: PathBuf,
    /// Glob for entity shards within `datadir`
    pub shard_glob: String,
    /// Output directory for parquet part files
    pub outdir: PathBuf,
    /// Buffered rows before a part flush
    pub chunk_rows: usize,
    /// Worker pool size (1 = sequential)
    pub n_jobs: usize,
    /// ZSTD level for parquet parts
    pub zstd_level: i32,
}

impl HarvestConfig {
    pub fn new(datadir: PathBuf, outdir: PathBuf) -> Self {
        Self {
            datadir,
            shard_glob: "*.tar".to_string(),
            outdir,
            chunk_rows: DEFAULT_CHUNK_ROWS,
            n_jobs: 1,
            zstd_level: 3,
        }
    }
}
