use std::path::PathBuf;

/// Configuration for the aggregation pipeline.
pub struct JoinConfig {
    /// Directory containing extracted relation parts (*_relations_part_*.gz)
    pub relations_dir: PathBuf,
    /// Directory containing harvested parquet parts (*_types_part_*.parquet,
    /// *_dois_part_*.parquet)
    pub harvest_dir: PathBuf,
    /// Converted corpus parquet; when absent every pair gets in_corpus=false
    pub corpus_path: Option<PathBuf>,
    /// Output directory for the three result tables
    pub output_dir: PathBuf,
    /// DuckDB memory limit (e.g. "8GB")
    pub memory_limit: String,
    /// ZSTD level for the checkpoint parquet files
    pub zstd_level: i32,
}

impl JoinConfig {
    pub fn new(relations_dir: PathBuf, harvest_dir: PathBuf, output_dir: PathBuf) -> Self {
        Self {
            relations_dir,
            harvest_dir,
            corpus_path: None,
            output_dir,
            memory_limit: "8GB".to_string(),
            zstd_level: 3,
        }
    }
}
