//! Citelink Core - Common infrastructure for OpenAIRE graph pipelines
//!
//! This crate provides reusable components for scanning sharded graph
//! dumps, filtering and re-encoding records, and writing rotating or
//! columnar output parts.

pub mod accumulator;
pub mod archive;
pub mod doi;
pub mod filter;
pub mod logging;
pub mod part_writer;
pub mod progress;
pub mod records;
pub mod sink;

// Re-exports for convenience
pub use accumulator::{Accumulator, DEFAULT_BATCH_SIZE};
pub use archive::{ArchiveError, ArchiveStats, ShardArchive};
pub use doi::clean_doi;
pub use filter::{IdFilterSet, collect_ids_from_parquet, save_id_filter};
pub use logging::init_logging;
pub use part_writer::{PartWriter, next_available_index, part_filename};
pub use progress::{ProgressContext, SharedProgress, fmt_num};
pub use records::{
    AGGREGATE_REL_TYPES, EXTRACT_REL_TYPES, EntityRecord, RelationProbe, RelationRecord,
};
pub use sink::{ParquetSink, cleanup_tmp_files, is_valid_parquet};
