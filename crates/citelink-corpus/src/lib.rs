//! Data Citation Corpus release files (JSON arrays) to a single parquet
//! table, with both citation endpoints run through the DOI cleaner.

pub mod convert;
pub mod schema;

pub use convert::{CorpusConfig, CorpusSummary, run_convert};
