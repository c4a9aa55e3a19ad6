//! OpenAIRE graph dump processing: per-shard relation extraction and
//! type/DOI harvesting, fanned out over a bounded worker pool.

pub mod config;
pub mod extract;
pub mod harvest;
pub mod runner;
pub mod schema;

pub use config::{ExtractConfig, HarvestConfig};
pub use runner::{RunSummary, run_extract, run_harvest};
