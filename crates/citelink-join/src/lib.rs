//! citelink-join: relation aggregation and DOI/corpus join
//!
//! Three stages over the extracted and harvested data: load the relation
//! parts back (narrowed and sorted), pivot them into per-pair counts,
//! then join against the DOI table and the citation corpus in DuckDB,
//! exporting relations.parquet, relation_identifiers.parquet and
//! provenance.parquet.

mod checkpoint;
mod config;
mod loader;
mod pivot;
mod schema;
mod sql;

pub use config::JoinConfig;

use anyhow::{Context, Result, bail};
use duckdb::Connection;
use rustc_hash::FxHashSet;

use crate::loader::LoadedRelations;

/// Glob for extracted relation parts under the relations directory.
pub const RELATION_PARTS_GLOB: &str = "*_relations_part_*.gz";
/// Glob for harvested type parts under the harvest directory.
pub const TYPE_PARTS_GLOB: &str = "*_types_part_*.parquet";
/// Glob for harvested DOI parts under the harvest directory.
pub const DOI_PARTS_GLOB: &str = "*_dois_part_*.parquet";

/// Summary statistics from the aggregation pipeline.
#[derive(Debug)]
pub struct JoinSummary {
    pub pairs: u64,
    pub pairs_in_corpus: u64,
    pub identifier_rows: u64,
    pub identifier_rows_in_corpus: u64,
    pub provenance_rows: usize,
    pub decode_errors: usize,
}

/// Run the aggregation pipeline.
pub fn run(config: &JoinConfig) -> Result<JoinSummary> {
    std::fs::create_dir_all(&config.output_dir).with_context(|| {
        format!(
            "Failed to create output dir: {}",
            config.output_dir.display()
        )
    })?;

    // Stage 1: load extracted relation parts, narrowed and sorted
    log::info!(
        "Stage 1/3: loading relation parts from {}",
        config.relations_dir.display()
    );
    let LoadedRelations {
        rows,
        provenance,
        decode_errors,
        ..
    } = loader::load_relations(&config.relations_dir, RELATION_PARTS_GLOB)?;
    let provenance_rows = provenance.len();
    checkpoint::write_provenance(provenance, &config.output_dir, config.zstd_level)
        .context("Failed to write provenance.parquet")?;

    // Stage 2: pivot into pair facts, annotated with harvested types
    log::info!("Stage 2/3: pivoting {} relations", rows.len());
    let type_map = {
        let mut ids: FxHashSet<&str> = FxHashSet::default();
        for row in &rows {
            ids.insert(row.source.as_str());
            ids.insert(row.target.as_str());
        }
        pivot::load_type_map(&config.harvest_dir, TYPE_PARTS_GLOB, &ids)?
    };
    // rows is consumed here so the raw relation memory is gone before
    // DuckDB allocates its working set
    let facts = pivot::pivot(rows, &type_map);
    drop(type_map);
    log::info!("Pivoted into {} unique pairs", facts.len());
    checkpoint::write_pair_facts(facts, &config.output_dir, config.zstd_level)
        .context("Failed to write pair_facts.parquet")?;

    // Stage 3: DOI and corpus joins in DuckDB
    log::info!("Stage 3/3: joining against DOIs and corpus");
    let doi_pattern = config.harvest_dir.join(DOI_PARTS_GLOB);
    let doi_pattern = doi_pattern.to_string_lossy().into_owned();
    let has_doi_parts = glob::glob(&doi_pattern)
        .with_context(|| format!("invalid DOI part glob: {doi_pattern}"))?
        .next()
        .is_some();
    if !has_doi_parts {
        bail!("no DOI parts match {doi_pattern}");
    }
    if let Some(path) = &config.corpus_path {
        if !citelink_core::is_valid_parquet(path) {
            bail!("corpus file missing or not parquet: {}", path.display());
        }
        log::info!("Corpus membership from {}", path.display());
    } else {
        log::info!("No corpus supplied; in_corpus will be false throughout");
    }

    let conn =
        Connection::open_in_memory().context("Failed to open DuckDB in-memory connection")?;
    conn.execute_batch(&format!(
        "SET memory_limit = '{}';
         SET temp_directory = '/tmp/duckdb_citelink';
         SET threads = {};",
        config.memory_limit,
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(8),
    ))
    .context("Failed to configure DuckDB")?;

    conn.execute_batch(sql::create_normalize_doi_macro())
        .context("Failed to create normalize_doi macro")?;
    for stmt in [
        sql::create_pairs_view(&config.output_dir),
        sql::create_dois_view(&config.harvest_dir, DOI_PARTS_GLOB),
        sql::create_corpus_view(config.corpus_path.as_deref()),
    ] {
        conn.execute_batch(&stmt)
            .with_context(|| format!("Failed to create view: {stmt}"))?;
    }

    conn.execute_batch(sql::build_relation_identifiers())
        .context("Failed: DOI join")?;
    conn.execute_batch(sql::build_relations())
        .context("Failed: corpus membership propagation")?;

    let summary = conn
        .query_row(sql::summary_query(), [], |row| {
            Ok(JoinSummary {
                pairs: row.get::<_, i64>(0)? as u64,
                pairs_in_corpus: row.get::<_, i64>(1)? as u64,
                identifier_rows: row.get::<_, i64>(2)? as u64,
                identifier_rows_in_corpus: row.get::<_, i64>(3)? as u64,
                provenance_rows,
                decode_errors,
            })
        })
        .context("Failed to query join summary")?;

    log::info!(
        "Join complete: {} pairs ({} in corpus), {} identifier rows ({} in corpus)",
        summary.pairs,
        summary.pairs_in_corpus,
        summary.identifier_rows,
        summary.identifier_rows_in_corpus,
    );

    log::info!("Exporting relations.parquet");
    conn.execute_batch(&sql::export_relations(&config.output_dir))
        .context("Failed to export relations.parquet")?;
    log::info!("Exporting relation_identifiers.parquet");
    conn.execute_batch(&sql::export_relation_identifiers(&config.output_dir))
        .context("Failed to export relation_identifiers.parquet")?;

    log::info!("Done. Output: {}", config.output_dir.display());
    Ok(summary)
}
