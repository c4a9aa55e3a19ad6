//! SQL generation for the DOI/corpus join stage.
//!
//! Strategy:
//! - pair facts come from the parquet checkpoint, never re-pivoted here
//! - DOI table is de-duplicated once up front; multiple DOIs per entity
//!   legitimately fan out the identifier table
//! - corpus membership is a semi-join flag, the corpus is never mutated

use std::path::Path;

/// Returns the SQL to create the normalize_doi macro.
pub fn create_normalize_doi_macro() -> &'static str {
    "CREATE OR REPLACE MACRO normalize_doi(d) AS \
     TRIM(REGEXP_REPLACE(LOWER(d), '^https?://(dx\\.)?doi\\.org/', ''))"
}

/// View over the pair-facts checkpoint.
pub fn create_pairs_view(output_dir: &Path) -> String {
    format!(
        "CREATE OR REPLACE VIEW v_pairs AS \
         SELECT * FROM read_parquet('{}/pair_facts.parquet')",
        output_dir.display()
    )
}

/// Distinct (entity, normalized doi) view over the harvested DOI parts.
pub fn create_dois_view(harvest_dir: &Path, file_glob: &str) -> String {
    format!(
        "CREATE OR REPLACE VIEW v_dois AS \
         SELECT DISTINCT openaire_id, normalize_doi(doi) AS doi \
         FROM read_parquet('{}/{file_glob}')",
        harvest_dir.display()
    )
}

/// Distinct corpus DOI-pair view, restricted to rows where both
/// endpoints are real DOIs. Falls back to an empty view when no corpus
/// file was supplied, which makes every membership lookup miss.
pub fn create_corpus_view(corpus_path: Option<&Path>) -> String {
    match corpus_path {
        Some(path) => format!(
            "CREATE OR REPLACE VIEW v_corpus AS \
             SELECT DISTINCT publication AS publication_doi, dataset AS dataset_doi \
             FROM read_parquet('{}') \
             WHERE publication_is_doi AND dataset_is_doi",
            path.display()
        ),
        None => "CREATE OR REPLACE VIEW v_corpus AS \
                 SELECT NULL::VARCHAR AS publication_doi, NULL::VARCHAR AS dataset_doi \
                 WHERE false"
            .to_string(),
    }
}

/// Identifier table: pairs with a DOI on both endpoints, flagged with
/// corpus membership. Pairs missing a DOI on either side drop out here
/// and only here.
pub fn build_relation_identifiers() -> &'static str {
    "CREATE OR REPLACE TEMP TABLE rel_ids AS
     SELECT
       p.source,
       p.target,
       sd.doi AS source_doi,
       td.doi AS target_doi,
       p.source_type,
       p.target_type,
       (c.publication_doi IS NOT NULL) AS in_corpus
     FROM v_pairs p
     JOIN v_dois sd ON p.source = sd.openaire_id
     JOIN v_dois td ON p.target = td.openaire_id
     LEFT JOIN v_corpus c
       ON sd.doi = c.publication_doi
       AND td.doi = c.dataset_doi"
}

/// Relation table: the full pair-fact set, with corpus membership
/// propagated from any matching identifier row.
pub fn build_relations() -> &'static str {
    "CREATE OR REPLACE TEMP TABLE relations AS
     SELECT
       p.*,
       (m.source IS NOT NULL) AS in_corpus
     FROM v_pairs p
     LEFT JOIN (
       SELECT DISTINCT source, target FROM rel_ids WHERE in_corpus
     ) m
       ON p.source = m.source AND p.target = m.target"
}

/// Export the identifier table to parquet.
pub fn export_relation_identifiers(output_dir: &Path) -> String {
    format!(
        "COPY (SELECT * FROM rel_ids) \
         TO '{}/relation_identifiers.parquet' (FORMAT PARQUET, COMPRESSION ZSTD)",
        output_dir.display()
    )
}

/// Export the relation table to parquet.
pub fn export_relations(output_dir: &Path) -> String {
    format!(
        "COPY (SELECT * FROM relations) \
         TO '{}/relations.parquet' (FORMAT PARQUET, COMPRESSION ZSTD)",
        output_dir.display()
    )
}

/// Query to get join summary statistics.
pub fn summary_query() -> &'static str {
    "SELECT
       (SELECT COUNT(*) FROM relations),
       (SELECT COUNT(*) FILTER (WHERE in_corpus) FROM relations),
       (SELECT COUNT(*) FROM rel_ids),
       (SELECT COUNT(*) FILTER (WHERE in_corpus) FROM rel_ids)"
}
