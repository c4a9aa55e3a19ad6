use std::io::Write;
use std::path::Path;

use duckdb::Connection;
use tempfile::TempDir;

/// Write one gzipped relation part with the given JSON lines.
fn write_relation_part(dir: &Path, filename: &str, lines: &[&str]) {
    std::fs::create_dir_all(dir).unwrap();
    let file = std::fs::File::create(dir.join(filename)).unwrap();
    let mut enc = flate2::write::GzEncoder::new(file, flate2::Compression::default());
    for line in lines {
        enc.write_all(line.as_bytes()).unwrap();
        enc.write_all(b"\n").unwrap();
    }
    enc.finish().unwrap();
}

/// Write a parquet file from VALUES SQL using DuckDB.
fn write_parquet(conn: &Connection, dir: &Path, filename: &str, cols: &str, values: &str) {
    std::fs::create_dir_all(dir).unwrap();
    conn.execute_batch(&format!(
        "COPY (SELECT * FROM (VALUES {values}) AS t({cols})) \
         TO '{}/{filename}' (FORMAT PARQUET)",
        dir.display()
    ))
    .unwrap();
}

/// Write an empty parquet file with the given typed columns.
fn write_empty_parquet(conn: &Connection, dir: &Path, filename: &str, cols_ddl: &str) {
    std::fs::create_dir_all(dir).unwrap();
    conn.execute_batch(&format!(
        "COPY (SELECT {cols_ddl} WHERE false) \
         TO '{}/{filename}' (FORMAT PARQUET)",
        dir.display()
    ))
    .unwrap();
}

fn rel(name: &str, source: &str, target: &str) -> String {
    format!(r#"{{"relType":{{"name":"{name}"}},"source":"{source}","target":"{target}"}}"#)
}

#[test]
fn test_end_to_end_aggregation() {
    let _ = env_logger::builder().is_test(true).try_init();

    let tmp = TempDir::new().unwrap();
    let relations_dir = tmp.path().join("relations");
    let harvest_dir = tmp.path().join("harvest");
    let corpus_dir = tmp.path().join("corpus");
    let conn = Connection::open_in_memory().unwrap();

    // Two parts, together:
    //   (A,B): Cites x2, References x1, first line carries provenance
    //   (X1,Y1): Cites x1
    //   one IsCitedBy line that extraction kept but aggregation drops
    write_relation_part(
        &relations_dir,
        "relation_00_relations_part_000.gz",
        &[
            r#"{"relType":{"name":"Cites"},"source":"A","target":"B","provenance":{"provenance":"harvested","trust":"0.9"},"validated":true}"#,
            &rel("References", "A", "B"),
            &rel("IsCitedBy", "B", "A"),
        ],
    );
    write_relation_part(
        &relations_dir,
        "relation_01_relations_part_000.gz",
        &[&rel("Cites", "A", "B"), &rel("Cites", "X1", "Y1")],
    );

    write_parquet(
        &conn,
        &harvest_dir,
        "publication_00_types_part_000.parquet",
        "openaire_id, openaire_type, origin_shard, origin_member",
        "('A', 'publication', 'publication_00.tar', 'm0'), \
         ('X1', 'publication', 'publication_00.tar', 'm0')",
    );
    write_parquet(
        &conn,
        &harvest_dir,
        "dataset_00_types_part_000.parquet",
        "openaire_id, openaire_type, origin_shard, origin_member",
        "('B', 'dataset', 'dataset_00.tar', 'm0'), \
         ('Y1', 'dataset', 'dataset_00.tar', 'm0')",
    );
    // Y1 has no DOI; A's DOI needs prefix and case normalization
    write_parquet(
        &conn,
        &harvest_dir,
        "publication_00_dois_part_000.parquet",
        "openaire_id, doi",
        "('A', 'https://doi.org/10.1/AAA'), ('X1', '10.1/abc')",
    );
    write_parquet(
        &conn,
        &harvest_dir,
        "dataset_00_dois_part_000.parquet",
        "openaire_id, doi",
        "('B', '10.2/bbb')",
    );
    // One matching corpus pair, plus a row whose dataset id is not a DOI
    // and therefore must not participate in membership
    write_parquet(
        &conn,
        &corpus_dir,
        "corpus.parquet",
        "publication, dataset, publication_is_doi, dataset_is_doi",
        "('10.1/aaa', '10.2/bbb', true, true), \
         ('10.1/abc', 'GSE12345', true, false)",
    );

    let output_dir = tmp.path().join("output");
    let mut config = citelink_join::JoinConfig::new(
        relations_dir,
        harvest_dir,
        output_dir.clone(),
    );
    config.corpus_path = Some(corpus_dir.join("corpus.parquet"));
    config.memory_limit = "256MB".to_string();

    let summary = citelink_join::run(&config).unwrap();

    assert_eq!(summary.pairs, 2, "two unique pairs");
    assert_eq!(summary.pairs_in_corpus, 1);
    assert_eq!(
        summary.identifier_rows, 1,
        "Y1 has no DOI so (X1,Y1) drops from the identifier table"
    );
    assert_eq!(summary.identifier_rows_in_corpus, 1);
    assert_eq!(summary.provenance_rows, 2);
    assert_eq!(summary.decode_errors, 0);

    assert!(output_dir.join("relations.parquet").exists());
    assert!(output_dir.join("relation_identifiers.parquet").exists());
    assert!(output_dir.join("provenance.parquet").exists());
    assert!(output_dir.join("pair_facts.parquet").exists());

    let verify = Connection::open_in_memory().unwrap();

    // (A,B): counts pivoted per type, corpus hit
    let (n_cites, n_refs, n_supp, src_type, tgt_type, in_corpus): (
        i64,
        i64,
        i64,
        String,
        String,
        bool,
    ) = verify
        .query_row(
            &format!(
                "SELECT n_cites, n_references, n_is_supplemented_by, \
                        source_type, target_type, in_corpus \
                 FROM read_parquet('{}/relations.parquet') \
                 WHERE source = 'A' AND target = 'B'",
                output_dir.display()
            ),
            [],
            |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                ))
            },
        )
        .unwrap();
    assert_eq!(n_cites, 2);
    assert_eq!(n_refs, 1);
    assert_eq!(n_supp, 0);
    assert_eq!(src_type, "publication");
    assert_eq!(tgt_type, "dataset");
    assert!(in_corpus);

    // (X1,Y1) survives in relations despite missing DOI, not in corpus
    let in_corpus: bool = verify
        .query_row(
            &format!(
                "SELECT in_corpus FROM read_parquet('{}/relations.parquet') \
                 WHERE source = 'X1' AND target = 'Y1'",
                output_dir.display()
            ),
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert!(!in_corpus);

    // identifier row carries the normalized DOI pair
    let (source_doi, target_doi): (String, String) = verify
        .query_row(
            &format!(
                "SELECT source_doi, target_doi \
                 FROM read_parquet('{}/relation_identifiers.parquet')",
                output_dir.display()
            ),
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(source_doi, "10.1/aaa");
    assert_eq!(target_doi, "10.2/bbb");

    // provenance side table: first occurrence for (A,B), nulls for (X1,Y1)
    let (prov, trust, validated): (String, f64, bool) = verify
        .query_row(
            &format!(
                "SELECT provenance, trust, validated \
                 FROM read_parquet('{}/provenance.parquet') \
                 WHERE source = 'A' AND target = 'B'",
                output_dir.display()
            ),
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .unwrap();
    assert_eq!(prov, "harvested");
    assert_eq!(trust, 0.9);
    assert!(validated);
}

/// Joining against a present-but-empty DOI table yields zero identifier
/// rows and all-false corpus membership.
#[test]
fn test_empty_doi_table() {
    let _ = env_logger::builder().is_test(true).try_init();

    let tmp = TempDir::new().unwrap();
    let relations_dir = tmp.path().join("relations");
    let harvest_dir = tmp.path().join("harvest");
    let conn = Connection::open_in_memory().unwrap();

    write_relation_part(
        &relations_dir,
        "relation_00_relations_part_000.gz",
        &[&rel("Cites", "A", "B")],
    );
    write_empty_parquet(
        &conn,
        &harvest_dir,
        "publication_00_dois_part_000.parquet",
        "NULL::VARCHAR AS openaire_id, NULL::VARCHAR AS doi",
    );

    let output_dir = tmp.path().join("output");
    let mut config =
        citelink_join::JoinConfig::new(relations_dir, harvest_dir, output_dir.clone());
    config.memory_limit = "256MB".to_string();

    let summary = citelink_join::run(&config).unwrap();
    assert_eq!(summary.pairs, 1);
    assert_eq!(summary.identifier_rows, 0);
    assert_eq!(summary.pairs_in_corpus, 0);

    let verify = Connection::open_in_memory().unwrap();
    let in_corpus: bool = verify
        .query_row(
            &format!(
                "SELECT in_corpus FROM read_parquet('{}/relations.parquet')",
                output_dir.display()
            ),
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert!(!in_corpus);
    // types were never harvested either: both entity types are null
    let null_types: i64 = verify
        .query_row(
            &format!(
                "SELECT COUNT(*) FROM read_parquet('{}/relations.parquet') \
                 WHERE source_type IS NULL AND target_type IS NULL",
                output_dir.display()
            ),
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(null_types, 1);
}

/// Multiple DOIs on one endpoint fan out the identifier table but never
/// the relation table.
#[test]
fn test_multiple_dois_fan_out() {
    let _ = env_logger::builder().is_test(true).try_init();

    let tmp = TempDir::new().unwrap();
    let relations_dir = tmp.path().join("relations");
    let harvest_dir = tmp.path().join("harvest");
    let conn = Connection::open_in_memory().unwrap();

    write_relation_part(
        &relations_dir,
        "relation_00_relations_part_000.gz",
        &[&rel("Cites", "A", "B")],
    );
    write_parquet(
        &conn,
        &harvest_dir,
        "publication_00_dois_part_000.parquet",
        "openaire_id, doi",
        "('A', '10.1/a1'), ('A', '10.1/a2'), ('B', '10.2/b')",
    );

    let output_dir = tmp.path().join("output");
    let mut config =
        citelink_join::JoinConfig::new(relations_dir, harvest_dir, output_dir.clone());
    config.memory_limit = "256MB".to_string();

    let summary = citelink_join::run(&config).unwrap();
    assert_eq!(summary.pairs, 1, "fan-out must not multiply relations");
    assert_eq!(summary.identifier_rows, 2);
}

/// No DOI part files at all is a configuration error, not an empty join.
#[test]
fn test_missing_doi_parts_is_error() {
    let _ = env_logger::builder().is_test(true).try_init();

    let tmp = TempDir::new().unwrap();
    let relations_dir = tmp.path().join("relations");
    let harvest_dir = tmp.path().join("harvest");
    std::fs::create_dir_all(&harvest_dir).unwrap();

    write_relation_part(
        &relations_dir,
        "relation_00_relations_part_000.gz",
        &[&rel("Cites", "A", "B")],
    );

    let mut config = citelink_join::JoinConfig::new(
        relations_dir,
        harvest_dir,
        tmp.path().join("output"),
    );
    config.memory_limit = "256MB".to_string();

    let err = citelink_join::run(&config).unwrap_err();
    assert!(format!("{err:#}").contains("no DOI parts match"));
}

/// Without a corpus file every membership lookup misses.
#[test]
fn test_no_corpus_all_false() {
    let _ = env_logger::builder().is_test(true).try_init();

    let tmp = TempDir::new().unwrap();
    let relations_dir = tmp.path().join("relations");
    let harvest_dir = tmp.path().join("harvest");
    let conn = Connection::open_in_memory().unwrap();

    write_relation_part(
        &relations_dir,
        "relation_00_relations_part_000.gz",
        &[&rel("Cites", "A", "B")],
    );
    write_parquet(
        &conn,
        &harvest_dir,
        "publication_00_dois_part_000.parquet",
        "openaire_id, doi",
        "('A', '10.1/a'), ('B', '10.2/b')",
    );

    let output_dir = tmp.path().join("output");
    let mut config =
        citelink_join::JoinConfig::new(relations_dir, harvest_dir, output_dir.clone());
    config.memory_limit = "256MB".to_string();

    let summary = citelink_join::run(&config).unwrap();
    assert_eq!(summary.identifier_rows, 1);
    assert_eq!(summary.identifier_rows_in_corpus, 0);
    assert_eq!(summary.pairs_in_corpus, 0);
}
