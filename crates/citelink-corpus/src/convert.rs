//! One-shot conversion of the Data Citation Corpus release into parquet.
//!
//! Each release file is a JSON array of citation records. Both citation
//! endpoints are run through the DOI cleaner; values the cleaner rejects
//! are kept as-is and flagged, so downstream joins can restrict to real
//! DOI pairs.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use arrow::array::{BooleanArray, RecordBatch, StringArray, TimestampMillisecondArray};
use arrow::error::ArrowError;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use citelink_core::doi::clean_doi;
use citelink_core::sink::ParquetSink;
use citelink_core::{Accumulator, DEFAULT_BATCH_SIZE};
use serde::Deserialize;

use crate::schema;

/// Configuration for a corpus conversion run.
pub struct CorpusConfig {
    /// Directory holding the corpus release files
    pub corpus_dir: PathBuf,
    /// Glob for release files within `corpus_dir`
    pub file_glob: String,
    /// Output directory for `corpus.parquet`
    pub output_dir: PathBuf,
    /// ZSTD level for the output file
    pub zstd_level: i32,
}

impl CorpusConfig {
    pub fn new(corpus_dir: PathBuf, output_dir: PathBuf) -> Self {
        Self {
            corpus_dir,
            file_glob: "*.json".to_string(),
            output_dir,
            zstd_level: 3,
        }
    }
}

/// Conversion summary
#[derive(Debug)]
pub struct CorpusSummary {
    pub files: usize,
    pub records: usize,
    pub non_doi_publications: usize,
    pub non_doi_datasets: usize,
    pub elapsed: Duration,
}

/// Wrapper objects like `"journal": {"title": "..."}`
#[derive(Debug, Deserialize)]
struct TitleObject {
    title: Option<String>,
}

/// One corpus citation record as shipped in the release files.
#[derive(Debug, Deserialize)]
struct CorpusRecord {
    id: String,
    title: String,
    publisher: Option<TitleObject>,
    journal: Option<TitleObject>,
    repository: Option<TitleObject>,
    publication: String,
    dataset: String,
    #[serde(rename = "publishedDate")]
    published_date: Option<String>,
    source: String,
}

/// Clean a corpus endpoint value. Non-DOIs (accession numbers etc.) are
/// kept verbatim and flagged false.
fn try_clean_doi(raw: &str) -> (String, bool) {
    match clean_doi(raw) {
        Some(doi) => (doi, true),
        None => (raw.to_string(), false),
    }
}

/// Parse the release's `publishedDate` into epoch milliseconds.
fn parse_published_date(raw: &str) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp_millis());
    }
    if let Ok(ndt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(ndt.and_utc().timestamp_millis());
    }
    if let Ok(nd) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(nd.and_hms_opt(0, 0, 0)?.and_utc().timestamp_millis());
    }
    log::warn!("unparseable publishedDate: {raw}");
    None
}

#[derive(Default)]
struct CorpusAccumulator {
    ids: Vec<String>,
    titles: Vec<String>,
    publishers: Vec<Option<String>>,
    journals: Vec<Option<String>>,
    repositories: Vec<Option<String>>,
    publications: Vec<String>,
    datasets: Vec<String>,
    publication_is_doi: Vec<bool>,
    dataset_is_doi: Vec<bool>,
    published_dates: Vec<Option<i64>>,
    sources: Vec<String>,
    non_doi_publications: usize,
    non_doi_datasets: usize,
}

impl Accumulator for CorpusAccumulator {
    type Row = CorpusRecord;

    fn push(&mut self, record: Self::Row) {
        let (publication, publication_is_doi) = try_clean_doi(&record.publication);
        let (dataset, dataset_is_doi) = try_clean_doi(&record.dataset);
        self.non_doi_publications += usize::from(!publication_is_doi);
        self.non_doi_datasets += usize::from(!dataset_is_doi);
        self.ids.push(record.id);
        self.titles.push(record.title);
        self.publishers.push(record.publisher.and_then(|o| o.title));
        self.journals.push(record.journal.and_then(|o| o.title));
        self.repositories.push(record.repository.and_then(|o| o.title));
        self.publications.push(publication);
        self.datasets.push(dataset);
        self.publication_is_doi.push(publication_is_doi);
        self.dataset_is_doi.push(dataset_is_doi);
        self.published_dates
            .push(record.published_date.as_deref().and_then(parse_published_date));
        self.sources.push(record.source);
    }

    fn len(&self) -> usize {
        self.ids.len()
    }

    fn take_batch(&mut self) -> Result<RecordBatch, ArrowError> {
        RecordBatch::try_new(
            schema::corpus().clone(),
            vec![
                Arc::new(StringArray::from(std::mem::take(&mut self.ids))),
                Arc::new(StringArray::from(std::mem::take(&mut self.titles))),
                Arc::new(StringArray::from(std::mem::take(&mut self.publishers))),
                Arc::new(StringArray::from(std::mem::take(&mut self.journals))),
                Arc::new(StringArray::from(std::mem::take(&mut self.repositories))),
                Arc::new(StringArray::from(std::mem::take(&mut self.publications))),
                Arc::new(StringArray::from(std::mem::take(&mut self.datasets))),
                Arc::new(BooleanArray::from(std::mem::take(
                    &mut self.publication_is_doi,
                ))),
                Arc::new(BooleanArray::from(std::mem::take(&mut self.dataset_is_doi))),
                Arc::new(TimestampMillisecondArray::from(std::mem::take(
                    &mut self.published_dates,
                ))),
                Arc::new(StringArray::from(std::mem::take(&mut self.sources))),
            ],
        )
    }
}

/// Convert every corpus release file into a single `corpus.parquet`.
pub fn run_convert(config: &CorpusConfig) -> Result<CorpusSummary> {
    let start = Instant::now();

    std::fs::create_dir_all(&config.output_dir)
        .context("Failed to create output directory")?;

    let pattern = config.corpus_dir.join(&config.file_glob);
    let pattern = pattern.to_string_lossy();
    let mut files: Vec<PathBuf> = glob::glob(&pattern)
        .with_context(|| format!("invalid corpus glob: {pattern}"))?
        .filter_map(|entry| entry.ok())
        .filter(|p| p.is_file())
        .collect();
    files.sort();
    if files.is_empty() {
        bail!("no corpus files match {pattern}");
    }
    log::info!("Converting {} corpus files", files.len());

    let mut sink = ParquetSink::new(
        &config.output_dir,
        "corpus.parquet",
        schema::corpus(),
        config.zstd_level,
    )?;

    let mut acc = CorpusAccumulator::default();
    let mut records = 0usize;

    for file in &files {
        let text = std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read {}", file.display()))?;
        let batch: Vec<CorpusRecord> = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse {}", file.display()))?;
        log::debug!("{}: {} records", file.display(), batch.len());

        for record in batch {
            records += 1;
            acc.push(record);
            if acc.len() >= DEFAULT_BATCH_SIZE {
                sink.write_batch(&acc.take_batch().map_err(std::io::Error::other)?)?;
            }
        }
    }
    if !acc.is_empty() {
        sink.write_batch(&acc.take_batch().map_err(std::io::Error::other)?)?;
    }
    sink.finalize()?;

    let summary = CorpusSummary {
        files: files.len(),
        records,
        non_doi_publications: acc.non_doi_publications,
        non_doi_datasets: acc.non_doi_datasets,
        elapsed: start.elapsed(),
    };
    log::info!("=== Corpus conversion summary ===");
    log::info!("Files: {}", summary.files);
    log::info!(
        "Records: {} ({} non-DOI publications, {} non-DOI datasets)",
        summary.records,
        summary.non_doi_publications,
        summary.non_doi_datasets
    );
    log::info!("Time: {:.1}s", summary.elapsed.as_secs_f64());
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Array, BooleanArray, StringArray};
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use std::fs::File;
    use tempfile::TempDir;

    fn read_all(path: &std::path::Path) -> Vec<RecordBatch> {
        let file = File::open(path).unwrap();
        ParquetRecordBatchReaderBuilder::try_new(file)
            .unwrap()
            .build()
            .unwrap()
            .map(|b| b.unwrap())
            .collect()
    }

    fn string_col<'a>(batch: &'a RecordBatch, name: &str) -> &'a StringArray {
        batch
            .column_by_name(name)
            .unwrap()
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap()
    }

    #[test]
    fn converts_and_flags_non_dois() {
        let dir = TempDir::new().unwrap();
        let corpus_dir = dir.path().join("corpus");
        std::fs::create_dir(&corpus_dir).unwrap();
        std::fs::write(
            corpus_dir.join("release-0.json"),
            r#"[
                {"id":"c1","title":"A study","journal":{"title":"Nature"},
                 "publication":"https://doi.org/10.1/ABC","dataset":"10.5061/dryad.x1",
                 "publishedDate":"2021-06-01","source":"czi"},
                {"id":"c2","title":"Another","repository":{"title":"GEO"},
                 "publication":"10.2/def","dataset":"GSE12345","source":"datacite"}
            ]"#,
        )
        .unwrap();

        let out = dir.path().join("out");
        let config = CorpusConfig::new(corpus_dir, out.clone());
        let summary = run_convert(&config).unwrap();

        assert_eq!(summary.files, 1);
        assert_eq!(summary.records, 2);
        assert_eq!(summary.non_doi_publications, 0);
        assert_eq!(summary.non_doi_datasets, 1);

        let batches = read_all(&out.join("corpus.parquet"));
        assert_eq!(batches.len(), 1);
        let batch = &batches[0];
        assert_eq!(batch.num_rows(), 2);

        // resolver prefix stripped and lowercased by the cleaner
        let publications = string_col(batch, "publication");
        assert_eq!(publications.value(0), "10.1/abc");
        // non-DOI dataset value kept verbatim, flagged false
        let datasets = string_col(batch, "dataset");
        assert_eq!(datasets.value(1), "GSE12345");
        let flags = batch
            .column_by_name("dataset_is_doi")
            .unwrap()
            .as_any()
            .downcast_ref::<BooleanArray>()
            .unwrap();
        assert!(flags.value(0));
        assert!(!flags.value(1));

        let journals = string_col(batch, "journal");
        assert_eq!(journals.value(0), "Nature");
        assert!(journals.is_null(1));
        let repositories = string_col(batch, "repository");
        assert!(repositories.is_null(0));
        assert_eq!(repositories.value(1), "GEO");
    }

    #[test]
    fn missing_corpus_dir_is_named_error() {
        let dir = TempDir::new().unwrap();
        let config = CorpusConfig::new(dir.path().join("nope"), dir.path().join("out"));
        let err = run_convert(&config).unwrap_err();
        assert!(err.to_string().contains("no corpus files match"));
    }

    #[test]
    fn published_date_formats() {
        assert_eq!(parse_published_date("1970-01-01"), Some(0));
        assert_eq!(
            parse_published_date("1970-01-02T00:00:00"),
            Some(86_400_000)
        );
        assert_eq!(
            parse_published_date("1970-01-01T00:00:01Z"),
            Some(1_000)
        );
        assert_eq!(parse_published_date("not a date"), None);
    }

    #[test]
    fn malformed_release_file_is_fatal() {
        let dir = TempDir::new().unwrap();
        let corpus_dir = dir.path().join("corpus");
        std::fs::create_dir(&corpus_dir).unwrap();
        std::fs::write(corpus_dir.join("bad.json"), "{not an array").unwrap();

        let config = CorpusConfig::new(corpus_dir, dir.path().join("out"));
        let err = run_convert(&config).unwrap_err();
        assert!(err.to_string().contains("bad.json"));
    }
}
