//! Single-pass type/DOI harvester over one entity shard.
//!
//! Every decodable record contributes a type row; records with `doi`
//! identifier entries additionally contribute DOI rows. Both buffers are
//! bounded: crossing the row threshold flushes each to its own numbered
//! parquet part and clears it, and end-of-shard flushes the remainder.

use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arrow::array::{RecordBatch, StringArray};
use arrow::datatypes::Schema;
use arrow::error::ArrowError;
use citelink_core::archive::{ArchiveError, ShardArchive};
use citelink_core::part_writer::{next_available_index, part_filename};
use citelink_core::progress::fmt_num;
use citelink_core::records::EntityRecord;
use citelink_core::sink::ParquetSink;
use citelink_core::Accumulator;
use indicatif::ProgressBar;

use crate::schema;

/// Progress update interval (every N lines to avoid overhead)
const UPDATE_INTERVAL: usize = 10_000;

/// Statistics from harvesting a single shard
#[derive(Debug)]
pub struct HarvestStats {
    pub lines_scanned: usize,
    pub parse_errors: usize,
    pub type_rows: usize,
    pub doi_rows: usize,
    pub type_parts: usize,
    pub doi_parts: usize,
    pub members: usize,
    pub members_failed: usize,
    pub elapsed: Duration,
}

impl HarvestStats {
    /// Log stats for non-TTY output
    pub fn log(&self, shard_label: &str) {
        log::info!(
            "{shard_label}: {} type rows, {} doi rows from {} lines ({} decode errors) in {:.1}s",
            self.type_rows,
            self.doi_rows,
            self.lines_scanned,
            self.parse_errors,
            self.elapsed.as_secs_f64()
        );
    }
}

/// Accumulator for type rows; the shard name is fixed per scan.
struct TypesAccumulator {
    shard: String,
    ids: Vec<String>,
    types: Vec<String>,
    members: Vec<String>,
}

impl TypesAccumulator {
    fn new(shard: String) -> Self {
        Self {
            shard,
            ids: Vec::new(),
            types: Vec::new(),
            members: Vec::new(),
        }
    }
}

impl Accumulator for TypesAccumulator {
    type Row = (String, String, String); // (id, type, member)

    fn push(&mut self, (id, entity_type, member): Self::Row) {
        self.ids.push(id);
        self.types.push(entity_type);
        self.members.push(member);
    }

    fn len(&self) -> usize {
        self.ids.len()
    }

    fn take_batch(&mut self) -> Result<RecordBatch, ArrowError> {
        let shard_col: Vec<&str> = std::iter::repeat(self.shard.as_str())
            .take(self.ids.len())
            .collect();
        RecordBatch::try_new(
            schema::types().clone(),
            vec![
                Arc::new(StringArray::from(std::mem::take(&mut self.ids))),
                Arc::new(StringArray::from(std::mem::take(&mut self.types))),
                Arc::new(StringArray::from(shard_col)),
                Arc::new(StringArray::from(std::mem::take(&mut self.members))),
            ],
        )
    }
}

/// Accumulator for (entity, doi) rows.
#[derive(Default)]
struct DoisAccumulator {
    ids: Vec<String>,
    dois: Vec<String>,
}

impl Accumulator for DoisAccumulator {
    type Row = (String, String);

    fn push(&mut self, (id, doi): Self::Row) {
        self.ids.push(id);
        self.dois.push(doi);
    }

    fn len(&self) -> usize {
        self.ids.len()
    }

    fn take_batch(&mut self) -> Result<RecordBatch, ArrowError> {
        RecordBatch::try_new(
            schema::dois().clone(),
            vec![
                Arc::new(StringArray::from(std::mem::take(&mut self.ids))),
                Arc::new(StringArray::from(std::mem::take(&mut self.dois))),
            ],
        )
    }
}

/// Flush one accumulator into its own numbered parquet part, advancing
/// the part index. Empty buffers are left alone.
fn flush_part<A: Accumulator>(
    acc: &mut A,
    outdir: &Path,
    stem: &str,
    label: &str,
    part_schema: &Schema,
    index: &mut usize,
    zstd_level: i32,
) -> io::Result<usize> {
    if acc.is_empty() {
        return Ok(0);
    }
    let rows = acc.len();
    let filename = part_filename(stem, label, *index, "parquet");
    log::debug!("writing {rows} rows to {filename}");
    let mut sink = ParquetSink::new(outdir, &filename, part_schema, zstd_level)?;
    sink.write_batch(&acc.take_batch().map_err(io::Error::other)?)?;
    sink.finalize()?;
    *index += 1;
    Ok(rows)
}

/// Scan one entity shard, writing `<stem>_types_part_NNN.parquet` and
/// `<stem>_dois_part_NNN.parquet` files under `outdir`.
pub fn harvest_shard(
    shard: &Path,
    outdir: &Path,
    chunk_rows: usize,
    zstd_level: i32,
    pb: &ProgressBar,
) -> Result<HarvestStats, ArchiveError> {
    let start = Instant::now();
    let stem = shard
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "shard".to_string());
    let shard_name = shard
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| stem.clone());

    // Part numbering per label, resumed past any earlier run's parts.
    let mut type_idx = next_available_index(outdir, &stem, "types", "parquet")?;
    let mut doi_idx = next_available_index(outdir, &stem, "dois", "parquet")?;
    let first_type_idx = type_idx;
    let first_doi_idx = doi_idx;

    let mut types_acc = TypesAccumulator::new(shard_name);
    let mut dois_acc = DoisAccumulator::default();

    let mut lines_scanned = 0usize;
    let mut parse_errors = 0usize;
    let mut type_rows = 0usize;
    let mut doi_rows = 0usize;

    let archive = ShardArchive::open(shard)?;
    let stats = archive.for_each_line(|member, line| {
        lines_scanned += 1;
        if lines_scanned.is_multiple_of(UPDATE_INTERVAL) {
            pb.set_message(format!(
                "{member}: {} lines, {} dois",
                fmt_num(lines_scanned),
                fmt_num(doi_rows + dois_acc.len())
            ));
        }
        let Some(record) = EntityRecord::decode(line) else {
            parse_errors += 1;
            log::debug!("undecodable entity line in {member} (#{lines_scanned})");
            return Ok(());
        };
        for doi in record.dois() {
            dois_acc.push((record.id.clone(), doi.to_string()));
        }
        types_acc.push((record.id, record.entity_type, member.to_string()));

        // Threshold crossing flushes both streams, as a pair, so the two
        // tables age out of memory together.
        if types_acc.len() >= chunk_rows || dois_acc.len() >= chunk_rows {
            type_rows += flush_part(
                &mut types_acc,
                outdir,
                &stem,
                "types",
                schema::types(),
                &mut type_idx,
                zstd_level,
            )?;
            doi_rows += flush_part(
                &mut dois_acc,
                outdir,
                &stem,
                "dois",
                schema::dois(),
                &mut doi_idx,
                zstd_level,
            )?;
        }
        Ok(())
    })?;

    // End of shard: flush whatever remains.
    type_rows += flush_part(
        &mut types_acc,
        outdir,
        &stem,
        "types",
        schema::types(),
        &mut type_idx,
        zstd_level,
    )?;
    doi_rows += flush_part(
        &mut dois_acc,
        outdir,
        &stem,
        "dois",
        schema::dois(),
        &mut doi_idx,
        zstd_level,
    )?;

    Ok(HarvestStats {
        lines_scanned,
        parse_errors,
        type_rows,
        doi_rows,
        type_parts: type_idx - first_type_idx,
        doi_parts: doi_idx - first_doi_idx,
        members: stats.members,
        members_failed: stats.members_failed,
        elapsed: start.elapsed(),
    })
}
