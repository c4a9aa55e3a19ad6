//! Parquet checkpoints bridging the in-memory aggregation and DuckDB.

use std::io;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{BooleanArray, Float64Array, RecordBatch, StringArray, UInt32Array};
use arrow::error::ArrowError;
use citelink_core::sink::ParquetSink;
use citelink_core::{Accumulator, DEFAULT_BATCH_SIZE};

use crate::loader::ProvenanceRow;
use crate::pivot::PairFact;
use crate::schema;

#[derive(Default)]
struct PairFactsAccumulator {
    sources: Vec<String>,
    targets: Vec<String>,
    n_cites: Vec<u32>,
    n_references: Vec<u32>,
    n_is_supplemented_by: Vec<u32>,
    source_types: Vec<Option<String>>,
    target_types: Vec<Option<String>>,
}

impl Accumulator for PairFactsAccumulator {
    type Row = PairFact;

    fn push(&mut self, fact: Self::Row) {
        self.sources.push(fact.source);
        self.targets.push(fact.target);
        self.n_cites.push(fact.n_cites);
        self.n_references.push(fact.n_references);
        self.n_is_supplemented_by.push(fact.n_is_supplemented_by);
        self.source_types.push(fact.source_type);
        self.target_types.push(fact.target_type);
    }

    fn len(&self) -> usize {
        self.sources.len()
    }

    fn take_batch(&mut self) -> Result<RecordBatch, ArrowError> {
        RecordBatch::try_new(
            schema::pair_facts().clone(),
            vec![
                Arc::new(StringArray::from(std::mem::take(&mut self.sources))),
                Arc::new(StringArray::from(std::mem::take(&mut self.targets))),
                Arc::new(UInt32Array::from(std::mem::take(&mut self.n_cites))),
                Arc::new(UInt32Array::from(std::mem::take(&mut self.n_references))),
                Arc::new(UInt32Array::from(std::mem::take(
                    &mut self.n_is_supplemented_by,
                ))),
                Arc::new(StringArray::from(std::mem::take(&mut self.source_types))),
                Arc::new(StringArray::from(std::mem::take(&mut self.target_types))),
            ],
        )
    }
}

#[derive(Default)]
struct ProvenanceAccumulator {
    sources: Vec<String>,
    targets: Vec<String>,
    provenances: Vec<Option<String>>,
    trusts: Vec<Option<f64>>,
    validated: Vec<Option<bool>>,
}

impl Accumulator for ProvenanceAccumulator {
    type Row = ProvenanceRow;

    fn push(&mut self, row: Self::Row) {
        self.sources.push(row.source);
        self.targets.push(row.target);
        self.provenances.push(row.provenance);
        self.trusts.push(row.trust);
        self.validated.push(row.validated);
    }

    fn len(&self) -> usize {
        self.sources.len()
    }

    fn take_batch(&mut self) -> Result<RecordBatch, ArrowError> {
        RecordBatch::try_new(
            schema::provenance().clone(),
            vec![
                Arc::new(StringArray::from(std::mem::take(&mut self.sources))),
                Arc::new(StringArray::from(std::mem::take(&mut self.targets))),
                Arc::new(StringArray::from(std::mem::take(&mut self.provenances))),
                Arc::new(Float64Array::from(std::mem::take(&mut self.trusts))),
                Arc::new(BooleanArray::from(std::mem::take(&mut self.validated))),
            ],
        )
    }
}

/// Write rows through `acc` into `filename`, replacing any earlier run's
/// file. Checkpoints are rebuilt every run, unlike the harvest parts.
fn write_rows<A: Accumulator>(
    mut acc: A,
    rows: impl IntoIterator<Item = A::Row>,
    output_dir: &Path,
    filename: &str,
    schema: &arrow::datatypes::Schema,
    zstd_level: i32,
) -> io::Result<()> {
    let final_path = output_dir.join(filename);
    if final_path.exists() {
        log::debug!("replacing stale {}", final_path.display());
        std::fs::remove_file(&final_path)?;
    }

    let mut sink = ParquetSink::new(output_dir, filename, schema, zstd_level)?;
    for row in rows {
        acc.push(row);
        if acc.len() >= DEFAULT_BATCH_SIZE {
            sink.write_batch(&acc.take_batch().map_err(io::Error::other)?)?;
        }
    }
    if !acc.is_empty() {
        sink.write_batch(&acc.take_batch().map_err(io::Error::other)?)?;
    }
    sink.finalize()?;
    Ok(())
}

/// Checkpoint the pivoted pair facts as `pair_facts.parquet`.
pub fn write_pair_facts(
    facts: Vec<PairFact>,
    output_dir: &Path,
    zstd_level: i32,
) -> io::Result<()> {
    write_rows(
        PairFactsAccumulator::default(),
        facts,
        output_dir,
        "pair_facts.parquet",
        schema::pair_facts(),
        zstd_level,
    )
}

/// Write the provenance side table as `provenance.parquet`.
pub fn write_provenance(
    rows: Vec<ProvenanceRow>,
    output_dir: &Path,
    zstd_level: i32,
) -> io::Result<()> {
    write_rows(
        ProvenanceAccumulator::default(),
        rows,
        output_dir,
        "provenance.parquet",
        schema::provenance(),
        zstd_level,
    )
}
