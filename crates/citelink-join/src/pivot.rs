//! Pivot sorted relation rows into one fact per unique ordered pair.

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use arrow::array::{Array, StringArray};
use parquet::arrow::ProjectionMask;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::loader::{AggRelType, RelationRow};

/// One aggregated pair with per-type counts and harvested entity types.
#[derive(Debug)]
pub struct PairFact {
    pub source: String,
    pub target: String,
    pub n_cites: u32,
    pub n_references: u32,
    pub n_is_supplemented_by: u32,
    pub source_type: Option<String>,
    pub target_type: Option<String>,
}

impl PairFact {
    fn new(source: String, target: String, type_map: &FxHashMap<String, String>) -> Self {
        let source_type = type_map.get(&source).cloned();
        let target_type = type_map.get(&target).cloned();
        Self {
            source,
            target,
            n_cites: 0,
            n_references: 0,
            n_is_supplemented_by: 0,
            source_type,
            target_type,
        }
    }

    fn bump(&mut self, rel_type: AggRelType) {
        match rel_type {
            AggRelType::Cites => self.n_cites += 1,
            AggRelType::References => self.n_references += 1,
            AggRelType::IsSupplementedBy => self.n_is_supplemented_by += 1,
        }
    }
}

/// Run-scan over rows sorted by (source, target). Consumes the row
/// vector so its memory is released before the join stage allocates.
pub fn pivot(rows: Vec<RelationRow>, type_map: &FxHashMap<String, String>) -> Vec<PairFact> {
    let mut facts: Vec<PairFact> = Vec::new();
    let mut current: Option<PairFact> = None;

    for row in rows {
        match &mut current {
            Some(fact) if fact.source == row.source && fact.target == row.target => {
                fact.bump(row.rel_type);
            }
            _ => {
                if let Some(done) = current.take() {
                    facts.push(done);
                }
                let mut fact = PairFact::new(row.source, row.target, type_map);
                fact.bump(row.rel_type);
                current = Some(fact);
            }
        }
    }
    if let Some(done) = current.take() {
        facts.push(done);
    }
    facts
}

/// Load the entity-type map from harvested type parts, keeping only ids
/// observed in the relation rows. Duplicate ids are last-seen-wins.
/// Zero matching part files leaves every type unknown (warned, not fatal).
pub fn load_type_map(
    harvest_dir: &Path,
    file_glob: &str,
    ids: &FxHashSet<&str>,
) -> Result<FxHashMap<String, String>> {
    let pattern = harvest_dir.join(file_glob);
    let pattern = pattern.to_string_lossy();
    let paths =
        glob::glob(&pattern).with_context(|| format!("invalid type part glob: {pattern}"))?;

    let mut type_map: FxHashMap<String, String> = FxHashMap::default();
    let mut matched_files = 0usize;
    for path in paths.flatten() {
        match read_types_into(&path, ids, &mut type_map) {
            Ok(()) => matched_files += 1,
            Err(e) => log::warn!("failed to read {}: {e}", path.display()),
        }
    }
    if matched_files == 0 {
        log::warn!("no type parts match {pattern}; all entity types will be null");
    }
    log::info!(
        "Type map covers {} of {} observed ids",
        type_map.len(),
        ids.len()
    );
    Ok(type_map)
}

fn read_types_into(
    path: &Path,
    ids: &FxHashSet<&str>,
    type_map: &mut FxHashMap<String, String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let file = File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;

    let schema = builder.schema().clone();
    for col in ["openaire_id", "openaire_type"] {
        if !schema.fields().iter().any(|f| f.name() == col) {
            return Err(format!("no {col} column").into());
        }
    }
    let mask = ProjectionMask::columns(builder.parquet_schema(), ["openaire_id", "openaire_type"]);
    let reader = builder.with_projection(mask).build()?;

    for batch in reader {
        let batch = batch?;
        let id_col = batch
            .column_by_name("openaire_id")
            .and_then(|c| c.as_any().downcast_ref::<StringArray>())
            .ok_or("openaire_id is not a string column")?;
        let type_col = batch
            .column_by_name("openaire_type")
            .and_then(|c| c.as_any().downcast_ref::<StringArray>())
            .ok_or("openaire_type is not a string column")?;
        for i in 0..id_col.len() {
            let id = id_col.value(i);
            if ids.contains(id) {
                type_map.insert(id.to_string(), type_col.value(i).to_string());
            }
        }
    }
    Ok(())
}
