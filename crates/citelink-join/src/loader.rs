//! Load extracted relation parts back into memory for aggregation.
//!
//! Narrows to the aggregation relation types, sorts by (source, target)
//! so the pivot can run-scan, and splits provenance off into its own
//! row set (one row per pair, first occurrence wins).

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use citelink_core::records::RelationRecord;
use flate2::read::GzDecoder;
use rustc_hash::FxHashSet;

/// Relation types that survive the narrowing to aggregation scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggRelType {
    Cites,
    References,
    IsSupplementedBy,
}

impl AggRelType {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "Cites" => Some(Self::Cites),
            "References" => Some(Self::References),
            "IsSupplementedBy" => Some(Self::IsSupplementedBy),
            _ => None,
        }
    }
}

/// One narrowed relation occurrence.
pub struct RelationRow {
    pub source: String,
    pub target: String,
    pub rel_type: AggRelType,
}

/// Provenance side-table row, one per unique pair.
pub struct ProvenanceRow {
    pub source: String,
    pub target: String,
    pub provenance: Option<String>,
    pub trust: Option<f64>,
    pub validated: Option<bool>,
}

pub struct LoadedRelations {
    /// Sorted by (source, target)
    pub rows: Vec<RelationRow>,
    /// Sorted by (source, target), one row per pair
    pub provenance: Vec<ProvenanceRow>,
    pub files: usize,
    pub lines_read: usize,
    pub decode_errors: usize,
}

/// Read every part matching `file_glob` under `relations_dir`.
/// Zero matching files is a fatal error naming the pattern.
pub fn load_relations(relations_dir: &Path, file_glob: &str) -> Result<LoadedRelations> {
    let pattern = relations_dir.join(file_glob);
    let pattern = pattern.to_string_lossy();
    let mut files: Vec<PathBuf> = glob::glob(&pattern)
        .with_context(|| format!("invalid relation part glob: {pattern}"))?
        .filter_map(|entry| entry.ok())
        .filter(|p| p.is_file())
        .collect();
    files.sort();
    if files.is_empty() {
        bail!("no relation parts match {pattern}");
    }

    let mut rows = Vec::new();
    let mut provenance = Vec::new();
    let mut seen_pairs: FxHashSet<(String, String)> = FxHashSet::default();
    let mut lines_read = 0usize;
    let mut decode_errors = 0usize;

    for file in &files {
        let reader = File::open(file)
            .map(|f| BufReader::new(GzDecoder::new(f)))
            .with_context(|| format!("Failed to open {}", file.display()))?;
        for line in reader.lines() {
            let line = line.with_context(|| format!("Failed to read {}", file.display()))?;
            if line.is_empty() {
                continue;
            }
            lines_read += 1;
            let Some(record) = RelationRecord::decode(&line) else {
                decode_errors += 1;
                continue;
            };
            let Some(rel_type) = AggRelType::from_name(&record.rel_type.name) else {
                continue;
            };
            let pair = (record.source.clone(), record.target.clone());
            if seen_pairs.insert(pair) {
                provenance.push(ProvenanceRow {
                    source: record.source.clone(),
                    target: record.target.clone(),
                    provenance: record.provenance.as_ref().map(|p| p.provenance.clone()),
                    trust: record.provenance.as_ref().and_then(|p| p.trust),
                    validated: record.validated,
                });
            }
            rows.push(RelationRow {
                source: record.source,
                target: record.target,
                rel_type,
            });
        }
    }

    rows.sort_unstable_by(|a, b| {
        a.source
            .cmp(&b.source)
            .then_with(|| a.target.cmp(&b.target))
    });
    provenance.sort_unstable_by(|a, b| {
        a.source
            .cmp(&b.source)
            .then_with(|| a.target.cmp(&b.target))
    });

    log::info!(
        "Loaded {} relations ({} pairs with provenance, {} decode errors) from {} parts",
        rows.len(),
        provenance.len(),
        decode_errors,
        files.len()
    );
    Ok(LoadedRelations {
        rows,
        provenance,
        files: files.len(),
        lines_read,
        decode_errors,
    })
}
