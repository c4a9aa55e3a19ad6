//! Target-class id filter set: loaded once per run, read-only thereafter,
//! shared across extraction workers.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use rustc_hash::FxHashSet;

/// O(1) entity-id lookup using `FxHashSet`.
#[derive(Debug, Default)]
pub struct IdFilterSet {
    set: FxHashSet<String>,
}

impl IdFilterSet {
    /// Load newline-delimited entity ids. Blank lines are ignored.
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let mut set = FxHashSet::default();
        for line in reader.lines() {
            let line = line?;
            let id = line.trim();
            if !id.is_empty() {
                set.insert(id.to_string());
            }
        }
        log::info!("loaded {} ids from {}", set.len(), path.display());
        Ok(Self { set })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.set.contains(id)
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }
}

impl FromIterator<String> for IdFilterSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            set: iter.into_iter().collect(),
        }
    }
}

/// Save entity ids as newline-delimited text.
///
/// Takes `&mut Vec` (not `&[String]`) to encapsulate the sort+dedup
/// invariant — callers need not remember to pre-sort.
pub fn save_id_filter(ids: &mut Vec<String>, path: &Path) -> std::io::Result<()> {
    ids.sort_unstable();
    ids.dedup();
    let mut writer = BufWriter::new(File::create(path)?);
    for id in ids.iter() {
        writer.write_all(id.as_bytes())?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    log::info!("saved {} ids to {}", ids.len(), path.display());
    Ok(())
}

/// Collect the ids of one entity class from harvested type parts.
///
/// Scans every parquet file matching `<dir>/<glob_pattern>`, reading only
/// the id and type columns, and keeps ids whose type equals
/// `entity_type`. Unreadable part files are logged and skipped.
pub fn collect_ids_from_parquet(
    dir: &Path,
    glob_pattern: &str,
    entity_type: &str,
) -> std::io::Result<Vec<String>> {
    let pattern = dir.join(glob_pattern).to_string_lossy().into_owned();
    let paths = glob::glob(&pattern)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))?;

    let mut ids = Vec::new();
    let mut matched_files = 0usize;
    for path in paths.flatten() {
        match read_ids_of_type(&path, entity_type) {
            Ok(mut file_ids) => {
                matched_files += 1;
                log::debug!("{} ids of type {entity_type} in {}", file_ids.len(), path.display());
                ids.append(&mut file_ids);
            }
            Err(e) => {
                log::warn!("failed to read {}: {e}", path.display());
            }
        }
    }
    if matched_files == 0 {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("no type part files matching {pattern}"),
        ));
    }
    ids.sort_unstable();
    ids.dedup();
    Ok(ids)
}

/// Read the (openaire_id, openaire_type) columns of one parquet part and
/// return the ids matching `entity_type`.
fn read_ids_of_type(
    path: &Path,
    entity_type: &str,
) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    use arrow::array::{Array, StringArray};
    use parquet::arrow::ProjectionMask;
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

    let file = File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;

    let schema = builder.schema().clone();
    for col in ["openaire_id", "openaire_type"] {
        if !schema.fields().iter().any(|f| f.name() == col) {
            return Err(format!("no {col} column").into());
        }
    }
    let mask = ProjectionMask::columns(
        builder.parquet_schema(),
        ["openaire_id", "openaire_type"],
    );
    let reader = builder.with_projection(mask).build()?;

    let mut ids = Vec::new();
    for batch in reader {
        let batch = batch?;
        let id_col = batch
            .column_by_name("openaire_id")
            .and_then(|c| c.as_any().downcast_ref::<StringArray>())
            .ok_or("openaire_id column is not Utf8")?;
        let type_col = batch
            .column_by_name("openaire_type")
            .and_then(|c| c.as_any().downcast_ref::<StringArray>())
            .ok_or("openaire_type column is not Utf8")?;
        for i in 0..batch.num_rows() {
            if !type_col.is_null(i) && type_col.value(i) == entity_type {
                ids.push(id_col.value(i).to_string());
            }
        }
    }
    Ok(ids)
}
