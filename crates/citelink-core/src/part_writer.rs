//! Rotating gzip part writer with an uncompressed-byte budget.
//!
//! Part files are named `<stem>_<label>_part_<NNN>.<ext>` and numbered
//! monotonically, starting past the highest index already on disk so a
//! rerun appends new parts instead of clobbering old ones.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::GzEncoder;

/// Default uncompressed-byte budget per part (5 GiB)
pub const DEFAULT_MAX_PART_BYTES: u64 = 5 * 1024 * 1024 * 1024;

/// Build a part filename: `<stem>_<label>_part_<NNN>.<ext>`
pub fn part_filename(stem: &str, label: &str, index: usize, ext: &str) -> String {
    format!("{stem}_{label}_part_{index:03}.{ext}")
}

/// First part index not yet used on disk for this (stem, label, ext):
/// one past the highest existing index, or 0 for a clean directory.
///
/// Pure scan with no side effects; call once before constructing a writer.
pub fn next_available_index(
    dir: &Path,
    stem: &str,
    label: &str,
    ext: &str,
) -> io::Result<usize> {
    let pattern = dir
        .join(format!("{stem}_{label}_part_*.{ext}"))
        .to_string_lossy()
        .into_owned();
    let mut next = 0usize;
    let paths = glob::glob(&pattern)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;
    for path in paths.flatten() {
        if let Some(idx) = parse_part_index(&path) {
            next = next.max(idx + 1);
        }
    }
    Ok(next)
}

/// Extract the `NNN` from `..._part_NNN.<ext>`, if present.
fn parse_part_index(path: &Path) -> Option<usize> {
    let stem = path.file_stem()?.to_str()?;
    let (_, idx) = stem.rsplit_once("_part_")?;
    idx.parse().ok()
}

/// Gzip line writer that rotates to a new part when the next line would
/// push the current part past the byte budget. The triggering line always
/// lands whole in the new part; lines are never split.
pub struct PartWriter {
    dir: PathBuf,
    stem: String,
    label: String,
    max_part_bytes: u64,
    index: usize,
    part_bytes: u64,
    lines_written: usize,
    parts_opened: usize,
    encoder: Option<GzEncoder<File>>,
}

impl std::fmt::Debug for PartWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartWriter")
            .field("stem", &self.stem)
            .field("label", &self.label)
            .field("index", &self.index)
            .field("part_bytes", &self.part_bytes)
            .finish_non_exhaustive()
    }
}

impl PartWriter {
    /// Open the first part, numbered past any parts already on disk.
    pub fn create(
        dir: &Path,
        stem: &str,
        label: &str,
        max_part_bytes: u64,
    ) -> io::Result<Self> {
        let index = next_available_index(dir, stem, label, "gz")?;
        let mut writer = Self {
            dir: dir.to_path_buf(),
            stem: stem.to_string(),
            label: label.to_string(),
            max_part_bytes,
            index,
            part_bytes: 0,
            lines_written: 0,
            parts_opened: 0,
            encoder: None,
        };
        writer.open_part()?;
        Ok(writer)
    }

    fn open_part(&mut self) -> io::Result<()> {
        let path = self
            .dir
            .join(part_filename(&self.stem, &self.label, self.index, "gz"));
        log::debug!("opening part file for write: {}", path.display());
        // create_new: an existing part is a bug in index discovery, never
        // something to silently truncate.
        let file = OpenOptions::new().write(true).create_new(true).open(&path)?;
        self.encoder = Some(GzEncoder::new(file, Compression::default()));
        self.part_bytes = 0;
        self.parts_opened += 1;
        Ok(())
    }

    fn close_part(&mut self) -> io::Result<()> {
        if let Some(encoder) = self.encoder.take() {
            encoder.finish()?.sync_all()?;
        }
        Ok(())
    }

    /// Append one line (newline added here) to the current part, rotating
    /// first if the write would exceed the budget.
    pub fn write_line(&mut self, line: &str) -> io::Result<()> {
        let line_bytes = line.len() as u64 + 1;
        if self.part_bytes > 0 && self.part_bytes + line_bytes > self.max_part_bytes {
            self.close_part()?;
            self.index += 1;
            self.open_part()?;
        }
        let encoder = self
            .encoder
            .as_mut()
            .expect("PartWriter used after finish");
        encoder.write_all(line.as_bytes())?;
        encoder.write_all(b"\n")?;
        self.part_bytes += line_bytes;
        self.lines_written += 1;
        Ok(())
    }

    pub fn lines_written(&self) -> usize {
        self.lines_written
    }

    pub fn parts_opened(&self) -> usize {
        self.parts_opened
    }

    /// Close the current part. Consumes the writer; the `Drop` fallback
    /// exists only for early-exit paths.
    pub fn finish(mut self) -> io::Result<usize> {
        self.close_part()?;
        Ok(self.parts_opened)
    }
}

impl Drop for PartWriter {
    fn drop(&mut self) {
        // Error propagation unwinds past finish(); still close the gzip
        // stream so the part on disk stays readable.
        if let Some(encoder) = self.encoder.take() {
            if let Err(e) = encoder.finish() {
                log::warn!(
                    "failed to close part {} of {}_{}: {e}",
                    self.index,
                    self.stem,
                    self.label
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader};
    use tempfile::TempDir;

    fn read_part(dir: &Path, stem: &str, label: &str, index: usize) -> Vec<String> {
        let path = dir.join(part_filename(stem, label, index, "gz"));
        let reader = BufReader::new(flate2::read::GzDecoder::new(File::open(path).unwrap()));
        reader.lines().map(|l| l.unwrap()).collect()
    }

    fn part_files(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn part_filename_zero_padded() {
        assert_eq!(
            part_filename("relation_00", "relations", 7, "gz"),
            "relation_00_relations_part_007.gz"
        );
    }

    #[test]
    fn writes_single_part_under_budget() {
        let dir = TempDir::new().unwrap();
        let mut w = PartWriter::create(dir.path(), "shard", "relations", 1024).unwrap();
        w.write_line("alpha").unwrap();
        w.write_line("beta").unwrap();
        assert_eq!(w.finish().unwrap(), 1);
        assert_eq!(
            read_part(dir.path(), "shard", "relations", 0),
            vec!["alpha", "beta"]
        );
    }

    #[test]
    fn rotates_when_budget_exceeded() {
        let dir = TempDir::new().unwrap();
        // Budget of 10 bytes: "aaaa\n" (5) + "bbbb\n" (5) fills part 0
        // exactly; "cccc" triggers rotation and lands whole in part 1.
        let mut w = PartWriter::create(dir.path(), "shard", "relations", 10).unwrap();
        w.write_line("aaaa").unwrap();
        w.write_line("bbbb").unwrap();
        w.write_line("cccc").unwrap();
        assert_eq!(w.finish().unwrap(), 2);
        assert_eq!(
            read_part(dir.path(), "shard", "relations", 0),
            vec!["aaaa", "bbbb"]
        );
        assert_eq!(read_part(dir.path(), "shard", "relations", 1), vec!["cccc"]);
    }

    #[test]
    fn oversized_line_still_written_alone() {
        let dir = TempDir::new().unwrap();
        let mut w = PartWriter::create(dir.path(), "shard", "relations", 4).unwrap();
        w.write_line("tiny").unwrap(); // 5 bytes > 4, but part is empty
        w.write_line("also-too-big").unwrap();
        assert_eq!(w.finish().unwrap(), 2);
        assert_eq!(read_part(dir.path(), "shard", "relations", 0), vec!["tiny"]);
        assert_eq!(
            read_part(dir.path(), "shard", "relations", 1),
            vec!["also-too-big"]
        );
    }

    #[test]
    fn rerun_never_overwrites_existing_parts() {
        let dir = TempDir::new().unwrap();
        let mut w = PartWriter::create(dir.path(), "shard", "relations", 1024).unwrap();
        w.write_line("first run").unwrap();
        w.finish().unwrap();

        let mut w = PartWriter::create(dir.path(), "shard", "relations", 1024).unwrap();
        w.write_line("second run").unwrap();
        w.finish().unwrap();

        assert_eq!(
            part_files(dir.path()),
            vec![
                "shard_relations_part_000.gz".to_string(),
                "shard_relations_part_001.gz".to_string(),
            ]
        );
        assert_eq!(
            read_part(dir.path(), "shard", "relations", 0),
            vec!["first run"]
        );
        assert_eq!(
            read_part(dir.path(), "shard", "relations", 1),
            vec!["second run"]
        );
    }

    #[test]
    fn next_available_index_empty_dir() {
        let dir = TempDir::new().unwrap();
        assert_eq!(
            next_available_index(dir.path(), "shard", "relations", "gz").unwrap(),
            0
        );
    }

    #[test]
    fn next_available_index_skips_past_gaps() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("shard_relations_part_000.gz"), b"").unwrap();
        std::fs::write(dir.path().join("shard_relations_part_004.gz"), b"").unwrap();
        assert_eq!(
            next_available_index(dir.path(), "shard", "relations", "gz").unwrap(),
            5
        );
    }

    #[test]
    fn next_available_index_ignores_other_labels() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("shard_types_part_009.gz"), b"").unwrap();
        assert_eq!(
            next_available_index(dir.path(), "shard", "relations", "gz").unwrap(),
            0
        );
    }

    #[test]
    fn drop_closes_current_part() {
        let dir = TempDir::new().unwrap();
        {
            let mut w = PartWriter::create(dir.path(), "shard", "relations", 1024).unwrap();
            w.write_line("dropped not finished").unwrap();
            // simulated early termination: writer dropped without finish()
        }
        assert_eq!(
            read_part(dir.path(), "shard", "relations", 0),
            vec!["dropped not finished"]
        );
    }
}
