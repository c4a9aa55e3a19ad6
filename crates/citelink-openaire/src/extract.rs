//! Per-shard relation extraction: scan, filter, re-emit verbatim into
//! rotating gzip parts.

use std::path::Path;
use std::time::{Duration, Instant};

use citelink_core::archive::{ArchiveError, ShardArchive};
use citelink_core::filter::IdFilterSet;
use citelink_core::part_writer::PartWriter;
use citelink_core::progress::fmt_num;
use citelink_core::records::{EXTRACT_REL_TYPES, RelationProbe};
use indicatif::ProgressBar;

/// Progress update interval (every N lines to avoid overhead)
const UPDATE_INTERVAL: usize = 10_000;

/// Statistics from extracting a single shard
#[derive(Debug)]
pub struct ExtractStats {
    pub lines_scanned: usize,
    pub parse_errors: usize,
    pub rows_written: usize,
    pub parts_written: usize,
    pub members: usize,
    pub members_failed: usize,
    pub elapsed: Duration,
}

impl ExtractStats {
    /// Log stats for non-TTY output
    pub fn log(&self, shard_label: &str) {
        log::info!(
            "{shard_label}: kept {} of {} lines ({} decode errors, {} parts) in {:.1}s",
            self.rows_written,
            self.lines_scanned,
            self.parse_errors,
            self.parts_written,
            self.elapsed.as_secs_f64()
        );
    }
}

/// A relation line is in scope iff its type is on the extraction
/// allow-list and at least one endpoint is in the target-class set.
fn in_scope(probe: &RelationProbe, ids: &IdFilterSet) -> bool {
    EXTRACT_REL_TYPES.contains(&probe.rel_type.name.as_str())
        && (ids.contains(&probe.source) || ids.contains(&probe.target))
}

/// Scan one relation shard, writing in-scope lines byte-for-byte into
/// `<stem>_relations_part_NNN.gz` files under `outdir`.
pub fn extract_shard(
    shard: &Path,
    outdir: &Path,
    ids: &IdFilterSet,
    max_part_bytes: u64,
    pb: &ProgressBar,
) -> Result<ExtractStats, ArchiveError> {
    let start = Instant::now();
    let stem = shard
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "shard".to_string());

    log::debug!("starting extraction for shard: {}", shard.display());
    let mut writer = PartWriter::create(outdir, &stem, "relations", max_part_bytes)?;

    let mut lines_scanned = 0usize;
    let mut parse_errors = 0usize;
    let archive = ShardArchive::open(shard)?;
    let stats = archive.for_each_line(|member, line| {
        lines_scanned += 1;
        if lines_scanned.is_multiple_of(UPDATE_INTERVAL) {
            pb.set_message(format!(
                "{member}: {} lines, {} kept",
                fmt_num(lines_scanned),
                fmt_num(writer.lines_written())
            ));
        }
        match RelationProbe::decode(line) {
            Some(probe) => {
                if in_scope(&probe, ids) {
                    // verbatim copy: the output part must carry the
                    // record byte-identical to the dump
                    writer.write_line(line)?;
                }
            }
            None => {
                parse_errors += 1;
                log::debug!("undecodable relation line in {member} (#{lines_scanned})");
            }
        }
        Ok(())
    })?;

    let rows_written = writer.lines_written();
    let parts_written = writer.finish()?;
    log::debug!("finished extraction for shard: {}", shard.display());

    Ok(ExtractStats {
        lines_scanned,
        parse_errors,
        rows_written,
        parts_written,
        members: stats.members,
        members_failed: stats.members_failed,
        elapsed: start.elapsed(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::{BufRead, BufReader, Write};
    use tempfile::TempDir;

    fn gz_lines(lines: &[&str]) -> Vec<u8> {
        let mut enc = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        for line in lines {
            enc.write_all(line.as_bytes()).unwrap();
            enc.write_all(b"\n").unwrap();
        }
        enc.finish().unwrap()
    }

    fn write_shard(path: &Path, members: &[(&str, &[&str])]) {
        let mut builder = tar::Builder::new(File::create(path).unwrap());
        for (name, lines) in members {
            let data = gz_lines(lines);
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, data.as_slice()).unwrap();
        }
        builder.finish().unwrap();
    }

    fn read_part_lines(path: &Path) -> Vec<String> {
        let reader = BufReader::new(flate2::read::GzDecoder::new(File::open(path).unwrap()));
        reader.lines().map(|l| l.unwrap()).collect()
    }

    #[test]
    fn keeps_only_allowed_types_with_endpoint_in_filter() {
        let dir = TempDir::new().unwrap();
        let shard = dir.path().join("relation_00.tar");
        let cites = r#"{"relType":{"name":"Cites"},"source":"X1","target":"Y1"}"#;
        let mentions = r#"{"relType":{"name":"Mentions"},"source":"X1","target":"Y1"}"#;
        let unrelated = r#"{"relType":{"name":"Cites"},"source":"A","target":"B"}"#;
        write_shard(&shard, &[("m0.json.gz", &[cites, mentions, unrelated])]);

        let ids: IdFilterSet = ["Y1".to_string()].into_iter().collect();
        let outdir = dir.path().join("out");
        std::fs::create_dir(&outdir).unwrap();
        let stats = extract_shard(
            &shard,
            &outdir,
            &ids,
            1024 * 1024,
            &ProgressBar::hidden(),
        )
        .unwrap();

        assert_eq!(stats.lines_scanned, 3);
        assert_eq!(stats.rows_written, 1);
        assert_eq!(stats.parse_errors, 0);

        // byte-identical verbatim copy of the in-scope line only
        let lines = read_part_lines(&outdir.join("relation_00_relations_part_000.gz"));
        assert_eq!(lines, vec![cites.to_string()]);
    }

    #[test]
    fn either_endpoint_may_match() {
        let dir = TempDir::new().unwrap();
        let shard = dir.path().join("relation_00.tar");
        let as_source = r#"{"relType":{"name":"IsSupplementTo"},"source":"D1","target":"P1"}"#;
        let as_target = r#"{"relType":{"name":"IsSupplementedBy"},"source":"P2","target":"D1"}"#;
        write_shard(&shard, &[("m0.json.gz", &[as_source, as_target])]);

        let ids: IdFilterSet = ["D1".to_string()].into_iter().collect();
        let outdir = dir.path().join("out");
        std::fs::create_dir(&outdir).unwrap();
        let stats =
            extract_shard(&shard, &outdir, &ids, 1024, &ProgressBar::hidden()).unwrap();
        assert_eq!(stats.rows_written, 2);
    }

    #[test]
    fn undecodable_lines_are_skipped_not_fatal() {
        let dir = TempDir::new().unwrap();
        let shard = dir.path().join("relation_00.tar");
        let good = r#"{"relType":{"name":"Cites"},"source":"X","target":"D"}"#;
        write_shard(
            &shard,
            &[("m0.json.gz", &["{broken", good, r#"{"source":"no-reltype"}"#])],
        );

        let ids: IdFilterSet = ["D".to_string()].into_iter().collect();
        let outdir = dir.path().join("out");
        std::fs::create_dir(&outdir).unwrap();
        let stats =
            extract_shard(&shard, &outdir, &ids, 1024, &ProgressBar::hidden()).unwrap();
        assert_eq!(stats.lines_scanned, 3);
        assert_eq!(stats.parse_errors, 2);
        assert_eq!(stats.rows_written, 1);
    }

    #[test]
    fn rerun_appends_new_parts() {
        let dir = TempDir::new().unwrap();
        let shard = dir.path().join("relation_00.tar");
        let line = r#"{"relType":{"name":"Cites"},"source":"X","target":"D"}"#;
        write_shard(&shard, &[("m0.json.gz", &[line])]);

        let ids: IdFilterSet = ["D".to_string()].into_iter().collect();
        let outdir = dir.path().join("out");
        std::fs::create_dir(&outdir).unwrap();
        extract_shard(&shard, &outdir, &ids, 1024, &ProgressBar::hidden()).unwrap();
        extract_shard(&shard, &outdir, &ids, 1024, &ProgressBar::hidden()).unwrap();

        assert!(outdir.join("relation_00_relations_part_000.gz").exists());
        assert!(outdir.join("relation_00_relations_part_001.gz").exists());
        assert_eq!(
            read_part_lines(&outdir.join("relation_00_relations_part_000.gz")),
            vec![line.to_string()]
        );
    }
}
