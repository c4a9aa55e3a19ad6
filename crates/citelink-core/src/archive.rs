//! Streaming reader for archive shards: tar containers of gzipped
//! JSON-lines members.
//!
//! Members are decompressed incrementally, one buffered line at a time;
//! neither a member nor the whole shard is ever held in memory. A corrupt
//! member is skipped and counted, a corrupt container fails the shard.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;

/// Buffer size for the per-member gzip reader (256KB)
const GZIP_BUF_SIZE: usize = 256 * 1024;

/// Initial capacity for the per-line read buffer
const LINE_BUF_CAPACITY: usize = 4096;

/// Error from scanning one archive shard.
#[derive(Debug)]
pub enum ArchiveError {
    /// The container itself cannot be opened or walked. Fatal for this shard.
    Container {
        path: PathBuf,
        source: io::Error,
    },
    /// I/O failure raised by the line consumer (e.g. the part writer).
    Io(io::Error),
}

impl std::fmt::Display for ArchiveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Container { path, source } => {
                write!(f, "archive {}: {source}", path.display())
            }
            Self::Io(e) => write!(f, "IO: {e}"),
        }
    }
}

impl std::error::Error for ArchiveError {}

impl From<io::Error> for ArchiveError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

/// Counters from one full shard scan.
#[derive(Debug, Default)]
pub struct ArchiveStats {
    pub members: usize,
    pub members_failed: usize,
    pub lines: usize,
}

/// One archive shard, opened for a single sequential scan.
pub struct ShardArchive {
    path: PathBuf,
    archive: tar::Archive<File>,
}

impl ShardArchive {
    /// Open a shard container. Failure here is fatal for the shard's job.
    pub fn open(path: &Path) -> Result<Self, ArchiveError> {
        let file = File::open(path).map_err(|source| ArchiveError::Container {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            archive: tar::Archive::new(file),
        })
    }

    /// Scan every member in order, invoking `on_line(member_name, line)`
    /// for each non-empty newline-delimited record.
    ///
    /// A member whose gzip stream fails mid-read is logged and skipped;
    /// the scan continues with the next member. Errors returned by
    /// `on_line` abort the scan and propagate.
    pub fn for_each_line(
        mut self,
        mut on_line: impl FnMut(&str, &str) -> io::Result<()>,
    ) -> Result<ArchiveStats, ArchiveError> {
        let mut stats = ArchiveStats::default();
        let mut buf = String::with_capacity(LINE_BUF_CAPACITY);

        let entries = self
            .archive
            .entries()
            .map_err(|source| ArchiveError::Container {
                path: self.path.clone(),
                source,
            })?;

        for entry in entries {
            // A broken tar header means the rest of the container is
            // unreadable, not just this member.
            let entry = entry.map_err(|source| ArchiveError::Container {
                path: self.path.clone(),
                source,
            })?;
            if !entry.header().entry_type().is_file() {
                continue;
            }
            let member_name = entry
                .path()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_else(|_| format!("member_{}", stats.members));
            stats.members += 1;

            let mut reader = BufReader::with_capacity(GZIP_BUF_SIZE, GzDecoder::new(entry));
            loop {
                buf.clear();
                match reader.read_line(&mut buf) {
                    Ok(0) => break,
                    Ok(_) => {
                        let line = buf.trim_end_matches(['\n', '\r']);
                        if line.is_empty() {
                            continue;
                        }
                        stats.lines += 1;
                        on_line(&member_name, line)?;
                    }
                    Err(e) => {
                        log::warn!(
                            "skipping corrupt member {member_name} in {}: {e}",
                            self.path.display()
                        );
                        stats.members_failed += 1;
                        break;
                    }
                }
            }
        }
        Ok(stats)
    }
}
