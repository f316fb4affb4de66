//! On-disk layout constants and the small file helpers both stream kinds share.
//!
//! ## Fixed stream
//!
//! ```text
//! timestamps   [t: u64 LE] ...                      one entry per record
//! data         [width: u32 LE] [payload; width] ... header written once
//! ```
//!
//! Record `i` lives at data offset `WIDTH_HEADER_BYTES + i * width`.
//!
//! ## Variable stream
//!
//! ```text
//! timestamps   [t: u64 LE][offset: u32 LE] ...      one entry per record
//! data         [key: u32 LE][len: u32 LE][bytes; len] ...
//! ```
//!
//! `offset` points at the `key` field of the record's block.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use tracing::Span;

use crate::error::{io_error, StreamError};

/// Name of the timestamp (fixed) or index (variable) file inside a stream directory.
pub const TIMESTAMPS_FILENAME: &str = "timestamps";

/// Name of the payload file inside a stream directory.
pub const DATA_FILENAME: &str = "data";

/// Size of the width header at the start of a fixed stream's data file.
pub const WIDTH_HEADER_BYTES: u64 = codec::WORD_BYTES as u64;

/// Size of the `[key][len]` prefix of every variable-stream block.
pub const BLOCK_HEADER_BYTES: u64 = 2 * codec::WORD_BYTES as u64;

/// Largest variable-stream payload accepted on append or trusted on read (10 MiB).
pub const MAX_BLOB_BYTES: usize = 10 * 1024 * 1024;

/// First/last timestamps and complete record count of one stream.
///
/// `first` and `last` are the minimum and maximum timestamps seen, which only
/// coincide with the first and last records when appends were in order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub first: Option<u64>,
    pub last: Option<u64>,
    pub count: u64,
}

impl Summary {
    /// Folds one more record timestamp into the summary.
    pub fn observe(&mut self, timestamp: u64) {
        self.first = Some(self.first.map_or(timestamp, |f| f.min(timestamp)));
        self.last = Some(self.last.map_or(timestamp, |l| l.max(timestamp)));
        self.count += 1;
    }

    /// Combines the timestamp bounds of `other` into `self`, leaving `count` alone.
    pub fn widen(&mut self, other: &Summary) {
        if let Some(f) = other.first {
            self.first = Some(self.first.map_or(f, |cur| cur.min(f)));
        }
        if let Some(l) = other.last {
            self.last = Some(self.last.map_or(l, |cur| cur.max(l)));
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Opens `path` for reading. A missing file is `Ok(None)`.
pub(crate) fn open_existing(span: &Span, path: &Path) -> Result<Option<File>, StreamError> {
    match File::open(path) {
        Ok(f) => Ok(Some(f)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(io_error(span, path, e)),
    }
}

/// Length of `path` in bytes. A missing file is `Ok(None)`.
pub(crate) fn file_len(span: &Span, path: &Path) -> Result<Option<u64>, StreamError> {
    match std::fs::metadata(path) {
        Ok(m) => Ok(Some(m.len())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(io_error(span, path, e)),
    }
}

/// Appends `bytes` to `path` (creating it) with one `write_all`, optionally fsyncing.
pub(crate) fn append_bytes(
    span: &Span,
    path: &Path,
    bytes: &[u8],
    sync: bool,
) -> Result<(), StreamError> {
    let mut f = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| io_error(span, path, e))?;
    f.write_all(bytes).map_err(|e| io_error(span, path, e))?;
    if sync {
        f.sync_all().map_err(|e| io_error(span, path, e))?;
    }
    Ok(())
}

pub(crate) fn ensure_dir(span: &Span, dir: &Path) -> Result<(), StreamError> {
    std::fs::create_dir_all(dir).map_err(|e| io_error(span, dir, e))
}
