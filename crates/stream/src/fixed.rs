use codec::{Bytes, Timestamp, Word};
use std::fs::File;
use std::io::{self, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::Span;

use crate::error::{corrupt, io_error, StreamError};
use crate::format::{
    append_bytes, ensure_dir, file_len, open_existing, Summary, DATA_FILENAME,
    TIMESTAMPS_FILENAME, WIDTH_HEADER_BYTES,
};

/// Append-only stream of `(timestamp, payload)` records whose payload width is
/// fixed for the stream's lifetime.
///
/// The width is written once, as a header at the start of the data file, on
/// the first append. Because every payload has the same width, the data offset
/// of record `i` is pure arithmetic and a range query needs exactly one seek in
/// the data file no matter how far into the stream it starts.
///
/// The handle holds no open files; every call opens what it needs.
#[derive(Debug, Clone)]
pub struct FixedStream {
    dir: PathBuf,
    sync: bool,
    span: Span,
}

impl FixedStream {
    /// Handle for the stream stored in `dir`. Nothing is created until the
    /// first [`append`](FixedStream::append).
    pub fn new<P: AsRef<Path>>(dir: P, span: Span) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            sync: false,
            span,
        }
    }

    /// When `true`, every append is followed by `sync_all()` on both files.
    #[must_use]
    pub fn with_sync(mut self, sync: bool) -> Self {
        self.sync = sync;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn timestamps_path(&self) -> PathBuf {
        self.dir.join(TIMESTAMPS_FILENAME)
    }

    pub fn data_path(&self) -> PathBuf {
        self.dir.join(DATA_FILENAME)
    }

    /// Returns the payload width recorded in the header, or `None` if the
    /// stream has never been written.
    ///
    /// # Errors
    ///
    /// [`StreamError::Corrupt`] if the data file exists but is shorter than
    /// its header.
    pub fn width(&self) -> Result<Option<usize>, StreamError> {
        let path = self.data_path();
        match open_existing(&self.span, &path)? {
            Some(mut f) => read_width(&self.span, &path, &mut f).map(Some),
            None => Ok(None),
        }
    }

    /// Appends one record.
    ///
    /// The first append writes the width header. Afterwards the timestamp is
    /// appended before the payload, so the timestamp file is never shorter
    /// than the data file.
    ///
    /// # Errors
    ///
    /// [`StreamError::WidthMismatch`] if `payload.len()` differs from the
    /// recorded width; nothing is written in that case.
    pub fn append(&self, timestamp: u64, payload: &[u8]) -> Result<(), StreamError> {
        let data_path = self.data_path();
        let ts_path = self.timestamps_path();

        match self.width()? {
            Some(expected) if expected != payload.len() => {
                return Err(StreamError::WidthMismatch {
                    expected,
                    actual: payload.len(),
                });
            }
            Some(_) => {}
            None => {
                let width = u32::try_from(payload.len()).map_err(|_| {
                    io_error(
                        &self.span,
                        &data_path,
                        io::Error::new(io::ErrorKind::InvalidInput, "payload wider than u32::MAX"),
                    )
                })?;
                ensure_dir(&self.span, &self.dir)?;
                let header = codec::to_bytes(&Word, &width)
                    .map_err(|e| io_error(&self.span, &data_path, e))?;
                append_bytes(&self.span, &data_path, &header, self.sync)?;
                tracing::debug!(parent: &self.span, width, dir = %self.dir.display(), "fixed stream created");
            }
        }

        let ts = codec::to_bytes(&Timestamp, &timestamp)
            .map_err(|e| io_error(&self.span, &ts_path, e))?;
        append_bytes(&self.span, &ts_path, &ts, self.sync)?;
        append_bytes(&self.span, &data_path, payload, self.sync)?;
        Ok(())
    }

    /// Lazily yields every record with `start < timestamp <= end`, in append order.
    ///
    /// Either bound may be omitted. Note the lower bound is **exclusive**.
    /// The scan stops at the first timestamp greater than `end`, so records
    /// appended out of order after that point are not seen.
    ///
    /// A stream with no files yields nothing.
    pub fn range(&self, start: Option<u64>, end: Option<u64>) -> Result<FixedRange, StreamError> {
        let ts_path = self.timestamps_path();
        let data_path = self.data_path();

        let ts = open_existing(&self.span, &ts_path)?;
        let data = open_existing(&self.span, &data_path)?;
        let (ts, mut data) = match (ts, data) {
            (Some(ts), Some(data)) => (ts, data),
            _ => return Ok(FixedRange::empty(self.span.clone())),
        };
        let width = read_width(&self.span, &data_path, &mut data)?;

        Ok(FixedRange {
            timestamps: Some(BufReader::new(ts)),
            data: Some(BufReader::new(data)),
            data_path,
            ts_path,
            width,
            start,
            end,
            next_index: 0,
            data_index: None,
            span: self.span.clone(),
        })
    }

    /// Min/max timestamp and number of complete records.
    ///
    /// A record counts only if both its timestamp and its payload are fully
    /// on disk.
    pub fn summary(&self) -> Result<Summary, StreamError> {
        let ts_path = self.timestamps_path();
        let ts_len = file_len(&self.span, &ts_path)?.unwrap_or(0);
        let width = match self.width()? {
            Some(w) => w as u64,
            None => return Ok(Summary::default()),
        };
        let data_len = file_len(&self.span, &self.data_path())?.unwrap_or(0);

        let by_timestamps = ts_len / codec::TIMESTAMP_BYTES as u64;
        let complete = if width == 0 {
            by_timestamps
        } else {
            by_timestamps.min(data_len.saturating_sub(WIDTH_HEADER_BYTES) / width)
        };

        let mut summary = Summary::default();
        if let Some(f) = open_existing(&self.span, &ts_path)? {
            let mut r = BufReader::new(f);
            for _ in 0..complete {
                match codec::read(&Timestamp, &mut r).map_err(|e| io_error(&self.span, &ts_path, e))? {
                    Some(t) => summary.observe(t),
                    None => break,
                }
            }
        }
        Ok(summary)
    }
}

fn read_width(span: &Span, path: &Path, f: &mut File) -> Result<usize, StreamError> {
    match codec::read(&Word, f).map_err(|e| io_error(span, path, e))? {
        Some(w) => Ok(w as usize),
        None => Err(corrupt(span, path, "truncated width header")),
    }
}

/// Iterator returned by [`FixedStream::range`].
///
/// Finite and not restartable; call `range` again to re-scan.
pub struct FixedRange {
    timestamps: Option<BufReader<File>>,
    data: Option<BufReader<File>>,
    data_path: PathBuf,
    ts_path: PathBuf,
    width: usize,
    start: Option<u64>,
    end: Option<u64>,
    /// Record number of the next timestamp to be read.
    next_index: u64,
    /// Record number the data reader is positioned at, once seeked.
    data_index: Option<u64>,
    span: Span,
}

impl FixedRange {
    fn empty(span: Span) -> Self {
        Self {
            timestamps: None,
            data: None,
            data_path: PathBuf::new(),
            ts_path: PathBuf::new(),
            width: 0,
            start: None,
            end: None,
            next_index: 0,
            data_index: None,
            span,
        }
    }

    /// Payload width of the stream being scanned (0 for an empty range).
    pub fn width(&self) -> usize {
        self.width
    }

    fn finish(&mut self) {
        self.timestamps = None;
        self.data = None;
    }

    fn step(&mut self) -> Result<Option<(u64, Vec<u8>)>, StreamError> {
        loop {
            let (Some(ts), Some(data)) = (self.timestamps.as_mut(), self.data.as_mut()) else {
                return Ok(None);
            };

            let timestamp = match codec::read(&Timestamp, ts)
                .map_err(|e| io_error(&self.span, &self.ts_path, e))?
            {
                Some(t) => t,
                None => return Ok(None),
            };
            let index = self.next_index;
            self.next_index += 1;

            if self.end.is_some_and(|end| timestamp > end) {
                return Ok(None);
            }
            if self.start.is_some_and(|start| timestamp <= start) {
                continue;
            }

            // One seek for the first match; afterwards only when an
            // out-of-order record was skipped in between.
            if self.data_index != Some(index) {
                let offset = WIDTH_HEADER_BYTES + index * self.width as u64;
                data.seek(SeekFrom::Start(offset))
                    .map_err(|e| io_error(&self.span, &self.data_path, e))?;
            }

            return match codec::read(&Bytes::new(self.width), data)
                .map_err(|e| io_error(&self.span, &self.data_path, e))?
            {
                Some(payload) => {
                    self.data_index = Some(index + 1);
                    Ok(Some((timestamp, payload)))
                }
                // timestamp written, payload torn
                None => Ok(None),
            };
        }
    }
}

impl Iterator for FixedRange {
    type Item = Result<(u64, Vec<u8>), StreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.step() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.finish();
                None
            }
            Err(e) => {
                self.finish();
                Some(Err(e))
            }
        }
    }
}
