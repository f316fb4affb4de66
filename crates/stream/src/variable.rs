use codec::{Bytes, IndexEntry, Word};
use std::fs::File;
use std::io::{self, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::Span;

use crate::error::{corrupt, io_error, StreamError};
use crate::format::{
    append_bytes, ensure_dir, file_len, open_existing, Summary, BLOCK_HEADER_BYTES,
    DATA_FILENAME, MAX_BLOB_BYTES, TIMESTAMPS_FILENAME,
};

/// Append-only stream of `(timestamp, key, blob)` records with payloads of
/// varying length.
///
/// The index file pairs every timestamp with the byte offset of its block in
/// the data file. Offsets cannot be derived from a record number, so a range
/// query walks the index from the top; the data file is only touched for
/// records inside the range.
///
/// `key` is a small tag stored inside the block (the channel index for RDS
/// records, zero for error messages).
#[derive(Debug, Clone)]
pub struct VariableStream {
    dir: PathBuf,
    sync: bool,
    span: Span,
}

impl VariableStream {
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

    pub fn index_path(&self) -> PathBuf {
        self.dir.join(TIMESTAMPS_FILENAME)
    }

    pub fn data_path(&self) -> PathBuf {
        self.dir.join(DATA_FILENAME)
    }

    /// Appends one record: the index entry first, then the data block.
    ///
    /// # Errors
    ///
    /// An `InvalidInput` I/O error if `blob` exceeds [`MAX_BLOB_BYTES`] or the
    /// data file has outgrown 32-bit offsets.
    pub fn append(&self, timestamp: u64, key: u32, blob: &[u8]) -> Result<(), StreamError> {
        let index_path = self.index_path();
        let data_path = self.data_path();

        if blob.len() > MAX_BLOB_BYTES {
            return Err(io_error(
                &self.span,
                &data_path,
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("blob too large: {} bytes (max {})", blob.len(), MAX_BLOB_BYTES),
                ),
            ));
        }

        ensure_dir(&self.span, &self.dir)?;
        let offset = file_len(&self.span, &data_path)?.unwrap_or(0);
        let offset = u32::try_from(offset).map_err(|_| {
            io_error(
                &self.span,
                &data_path,
                io::Error::new(io::ErrorKind::InvalidInput, "data file exceeds u32 offsets"),
            )
        })?;

        let entry = codec::to_bytes(&IndexEntry, &(timestamp, offset))
            .map_err(|e| io_error(&self.span, &index_path, e))?;

        let mut block = Vec::with_capacity(BLOCK_HEADER_BYTES as usize + blob.len());
        codec::write(&Word, &mut block, &key).map_err(|e| io_error(&self.span, &data_path, e))?;
        codec::write(&Word, &mut block, &(blob.len() as u32))
            .map_err(|e| io_error(&self.span, &data_path, e))?;
        block.extend_from_slice(blob);

        append_bytes(&self.span, &index_path, &entry, self.sync)?;
        append_bytes(&self.span, &data_path, &block, self.sync)?;
        Ok(())
    }

    /// Lazily yields every record with `start < timestamp <= end`, in append
    /// order. Same bound semantics as [`FixedStream::range`](crate::FixedStream::range).
    pub fn range(
        &self,
        start: Option<u64>,
        end: Option<u64>,
    ) -> Result<VariableRange, StreamError> {
        let index_path = self.index_path();
        let data_path = self.data_path();

        let index = open_existing(&self.span, &index_path)?;
        let data = open_existing(&self.span, &data_path)?;
        let (index, data) = match (index, data) {
            (Some(i), Some(d)) => (BufReader::new(i), BufReader::new(d)),
            _ => {
                return Ok(VariableRange {
                    index: None,
                    data: None,
                    index_path,
                    data_path,
                    start,
                    end,
                    data_pos: None,
                    expected_offset: None,
                    span: self.span.clone(),
                })
            }
        };

        Ok(VariableRange {
            index: Some(index),
            data: Some(data),
            index_path,
            data_path,
            start,
            end,
            data_pos: Some(0),
            expected_offset: None,
            span: self.span.clone(),
        })
    }

    /// Min/max timestamp and number of complete records.
    ///
    /// Every record but the last is complete once the next index entry
    /// exists; the last one is checked against the data file length.
    pub fn summary(&self) -> Result<Summary, StreamError> {
        let index_path = self.index_path();
        let data_path = self.data_path();

        let mut summary = Summary::default();
        let Some(f) = open_existing(&self.span, &index_path)? else {
            return Ok(summary);
        };
        let data_len = file_len(&self.span, &data_path)?.unwrap_or(0);

        let mut r = BufReader::new(f);
        let mut pending: Option<(u64, u64)> = None;
        while let Some((t, off)) =
            codec::read(&IndexEntry, &mut r).map_err(|e| io_error(&self.span, &index_path, e))?
        {
            if let Some((prev, _)) = pending.take() {
                summary.observe(prev);
            }
            pending = Some((t, off as u64));
        }

        if let Some((t, off)) = pending {
            if self.block_end(&data_path, off)?.is_some_and(|end| end <= data_len) {
                summary.observe(t);
            }
        }
        Ok(summary)
    }

    /// End offset of the block starting at `offset`, if its header is on disk.
    fn block_end(&self, data_path: &Path, offset: u64) -> Result<Option<u64>, StreamError> {
        let Some(mut f) = open_existing(&self.span, data_path)? else {
            return Ok(None);
        };
        f.seek(SeekFrom::Start(offset + codec::WORD_BYTES as u64))
            .map_err(|e| io_error(&self.span, data_path, e))?;
        let len = codec::read(&Word, &mut f).map_err(|e| io_error(&self.span, data_path, e))?;
        Ok(len.map(|len| offset + BLOCK_HEADER_BYTES + len as u64))
    }
}

/// Iterator returned by [`VariableStream::range`].
pub struct VariableRange {
    index: Option<BufReader<File>>,
    data: Option<BufReader<File>>,
    index_path: PathBuf,
    data_path: PathBuf,
    start: Option<u64>,
    end: Option<u64>,
    /// Current position of the data reader.
    data_pos: Option<u64>,
    /// Where the next index entry must point if the previous record was read.
    expected_offset: Option<u64>,
    span: Span,
}

impl VariableRange {
    fn finish(&mut self) {
        self.index = None;
        self.data = None;
    }

    fn step(&mut self) -> Result<Option<(u64, u32, Vec<u8>)>, StreamError> {
        loop {
            let (Some(index), Some(data)) = (self.index.as_mut(), self.data.as_mut()) else {
                return Ok(None);
            };

            let (timestamp, offset) = match codec::read(&IndexEntry, index)
                .map_err(|e| io_error(&self.span, &self.index_path, e))?
            {
                Some((t, off)) => (t, off as u64),
                None => return Ok(None),
            };

            if let Some(expected) = self.expected_offset.take() {
                if offset != expected {
                    return Err(corrupt(
                        &self.span,
                        &self.index_path,
                        format!("offset {} does not follow block ending at {}", offset, expected),
                    ));
                }
            }

            if self.end.is_some_and(|end| timestamp > end) {
                return Ok(None);
            }
            if self.start.is_some_and(|start| timestamp <= start) {
                continue;
            }

            if self.data_pos != Some(offset) {
                data.seek(SeekFrom::Start(offset))
                    .map_err(|e| io_error(&self.span, &self.data_path, e))?;
            }

            let read_word = |data: &mut BufReader<File>| {
                codec::read(&Word, data).map_err(|e| io_error(&self.span, &self.data_path, e))
            };
            let Some(key) = read_word(data)? else {
                return Ok(None);
            };
            let Some(len) = read_word(data)? else {
                return Ok(None);
            };
            let len = len as usize;
            if len > MAX_BLOB_BYTES {
                return Err(corrupt(
                    &self.span,
                    &self.data_path,
                    format!("block at {} claims {} bytes (max {})", offset, len, MAX_BLOB_BYTES),
                ));
            }
            let Some(blob) = codec::read(&Bytes::new(len), data)
                .map_err(|e| io_error(&self.span, &self.data_path, e))?
            else {
                // final block torn mid-payload
                return Ok(None);
            };

            let next = offset + BLOCK_HEADER_BYTES + len as u64;
            self.data_pos = Some(next);
            self.expected_offset = Some(next);
            return Ok(Some((timestamp, key, blob)));
        }
    }
}

impl Iterator for VariableRange {
    type Item = Result<(u64, u32, Vec<u8>), StreamError>;

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
