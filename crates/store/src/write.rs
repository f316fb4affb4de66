/// Write path: one `write_*` per stream kind.
///
/// Every write is scoped to a single (worker, stream) pair and delegates to a
/// [`FixedStream`] or [`VariableStream`] opened for the duration of the call.
/// On success the worker's in-memory statistics are updated, so `first`,
/// `latest` and `spectrum_count` stay current without a rescan.
use codec::{Float, Levels, Word};
use std::fs;
use std::path::PathBuf;
use stream::{FixedStream, VariableStream};

use crate::error::{io_error, Result, StoreError};
use crate::layout::{validate_name, worker_dir, StreamKind};
use crate::Session;

/// Key stored with every error message.
const ERROR_KEY: u32 = 0;

impl Session {
    pub(crate) fn stream_dir(&self, worker: &str, kind: StreamKind) -> Result<PathBuf> {
        let (id, _) = self.loaded()?;
        validate_name(worker)?;
        Ok(worker_dir(&self.ctx().data_dir.join(id), worker).join(kind.relative_dir()))
    }

    /// Fails with `InvalidSession` when the session directory was removed
    /// through another handle, so writes never recreate a deleted session.
    fn ensure_on_disk(&self) -> Result<()> {
        let (id, _) = self.loaded()?;
        if !self.ctx().data_dir.join(id).is_dir() {
            tracing::warn!(parent: self.span(), id = %id, "session directory is gone, refusing write");
            return Err(StoreError::InvalidSession { id: id.to_string() });
        }
        Ok(())
    }

    pub(crate) fn fixed_stream(&self, worker: &str, kind: StreamKind) -> Result<FixedStream> {
        let dir = self.stream_dir(worker, kind)?;
        Ok(FixedStream::new(dir, self.stream_span(worker, kind)).with_sync(self.ctx().sync))
    }

    pub(crate) fn variable_stream(&self, worker: &str, kind: StreamKind) -> Result<VariableStream> {
        let dir = self.stream_dir(worker, kind)?;
        Ok(VariableStream::new(dir, self.stream_span(worker, kind)).with_sync(self.ctx().sync))
    }

    fn record(&mut self, worker: &str, timestamp: u64, kind: StreamKind) -> Result<()> {
        let (_, loaded) = self.loaded_mut()?;
        let stats = loaded.workers.entry(worker.to_string()).or_default();
        stats.observe(timestamp);
        if kind == StreamKind::Spectrum {
            stats.spectrum_count += 1;
        }
        Ok(())
    }

    fn append_fixed(&mut self, worker: &str, kind: StreamKind, timestamp: u64, payload: &[u8]) -> Result<()> {
        self.ensure_on_disk()?;
        self.fixed_stream(worker, kind)?.append(timestamp, payload)?;
        self.record(worker, timestamp, kind)
    }

    fn append_variable(
        &mut self,
        worker: &str,
        kind: StreamKind,
        timestamp: u64,
        key: u32,
        blob: &[u8],
    ) -> Result<()> {
        self.ensure_on_disk()?;
        self.variable_stream(worker, kind)?.append(timestamp, key, blob)?;
        self.record(worker, timestamp, kind)
    }

    /// Appends one sweep: a signed, rescaled power level per channel bin.
    ///
    /// Every sweep of a worker must have the same number of bins as its
    /// first one, otherwise [`StoreError::WidthMismatch`](crate::StoreError::WidthMismatch).
    pub fn write_spectrum(&mut self, worker: &str, timestamp: u64, levels: &[i8]) -> Result<()> {
        let shape = Levels::new(levels.len());
        let path = self.stream_dir(worker, StreamKind::Spectrum)?;
        let payload = codec::to_bytes(&shape, &levels.to_vec()).map_err(|e| io_error(self.span(), &path, e))?;
        self.append_fixed(worker, StreamKind::Spectrum, timestamp, &payload)
    }

    /// Records that an audio clip for `channel` starts at `timestamp` and
    /// returns the path the clip should be written to.
    ///
    /// The clip's parent directories are created; the clip itself is written
    /// by the caller.
    pub fn write_audio(&mut self, worker: &str, timestamp: u64, channel: u32) -> Result<PathBuf> {
        let sample = self.sample_path(worker, timestamp, channel)?;
        let payload = codec::to_bytes(&Word, &channel).map_err(|e| io_error(self.span(), &sample, e))?;
        self.append_fixed(worker, StreamKind::Audio, timestamp, &payload)?;

        if let Some(parent) = sample.parent() {
            fs::create_dir_all(parent).map_err(|e| io_error(self.span(), parent, e))?;
        }
        Ok(sample)
    }

    pub fn write_temperature(&mut self, worker: &str, timestamp: u64, value: f32) -> Result<()> {
        let path = self.stream_dir(worker, StreamKind::Temperature)?;
        let payload = codec::to_bytes(&Float, &value).map_err(|e| io_error(self.span(), &path, e))?;
        self.append_fixed(worker, StreamKind::Temperature, timestamp, &payload)
    }

    /// Appends a decoded RDS programme service name heard on `channel`.
    pub fn write_rds_name(&mut self, worker: &str, timestamp: u64, channel: u32, name: &str) -> Result<()> {
        self.append_variable(worker, StreamKind::RdsName, timestamp, channel, name.as_bytes())
    }

    /// Appends a decoded RDS radio text heard on `channel`.
    pub fn write_rds_text(&mut self, worker: &str, timestamp: u64, channel: u32, text: &str) -> Result<()> {
        self.append_variable(worker, StreamKind::RdsText, timestamp, channel, text.as_bytes())
    }

    pub fn write_error(&mut self, worker: &str, timestamp: u64, message: &str) -> Result<()> {
        self.append_variable(worker, StreamKind::Error, timestamp, ERROR_KEY, message.as_bytes())
    }

    /// Where the audio clip for (`worker`, `timestamp`, `channel`) lives:
    /// `samples/<session>/<worker>/<channel>/<timestamp>.<ext>`.
    pub fn sample_path(&self, worker: &str, timestamp: u64, channel: u32) -> Result<PathBuf> {
        let (id, _) = self.loaded()?;
        validate_name(worker)?;
        Ok(self
            .ctx()
            .samples_dir
            .join(id)
            .join(worker)
            .join(channel.to_string())
            .join(format!("{}.{}", timestamp, self.ctx().sample_ext)))
    }
}
