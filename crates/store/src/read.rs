/// Read path: one lazy `iter_*` per stream kind.
///
/// Each iterator yields records with `start < timestamp <= end` in append
/// order (the lower bound is exclusive). A worker or stream that was never
/// written yields nothing. Iterators own their file handles and do not borrow
/// the session.
use codec::{Codec, Float, Levels, Word};
use std::path::PathBuf;

use crate::error::{corrupt, Result, StoreError};
use crate::layout::StreamKind;
use crate::Session;

impl Session {
    /// Spectrum sweeps as `(timestamp, levels)`.
    pub fn iter_spectrum(
        &self,
        worker: &str,
        start: Option<u64>,
        end: Option<u64>,
    ) -> Result<impl Iterator<Item = Result<(u64, Vec<i8>)>>> {
        let range = self.fixed_stream(worker, StreamKind::Spectrum)?.range(start, end)?;
        let shape = Levels::new(range.width());
        Ok(range.map(move |rec| -> Result<(u64, Vec<i8>)> {
            let (t, payload) = rec?;
            Ok((t, shape.decode(&payload)))
        }))
    }

    /// Audio markers as `(timestamp, channel)`.
    pub fn iter_audio(
        &self,
        worker: &str,
        start: Option<u64>,
        end: Option<u64>,
    ) -> Result<impl Iterator<Item = Result<(u64, u32)>>> {
        self.iter_scalar(worker, StreamKind::Audio, Word, start, end)
    }

    /// Temperatures as `(timestamp, value)`.
    pub fn iter_temperature(
        &self,
        worker: &str,
        start: Option<u64>,
        end: Option<u64>,
    ) -> Result<impl Iterator<Item = Result<(u64, f32)>>> {
        self.iter_scalar(worker, StreamKind::Temperature, Float, start, end)
    }

    /// RDS programme service names as `(timestamp, channel, name)`.
    pub fn iter_rds_name(
        &self,
        worker: &str,
        start: Option<u64>,
        end: Option<u64>,
    ) -> Result<impl Iterator<Item = Result<(u64, u32, String)>>> {
        self.iter_text(worker, StreamKind::RdsName, start, end)
    }

    /// RDS radio texts as `(timestamp, channel, text)`.
    pub fn iter_rds_text(
        &self,
        worker: &str,
        start: Option<u64>,
        end: Option<u64>,
    ) -> Result<impl Iterator<Item = Result<(u64, u32, String)>>> {
        self.iter_text(worker, StreamKind::RdsText, start, end)
    }

    /// Error messages as `(timestamp, message)`.
    pub fn iter_error(
        &self,
        worker: &str,
        start: Option<u64>,
        end: Option<u64>,
    ) -> Result<impl Iterator<Item = Result<(u64, String)>>> {
        let inner = self.iter_text(worker, StreamKind::Error, start, end)?;
        Ok(inner.map(|rec| rec.map(|(t, _, message)| (t, message))))
    }

    fn iter_scalar<C>(
        &self,
        worker: &str,
        kind: StreamKind,
        shape: C,
        start: Option<u64>,
        end: Option<u64>,
    ) -> Result<impl Iterator<Item = Result<(u64, C::Value)>>>
    where
        C: Codec + 'static,
    {
        let stream = self.fixed_stream(worker, kind)?;
        if let Some(width) = stream.width()? {
            if width != shape.width() {
                return Err(corrupt(
                    self.span(),
                    &stream.data_path(),
                    format!("{} stream has width {}, expected {}", kind, width, shape.width()),
                ));
            }
        }
        let range = stream.range(start, end)?;
        Ok(range.map(move |rec| -> Result<(u64, C::Value)> {
            let (t, payload) = rec?;
            Ok((t, shape.decode(&payload)))
        }))
    }

    fn iter_text(
        &self,
        worker: &str,
        kind: StreamKind,
        start: Option<u64>,
        end: Option<u64>,
    ) -> Result<impl Iterator<Item = Result<(u64, u32, String)>>> {
        let range = self.variable_stream(worker, kind)?.range(start, end)?;
        Ok(range.map(|rec| -> Result<(u64, u32, String)> {
            let (t, key, blob) = rec.map_err(StoreError::from)?;
            Ok((t, key, String::from_utf8_lossy(&blob).into_owned()))
        }))
    }

    /// Directory of `worker`'s `kind` stream in this session.
    pub fn stream_path(&self, worker: &str, kind: StreamKind) -> Result<PathBuf> {
        self.stream_dir(worker, kind)
    }
}
