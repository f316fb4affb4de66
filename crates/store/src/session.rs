/// Session lifecycle: create, read (open), delete, and the per-worker
/// statistics scan.
///
/// A session is one recording run. Its id is the decimal creation timestamp
/// in milliseconds and never changes. The configuration document and the
/// creation timestamp are written once by `create`; afterwards only the
/// worker streams underneath the session grow.
///
/// Reading a session walks every `worker_*` directory and summarises each of
/// its streams, which costs one pass over every timestamp file. The result is
/// kept on the handle and updated in place by every `write_*` through it.
use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use stream::{FixedStream, Summary, VariableStream};
use tracing::Span;

use crate::error::{corrupt, io_error, json_error, Result, StoreError};
use crate::files::{read_optional, remove_tree, write_atomic};
use crate::index::SessionIndex;
use crate::layout::{
    worker_dir, StreamKind, CONFIG_FILENAME, FORMAT_BYTES, FORMAT_FILENAME, FORMAT_MAGIC,
    WORKER_PREFIX,
};

/// Everything a session handle needs from the store that produced it.
#[derive(Debug, Clone)]
pub(crate) struct StoreContext {
    pub(crate) data_dir: PathBuf,
    pub(crate) samples_dir: PathBuf,
    pub(crate) sample_ext: String,
    pub(crate) sync: bool,
    pub(crate) index: SessionIndex,
}

/// Aggregate statistics for one worker of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// Smallest timestamp in any of the worker's streams.
    pub first: Option<u64>,
    /// Largest timestamp in any of the worker's streams.
    pub latest: Option<u64>,
    /// Number of complete spectrum records.
    pub spectrum_count: u64,
}

impl WorkerStats {
    pub(crate) fn observe(&mut self, timestamp: u64) {
        self.first = Some(self.first.map_or(timestamp, |f| f.min(timestamp)));
        self.latest = Some(self.latest.map_or(timestamp, |l| l.max(timestamp)));
    }
}

#[derive(Debug)]
pub(crate) struct Loaded {
    pub(crate) created: u64,
    pub(crate) config: Value,
    pub(crate) workers: BTreeMap<String, WorkerStats>,
}

#[derive(Debug)]
enum State {
    Unopened,
    Open(Loaded),
    Deleted,
}

/// Handle to one recording session.
///
/// Obtained from [`DataStore::session`](crate::DataStore::session). A handle
/// without an id must be [`create`](Session::create)d; a handle with an id
/// must be [`read`](Session::read) before use.
#[derive(Debug)]
pub struct Session {
    id: Option<String>,
    ctx: StoreContext,
    state: State,
    span: Span,
}

impl Session {
    pub(crate) fn new(ctx: StoreContext, id: Option<String>, parent: &Span) -> Self {
        let span = tracing::info_span!(parent: parent, "session", id = tracing::field::Empty);
        if let Some(id) = &id {
            span.record("id", id.as_str());
        }
        Self {
            id,
            ctx,
            state: State::Unopened,
            span,
        }
    }

    /// The session id, if one has been assigned.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Directory holding this session's files.
    pub fn dir(&self) -> Option<PathBuf> {
        self.id.as_ref().map(|id| self.ctx.data_dir.join(id))
    }

    /// `true` once `create` or `read` succeeded and `delete` has not been called.
    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(self.state, State::Open(_))
    }

    pub(crate) fn span(&self) -> &Span {
        &self.span
    }

    pub(crate) fn ctx(&self) -> &StoreContext {
        &self.ctx
    }

    pub(crate) fn loaded(&self) -> Result<(&str, &Loaded)> {
        match (&self.state, &self.id) {
            (State::Open(loaded), Some(id)) => Ok((id.as_str(), loaded)),
            (State::Deleted, id) => Err(StoreError::InvalidSession {
                id: id.clone().unwrap_or_default(),
            }),
            _ => Err(StoreError::UninitializedSession),
        }
    }

    pub(crate) fn loaded_mut(&mut self) -> Result<(&str, &mut Loaded)> {
        match (&mut self.state, &self.id) {
            (State::Open(loaded), Some(id)) => Ok((id.as_str(), loaded)),
            (State::Deleted, id) => Err(StoreError::InvalidSession {
                id: id.clone().unwrap_or_default(),
            }),
            _ => Err(StoreError::UninitializedSession),
        }
    }

    /// Creation timestamp (milliseconds since the epoch).
    pub fn created(&self) -> Result<u64> {
        Ok(self.loaded()?.1.created)
    }

    /// The configuration document passed to `create`.
    pub fn config(&self) -> Result<&Value> {
        Ok(&self.loaded()?.1.config)
    }

    /// Per-worker statistics, keyed by worker name.
    pub fn workers(&self) -> Result<&BTreeMap<String, WorkerStats>> {
        Ok(&self.loaded()?.1.workers)
    }

    /// Smallest record timestamp across all workers.
    pub fn first(&self) -> Result<Option<u64>> {
        Ok(self.workers()?.values().filter_map(|w| w.first).min())
    }

    /// Largest record timestamp across all workers.
    pub fn latest(&self) -> Result<Option<u64>> {
        Ok(self.workers()?.values().filter_map(|w| w.latest).max())
    }

    /// Total spectrum records across all workers.
    pub fn spectrum_count(&self) -> Result<u64> {
        Ok(self.workers()?.values().map(|w| w.spectrum_count).sum())
    }

    /// Creates the session on disk with id `timestamp`.
    ///
    /// Writes the directory, the `format` header and the `config` document,
    /// then registers the id in the session index.
    ///
    /// # Errors
    ///
    /// - [`StoreError::AlreadyExists`] if the session directory exists, or the
    ///   handle is already open.
    /// - [`StoreError::InvalidName`] if the handle is bound to a different id.
    /// - [`StoreError::InvalidSession`] on a deleted handle.
    pub fn create(&mut self, timestamp: u64, values: Value) -> Result<()> {
        let id = timestamp.to_string();
        match &self.state {
            State::Deleted => {
                return Err(StoreError::InvalidSession {
                    id: self.id.clone().unwrap_or_default(),
                })
            }
            State::Open(_) => return Err(StoreError::AlreadyExists { id }),
            State::Unopened => {}
        }
        if let Some(bound) = &self.id {
            if *bound != id {
                return Err(StoreError::InvalidName { name: id });
            }
        }

        let dir = self.ctx.data_dir.join(&id);
        match fs::create_dir(&dir) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(StoreError::AlreadyExists { id });
            }
            Err(e) => return Err(io_error(&self.span, &dir, e)),
        }

        let mut header = Vec::with_capacity(FORMAT_BYTES);
        header
            .write_u32::<LittleEndian>(FORMAT_MAGIC)
            .and_then(|_| header.write_u64::<LittleEndian>(timestamp))
            .map_err(|e| io_error(&self.span, &dir, e))?;
        let format_path = dir.join(FORMAT_FILENAME);
        write_atomic(&self.span, &format_path, &dir.join("format.tmp"), &header)?;

        let config_path = dir.join(CONFIG_FILENAME);
        let config_bytes =
            serde_json::to_vec_pretty(&values).map_err(|e| json_error(&self.span, &config_path, e))?;
        write_atomic(&self.span, &config_path, &dir.join("config.tmp"), &config_bytes)?;

        self.ctx.index.append(&id)?;

        if self.id.is_none() {
            self.span.record("id", id.as_str());
        }
        tracing::info!(parent: &self.span, created = timestamp, "session created");
        self.id = Some(id);
        self.state = State::Open(Loaded {
            created: timestamp,
            config: values,
            workers: BTreeMap::new(),
        });
        Ok(())
    }

    /// Loads the header and configuration and scans every worker's streams.
    ///
    /// Calling it again on an open handle rescans from disk.
    pub fn read(&mut self) -> Result<()> {
        if let State::Deleted = self.state {
            return Err(StoreError::InvalidSession {
                id: self.id.clone().unwrap_or_default(),
            });
        }
        let Some(id) = self.id.clone() else {
            return Err(StoreError::UninitializedSession);
        };
        let dir = self.ctx.data_dir.join(&id);

        let created = self.read_format(&dir)?;

        let config_path = dir.join(CONFIG_FILENAME);
        let config_bytes = read_optional(&self.span, &config_path)?
            .ok_or_else(|| corrupt(&self.span, &config_path, "missing configuration document"))?;
        let config: Value = serde_json::from_slice(&config_bytes)
            .map_err(|e| json_error(&self.span, &config_path, e))?;

        let workers = self.scan_workers(&dir)?;
        tracing::debug!(parent: &self.span, workers = workers.len(), "session read");

        self.state = State::Open(Loaded {
            created,
            config,
            workers,
        });
        Ok(())
    }

    fn read_format(&self, dir: &Path) -> Result<u64> {
        let path = dir.join(FORMAT_FILENAME);
        let bytes = fs::read(&path).map_err(|e| io_error(&self.span, &path, e))?;
        if bytes.len() < FORMAT_BYTES {
            return Err(corrupt(
                &self.span,
                &path,
                format!("header is {} bytes, expected {}", bytes.len(), FORMAT_BYTES),
            ));
        }
        let magic = LittleEndian::read_u32(&bytes[..codec::WORD_BYTES]);
        if magic != FORMAT_MAGIC {
            return Err(corrupt(&self.span, &path, format!("unknown magic {:#x}", magic)));
        }
        Ok(LittleEndian::read_u64(&bytes[codec::WORD_BYTES..FORMAT_BYTES]))
    }

    fn scan_workers(&self, dir: &Path) -> Result<BTreeMap<String, WorkerStats>> {
        let mut workers = BTreeMap::new();
        let entries = fs::read_dir(dir).map_err(|e| io_error(&self.span, dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| io_error(&self.span, dir, e))?;
            let name = entry.file_name();
            let Some(worker) = name.to_str().and_then(|n| n.strip_prefix(WORKER_PREFIX)) else {
                continue;
            };
            if !entry.path().is_dir() {
                continue;
            }

            let mut bounds = Summary::default();
            let mut spectrum_count = 0;
            for kind in StreamKind::ALL {
                let summary = self.summarise(dir, worker, kind)?;
                bounds.widen(&summary);
                if kind == StreamKind::Spectrum {
                    spectrum_count = summary.count;
                }
            }
            workers.insert(
                worker.to_string(),
                WorkerStats {
                    first: bounds.first,
                    latest: bounds.last,
                    spectrum_count,
                },
            );
        }
        Ok(workers)
    }

    fn summarise(&self, dir: &Path, worker: &str, kind: StreamKind) -> Result<Summary> {
        let stream_dir = worker_dir(dir, worker).join(kind.relative_dir());
        let span = self.stream_span(worker, kind);
        let summary = if kind.is_fixed() {
            FixedStream::new(stream_dir, span).summary()?
        } else {
            VariableStream::new(stream_dir, span).summary()?
        };
        Ok(summary)
    }

    pub(crate) fn stream_span(&self, worker: &str, kind: StreamKind) -> Span {
        tracing::debug_span!(parent: &self.span, "stream", worker, kind = kind.as_str())
    }

    /// Removes the session directory, its audio samples and its index entry.
    ///
    /// The handle is unusable afterwards; every further call fails with
    /// [`StoreError::InvalidSession`].
    pub fn delete(&mut self) -> Result<()> {
        let id = self.loaded()?.0.to_string();

        let dir = self.ctx.data_dir.join(&id);
        remove_tree(&self.span, &dir)?;
        let removed_samples = remove_tree(&self.span, &self.ctx.samples_dir.join(&id))?;
        self.ctx.index.remove(&id)?;

        tracing::info!(parent: &self.span, removed_samples, "session deleted");
        self.state = State::Deleted;
        Ok(())
    }
}
