//! # Store - time-series data store for spectrum-monitoring units
//!
//! Persists timestamped readings from radio-monitoring workers in flat files:
//! no embedded database, one directory per recording session, one pair of
//! files per (worker, stream kind).
//!
//! ## Architecture
//!
//! ```text
//! worker (driver)                 web / export / fleet
//!    |  write_*                      |  iter_* / iter_sessions / stats
//!    v                               v
//! ┌─────────────────────────────────────────────────┐
//! │                   DataStore                     │
//! │                                                 │
//! │  SessionIndex (data/index)   SettingsStore      │
//! │        |                     (settings/<name>)  │
//! │        v                                        │
//! │  Session (data/<id>/{config,format})            │
//! │        |                                        │
//! │        +-- worker_<name>/                       │
//! │              FixedStream    spectrum, audio,    │
//! │                             temperature         │
//! │              VariableStream rds/name, rds/text, │
//! │                             error               │
//! └─────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Responsibilities
//!
//! | Module       | Purpose                                                |
//! |--------------|--------------------------------------------------------|
//! | [`lib.rs`]   | `DataStore` facade, session listing, disk stats        |
//! | [`session`]  | create / read / delete, per-worker statistics scan     |
//! | [`write`]    | `write_spectrum`, `write_audio`, ... on `Session`      |
//! | [`read`]     | `iter_spectrum`, `iter_audio`, ... on `Session`        |
//! | [`index`]    | `SessionIndex`: append-only id list, atomic removal    |
//! | [`settings`] | `SettingsStore`: named JSON documents with defaults    |
//! | [`layout`]   | Directory names, stream kinds, name validation         |
//!
//! ## Concurrency
//!
//! Single-threaded and synchronous. No handle keeps a file open between
//! calls. One writer per (session, worker, stream) is assumed and not
//! enforced; readers may run alongside it.
//!
//! ## Logging
//!
//! Components log through the [`tracing::Span`] handed to
//! [`DataStore::open`]; sessions and streams open child spans carrying their
//! id, worker and kind. Nothing installs a global subscriber.
mod error;
mod files;
mod index;
mod layout;
mod read;
mod session;
mod settings;
mod stats;
mod write;

pub use config::StoreConfig;
pub use error::{Result, StoreError};
pub use index::{SessionIndex, INDEX_FILENAME};
pub use layout::{
    validate_name, StreamKind, CONFIG_FILENAME, DATA_DIRNAME, FORMAT_BYTES, FORMAT_FILENAME,
    FORMAT_MAGIC, SAMPLES_DIRNAME, SETTINGS_DIRNAME, WORKER_PREFIX,
};
pub use serde_json::Value;
pub use session::{Session, WorkerStats};
pub use settings::SettingsStore;
pub use stats::DiskStats;

use std::fs;
use std::path::{Path, PathBuf};
use tracing::Span;

use crate::error::io_error;
use crate::files::cleanup_tmp_files;
use crate::session::StoreContext;

/// Root of an on-disk store: sessions, settings and audio samples.
pub struct DataStore {
    config: StoreConfig,
    ctx: StoreContext,
    settings: SettingsStore,
    span: Span,
}

impl std::fmt::Debug for DataStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataStore")
            .field("root", &self.config.root)
            .field("sample_ext", &self.config.sample_ext)
            .field("sync", &self.config.sync)
            .finish()
    }
}

impl DataStore {
    /// Opens the store described by `config`, creating `data/`, `settings/`
    /// and `samples/` under its root if needed.
    ///
    /// Leftover `*.tmp` files from an interrupted index or settings rewrite
    /// are removed. Log events are emitted under `span`.
    pub fn open(config: StoreConfig, span: Span) -> Result<Self> {
        let data_dir = config.data_dir();
        let settings_dir = config.settings_dir();
        let samples_dir = config.samples_dir();

        for dir in [&data_dir, &settings_dir, &samples_dir] {
            fs::create_dir_all(dir).map_err(|e| io_error(&span, dir, e))?;
        }
        cleanup_tmp_files(&span, &data_dir);
        cleanup_tmp_files(&span, &settings_dir);

        let index = SessionIndex::new(&data_dir, span.clone()).with_sync(config.sync);
        let settings = SettingsStore::new(&settings_dir, span.clone());
        let ctx = StoreContext {
            data_dir,
            samples_dir,
            sample_ext: config.sample_ext.clone(),
            sync: config.sync,
            index,
        };

        tracing::debug!(parent: &span, root = %config.root.display(), "data store opened");
        Ok(Self {
            config,
            ctx,
            settings,
            span,
        })
    }

    /// Opens the store rooted at `root` with default settings.
    pub fn open_at<P: AsRef<Path>>(root: P, span: Span) -> Result<Self> {
        Self::open(StoreConfig::default().with_root(root), span)
    }

    pub fn root(&self) -> &Path {
        &self.config.root
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// A session handle. Without `id` it is ready for
    /// [`Session::create`]; with one it is ready for [`Session::read`].
    pub fn session(&self, id: Option<&str>) -> Session {
        Session::new(self.ctx.clone(), id.map(str::to_string), &self.span)
    }

    /// Creates a new session with id `timestamp`.
    pub fn create_session(&self, timestamp: u64, values: Value) -> Result<Session> {
        let mut session = self.session(None);
        session.create(timestamp, values)?;
        Ok(session)
    }

    /// Opens and reads an existing session.
    pub fn open_session(&self, id: &str) -> Result<Session> {
        validate_name(id)?;
        let mut session = self.session(Some(id));
        session.read()?;
        Ok(session)
    }

    /// Session ids in creation order.
    pub fn sessions(&self) -> Result<Vec<String>> {
        self.ctx.index.ids()
    }

    /// Reads every session listed in the index (or in `ids`) in turn.
    ///
    /// The list of ids is taken when this is called; each session is opened
    /// only when the iterator reaches it. Ids whose directory has disappeared
    /// are skipped with a warning. Call again to start over.
    pub fn iter_sessions(&self, ids: Option<Vec<String>>) -> Result<SessionIter> {
        let ids = match ids {
            Some(ids) => ids,
            None => self.sessions()?,
        };
        Ok(SessionIter {
            ids: ids.into_iter(),
            ctx: self.ctx.clone(),
            span: self.span.clone(),
        })
    }

    /// The settings documents of this store.
    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    /// Sample and data sizes plus free space on the backing filesystem.
    pub fn stats(&self) -> Result<DiskStats> {
        Ok(DiskStats {
            samples_bytes: stats::dir_size(&self.span, &self.ctx.samples_dir)?,
            data_bytes: stats::dir_size(&self.span, &self.ctx.data_dir)?,
            free_bytes: stats::free_space(&self.span, &self.config.root)?,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.ctx.data_dir
    }

    pub fn samples_dir(&self) -> &Path {
        &self.ctx.samples_dir
    }
}

/// Iterator returned by [`DataStore::iter_sessions`].
pub struct SessionIter {
    ids: std::vec::IntoIter<String>,
    ctx: StoreContext,
    span: Span,
}

impl Iterator for SessionIter {
    type Item = Result<Session>;

    fn next(&mut self) -> Option<Self::Item> {
        let Self { ids, ctx, span } = self;
        for id in ids.by_ref() {
            if validate_name(&id).is_err() {
                tracing::warn!(parent: &*span, id = %id, "skipping invalid session id");
                continue;
            }
            let dir: PathBuf = ctx.data_dir.join(&id);
            if !dir.is_dir() {
                tracing::warn!(parent: &*span, id = %id, "session listed in index has no directory, skipping");
                continue;
            }
            let mut session = Session::new(ctx.clone(), Some(id), span);
            return Some(session.read().map(|()| session));
        }
        None
    }
}

#[cfg(test)]
mod tests;
