/// # SessionIndex - registry of known sessions
///
/// `data/index` lists every session id in creation order, one per line:
///
/// ```text
/// 1708600000000
/// 1708600360000
/// 1708686400000
/// ```
///
/// Empty lines are ignored.
///
/// ## Crash Safety
///
/// Appending a new id is a single small `write_all` at the end of the file.
/// Removing an id rewrites the whole list to `index.tmp`, fsyncs it, then
/// renames it over `index`, so a crash leaves either the old or the new list
/// intact, never a mix.
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::Span;

use crate::error::{io_error, Result, StoreError};
use crate::files::{read_optional, write_atomic};

/// Name of the index file within the data directory.
pub const INDEX_FILENAME: &str = "index";

/// Temporary file used while rewriting the index.
pub(crate) const INDEX_TMP_FILENAME: &str = "index.tmp";

/// Handle to the session index of one data directory.
#[derive(Debug, Clone)]
pub struct SessionIndex {
    path: PathBuf,
    sync: bool,
    span: Span,
}

impl SessionIndex {
    pub fn new(data_dir: &Path, span: Span) -> Self {
        Self {
            path: data_dir.join(INDEX_FILENAME),
            sync: false,
            span,
        }
    }

    #[must_use]
    pub fn with_sync(mut self, sync: bool) -> Self {
        self.sync = sync;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All ids in creation order. A missing index file is an empty list.
    ///
    /// # Errors
    ///
    /// [`StoreError::Corrupt`] if the file is not UTF-8.
    pub fn ids(&self) -> Result<Vec<String>> {
        let Some(bytes) = read_optional(&self.span, &self.path)? else {
            return Ok(Vec::new());
        };
        let text = String::from_utf8(bytes).map_err(|_| {
            crate::error::corrupt(&self.span, &self.path, "session index is not UTF-8")
        })?;
        Ok(text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    pub fn contains(&self, id: &str) -> Result<bool> {
        Ok(self.ids()?.iter().any(|i| i == id))
    }

    /// Appends `id` as the newest entry.
    pub fn append(&self, id: &str) -> Result<()> {
        if id.is_empty() || id.contains(['\n', '\r']) {
            return Err(StoreError::InvalidName {
                name: id.to_string(),
            });
        }
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| io_error(&self.span, &self.path, e))?;
        f.write_all(format!("{}\n", id).as_bytes())
            .map_err(|e| io_error(&self.span, &self.path, e))?;
        if self.sync {
            f.sync_all().map_err(|e| io_error(&self.span, &self.path, e))?;
        }
        Ok(())
    }

    /// Drops every occurrence of `id`, rewriting the index atomically.
    ///
    /// Returns `false` (and leaves the file untouched) if `id` was not listed.
    pub fn remove(&self, id: &str) -> Result<bool> {
        let ids = self.ids()?;
        if !ids.iter().any(|i| i == id) {
            return Ok(false);
        }

        let mut contents = String::new();
        let mut remaining = 0usize;
        for kept in ids.iter().filter(|i| *i != id) {
            contents.push_str(kept);
            contents.push('\n');
            remaining += 1;
        }

        let tmp_path = self.path.with_file_name(INDEX_TMP_FILENAME);
        write_atomic(&self.span, &self.path, &tmp_path, contents.as_bytes())?;
        tracing::debug!(parent: &self.span, id, remaining, "session index rewritten");
        Ok(true)
    }
}
