//! Small filesystem helpers shared by the index, settings and sessions.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use tracing::Span;

use crate::error::{io_error, Result};
use crate::index::INDEX_TMP_FILENAME;

/// Replaces `path` with `contents` via `tmp_path`: write, fsync, rename.
///
/// Either the old or the new contents survive a crash. If the rename fails
/// (Windows refuses to rename over a file that is still cached), the target
/// is truncated and written directly instead.
pub(crate) fn write_atomic(span: &Span, path: &Path, tmp_path: &Path, contents: &[u8]) -> Result<()> {
    {
        let mut f = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(tmp_path)
            .map_err(|e| io_error(span, tmp_path, e))?;
        f.write_all(contents).map_err(|e| io_error(span, tmp_path, e))?;
        f.sync_all().map_err(|e| io_error(span, tmp_path, e))?;
    }

    if fs::rename(tmp_path, path).is_err() {
        let mut f = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .map_err(|e| io_error(span, path, e))?;
        f.write_all(contents).map_err(|e| io_error(span, path, e))?;
        f.sync_all().map_err(|e| io_error(span, path, e))?;

        let _ = fs::remove_file(tmp_path);
    }

    // A crash after rename but before the directory is synced can lose the
    // new entry on ext4/XFS.
    if let Some(parent) = path.parent() {
        if let Ok(dir) = fs::File::open(parent) {
            let _ = dir.sync_all();
        }
    }
    Ok(())
}

/// Removes a directory tree; a tree that is already gone is fine.
pub(crate) fn remove_tree(span: &Span, path: &Path) -> Result<bool> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(io_error(span, path, e)),
    }
}

/// Reads a whole file; a missing file is `Ok(None)`.
pub(crate) fn read_optional(span: &Span, path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(io_error(span, path, e)),
    }
}

/// Whether `name` is a tmp file left behind by [`write_atomic`]: `index.tmp`
/// or a dotted `.<name>.tmp`. User-chosen names never start with a dot.
pub(crate) fn is_store_tmp(name: &str) -> bool {
    name == INDEX_TMP_FILENAME || (name.starts_with('.') && name.ends_with(".tmp"))
}

/// Deletes leftover tmp files from interrupted atomic writes in `dir`.
pub(crate) fn cleanup_tmp_files(span: &Span, dir: &Path) {
    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            let p = entry.path();
            if let Some(name) = p.file_name().and_then(|n| n.to_str()) {
                if is_store_tmp(name) && p.is_file() {
                    tracing::debug!(parent: span, path = %p.display(), "removing leftover tmp file");
                    let _ = fs::remove_file(&p);
                }
            }
        }
    }
}
