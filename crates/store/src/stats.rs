//! Disk usage of a store root.

use std::io;
use std::path::Path;

use tracing::Span;
use walkdir::WalkDir;

use crate::error::{io_error, Result};

/// Byte counts reported by [`DataStore::stats`](crate::DataStore::stats).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiskStats {
    /// Total size of audio clips under `samples/`.
    pub samples_bytes: u64,
    /// Total size of session data under `data/`.
    pub data_bytes: u64,
    /// Space available to unprivileged users on the backing filesystem,
    /// `None` where the platform does not report it.
    pub free_bytes: Option<u64>,
}

/// Sum of the sizes of all regular files below `root`. A missing root is 0.
pub(crate) fn dir_size(span: &Span, root: &Path) -> Result<u64> {
    if !root.exists() {
        return Ok(0);
    }
    let mut total = 0u64;
    for entry in WalkDir::new(root) {
        let entry = match entry {
            Ok(e) => e,
            // files can vanish under a concurrent session delete
            Err(e) if e.io_error().is_some_and(|io| io.kind() == io::ErrorKind::NotFound) => continue,
            Err(e) => {
                let path = e.path().unwrap_or(root).to_path_buf();
                return Err(io_error(span, &path, io::Error::from(e)));
            }
        };
        if entry.file_type().is_file() {
            match entry.metadata() {
                Ok(m) => total += m.len(),
                Err(e) => {
                    if e.io_error().is_some_and(|io| io.kind() == io::ErrorKind::NotFound) {
                        continue;
                    }
                    return Err(io_error(span, entry.path(), io::Error::from(e)));
                }
            }
        }
    }
    Ok(total)
}

/// Free space on the filesystem holding `path`.
#[cfg(unix)]
#[allow(clippy::unnecessary_cast)]
pub(crate) fn free_space(span: &Span, path: &Path) -> Result<Option<u64>> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|e| io_error(span, path, io::Error::new(io::ErrorKind::InvalidInput, e)))?;
    // SAFETY: statvfs is plain old data; an all-zero value is valid.
    let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };
    // SAFETY: `c_path` is NUL-terminated and `stat` is a valid out-pointer.
    let rc = unsafe { libc::statvfs(c_path.as_ptr(), &mut stat) };
    if rc != 0 {
        return Err(io_error(span, path, io::Error::last_os_error()));
    }
    Ok(Some(stat.f_bavail as u64 * stat.f_frsize as u64))
}

#[cfg(not(unix))]
pub(crate) fn free_space(_span: &Span, _path: &Path) -> Result<Option<u64>> {
    Ok(None)
}
