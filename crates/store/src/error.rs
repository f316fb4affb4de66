use std::io;
use std::path::{Path, PathBuf};

use stream::StreamError;
use thiserror::Error;
use tracing::Span;

/// Errors returned by sessions, settings and the data store facade.
///
/// Missing stream files are never an error; they read as empty.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The handle was used before `create` or `read` loaded it.
    #[error("session is not initialised (create or read it first)")]
    UninitializedSession,

    /// The handle was used after `delete`.
    #[error("session {id} has been deleted")]
    InvalidSession { id: String },

    /// `create` on an id whose directory already exists.
    #[error("session {id} already exists")]
    AlreadyExists { id: String },

    /// Settings read with nothing stored and no defaults supplied.
    #[error("no settings stored for '{name}'")]
    NoSettings { name: String },

    /// Fixed-width payload differs from the width the stream was created with.
    #[error("payload width mismatch: stream stores {expected} bytes, got {actual}")]
    WidthMismatch { expected: usize, actual: usize },

    /// A header, index or document that is structurally invalid.
    #[error("corrupt file {}: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },

    /// Filesystem failure (permission, disk full, ...), with the path involved.
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A configuration or settings document that is not valid JSON.
    #[error("invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A worker, settings or session name that cannot be used as a path component.
    #[error("invalid name '{name}'")]
    InvalidName { name: String },
}

/// A specialized Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

impl From<StreamError> for StoreError {
    fn from(err: StreamError) -> Self {
        match err {
            StreamError::Io { path, source } => Self::Io { path, source },
            StreamError::WidthMismatch { expected, actual } => {
                Self::WidthMismatch { expected, actual }
            }
            StreamError::Corrupt { path, reason } => Self::Corrupt { path, reason },
        }
    }
}

impl StoreError {
    /// Returns `true` for an I/O error caused by a missing file or directory.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}

/// Logs a filesystem failure against `span` and wraps it with its path.
pub(crate) fn io_error(span: &Span, path: &Path, source: io::Error) -> StoreError {
    tracing::error!(parent: span, path = %path.display(), error = %source, "store i/o failed");
    StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

pub(crate) fn corrupt(span: &Span, path: &Path, reason: impl Into<String>) -> StoreError {
    let reason = reason.into();
    tracing::error!(parent: span, path = %path.display(), %reason, "corrupt store file");
    StoreError::Corrupt {
        path: path.to_path_buf(),
        reason,
    }
}

pub(crate) fn json_error(span: &Span, path: &Path, source: serde_json::Error) -> StoreError {
    tracing::error!(parent: span, path = %path.display(), error = %source, "invalid JSON document");
    StoreError::Json {
        path: path.to_path_buf(),
        source,
    }
}
