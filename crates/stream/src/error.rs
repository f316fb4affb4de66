use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::Span;

/// Errors raised by fixed and variable stream operations.
///
/// A stream whose files do not exist yet is not an error; it reads as empty.
#[derive(Debug, Error)]
pub enum StreamError {
    /// An underlying filesystem error, tagged with the file it came from.
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A fixed-width append whose payload differs from the stream's width.
    #[error("payload width mismatch: stream stores {expected} bytes, got {actual}")]
    WidthMismatch { expected: usize, actual: usize },

    /// A header or index that cannot be valid.
    #[error("corrupt stream file {}: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },
}

/// Logs a filesystem failure against `span` and wraps it with its path.
pub(crate) fn io_error(span: &Span, path: &Path, source: io::Error) -> StreamError {
    tracing::error!(parent: span, path = %path.display(), error = %source, "stream i/o failed");
    StreamError::Io {
        path: path.to_path_buf(),
        source,
    }
}

pub(crate) fn corrupt(span: &Span, path: &Path, reason: impl Into<String>) -> StreamError {
    let reason = reason.into();
    tracing::error!(parent: span, path = %path.display(), %reason, "corrupt stream file");
    StreamError::Corrupt {
        path: path.to_path_buf(),
        reason,
    }
}
