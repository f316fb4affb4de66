//! Directory layout of a store root.
//!
//! ```text
//! data/index                                  session ids, creation order
//! data/<session>/config                       configuration document (JSON)
//! data/<session>/format                       [magic u32 LE "SPS1"][created u64 LE]
//! data/<session>/worker_<name>/spectrum/      fixed, i8 per bin
//! data/<session>/worker_<name>/audio/         fixed, u32 channel index
//! data/<session>/worker_<name>/temperature/   fixed, f32
//! data/<session>/worker_<name>/rds/name/      variable, key = channel index
//! data/<session>/worker_<name>/rds/text/      variable, key = channel index
//! data/<session>/worker_<name>/error/         variable, key = 0
//! settings/<name>                             JSON document
//! samples/<session>/<worker>/<channel>/<timestamp>.<ext>
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{Result, StoreError};

pub const DATA_DIRNAME: &str = "data";
pub const SETTINGS_DIRNAME: &str = "settings";
pub const SAMPLES_DIRNAME: &str = "samples";

pub const CONFIG_FILENAME: &str = "config";
pub const FORMAT_FILENAME: &str = "format";

/// Prefix of a worker's directory inside a session.
pub const WORKER_PREFIX: &str = "worker_";

/// Magic at the start of every session `format` file (ASCII "SPS1").
pub const FORMAT_MAGIC: u32 = 0x5350_5331;

/// Size of the session `format` file: magic + creation timestamp.
pub const FORMAT_BYTES: usize = codec::WORD_BYTES + codec::TIMESTAMP_BYTES;

/// The kinds of stream a worker can write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StreamKind {
    Spectrum,
    Audio,
    Temperature,
    RdsName,
    RdsText,
    Error,
}

impl StreamKind {
    pub const ALL: [StreamKind; 6] = [
        StreamKind::Spectrum,
        StreamKind::Audio,
        StreamKind::Temperature,
        StreamKind::RdsName,
        StreamKind::RdsText,
        StreamKind::Error,
    ];

    /// Whether records of this kind have a constant payload width.
    #[must_use]
    pub fn is_fixed(self) -> bool {
        matches!(
            self,
            StreamKind::Spectrum | StreamKind::Audio | StreamKind::Temperature
        )
    }

    /// Stream directory relative to the worker directory.
    pub fn relative_dir(self) -> PathBuf {
        match self {
            StreamKind::Spectrum => PathBuf::from("spectrum"),
            StreamKind::Audio => PathBuf::from("audio"),
            StreamKind::Temperature => PathBuf::from("temperature"),
            StreamKind::RdsName => Path::new("rds").join("name"),
            StreamKind::RdsText => Path::new("rds").join("text"),
            StreamKind::Error => PathBuf::from("error"),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StreamKind::Spectrum => "spectrum",
            StreamKind::Audio => "audio",
            StreamKind::Temperature => "temperature",
            StreamKind::RdsName => "name",
            StreamKind::RdsText => "text",
            StreamKind::Error => "error",
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StreamKind {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "spectrum" => Ok(StreamKind::Spectrum),
            "audio" => Ok(StreamKind::Audio),
            "temperature" | "temp" => Ok(StreamKind::Temperature),
            "name" | "rds_name" => Ok(StreamKind::RdsName),
            "text" | "rds_text" => Ok(StreamKind::RdsText),
            "error" => Ok(StreamKind::Error),
            _ => Err(StoreError::InvalidName {
                name: s.to_string(),
            }),
        }
    }
}

/// Checks that `name` is usable as a single path component.
///
/// Rejects empty names, names starting with `.` (which also rules out
/// `.`/`..` and the store's own tmp files), separators and control characters.
pub fn validate_name(name: &str) -> Result<()> {
    let bad = name.is_empty()
        || name.starts_with('.')
        || name.chars().any(|c| c == '/' || c == '\\' || c.is_control());
    if bad {
        return Err(StoreError::InvalidName {
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Directory of `worker` inside `session_dir`.
pub fn worker_dir(session_dir: &Path, worker: &str) -> PathBuf {
    session_dir.join(format!("{}{}", WORKER_PREFIX, worker))
}
