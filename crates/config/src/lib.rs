//! # Config - store settings from the environment
//!
//! All settings are read from environment variables with fallbacks:
//!
//! ```text
//! SPECSTORE_ROOT        store root directory        (default: "store")
//! SPECSTORE_SAMPLE_EXT  audio clip file extension   (default: "ogg")
//! SPECSTORE_SYNC        fsync every append          (default: "false")
//! SPECSTORE_LOG         default log level           (default: "info")
//! ```
//!
//! Unparseable values fall back to the default rather than failing startup.

use std::path::{Path, PathBuf};

pub const ROOT_VAR: &str = "SPECSTORE_ROOT";
pub const SAMPLE_EXT_VAR: &str = "SPECSTORE_SAMPLE_EXT";
pub const SYNC_VAR: &str = "SPECSTORE_SYNC";
pub const LOG_VAR: &str = "SPECSTORE_LOG";

pub const DEFAULT_ROOT: &str = "store";
pub const DEFAULT_SAMPLE_EXT: &str = "ogg";
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Settings for one data store instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Directory holding `data/`, `settings/` and `samples/`.
    pub root: PathBuf,
    /// Extension of audio clip files written next to the store.
    pub sample_ext: String,
    /// If `true`, every append and rewrite is followed by `fsync`.
    pub sync: bool,
    /// Default `tracing` level when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_ROOT),
            sample_ext: DEFAULT_SAMPLE_EXT.to_string(),
            sync: false,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

/// Reads a configuration value from the environment, falling back to `default`.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

impl StoreConfig {
    /// Builds a config from `SPECSTORE_*` variables.
    pub fn from_env() -> Self {
        let ext = env_or(SAMPLE_EXT_VAR, DEFAULT_SAMPLE_EXT);
        Self {
            root: PathBuf::from(env_or(ROOT_VAR, DEFAULT_ROOT)),
            sample_ext: ext.trim_start_matches('.').to_string(),
            sync: env_or(SYNC_VAR, "false").parse().unwrap_or(false),
            log_level: env_or(LOG_VAR, DEFAULT_LOG_LEVEL),
        }
    }

    /// Same config rooted at `root`.
    #[must_use]
    pub fn with_root<P: AsRef<Path>>(mut self, root: P) -> Self {
        self.root = root.as_ref().to_path_buf();
        self
    }

    #[must_use]
    pub fn with_sync(mut self, sync: bool) -> Self {
        self.sync = sync;
        self
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join("data")
    }

    pub fn settings_dir(&self) -> PathBuf {
        self.root.join("settings")
    }

    pub fn samples_dir(&self) -> PathBuf {
        self.root.join("samples")
    }
}
