//! Log subscriber for the shell binary.
//!
//! The store crates only emit events under the span they are handed; this is
//! the one place a global subscriber is installed. Output goes to stderr so
//! command replies on stdout stay machine-readable.

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Crates whose events pass the default filter.
const LOG_TARGETS: [&str; 3] = ["cli", "store", "stream"];

/// Verbosity level for logging output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Errors only.
    Quiet,
    /// Warnings and errors.
    Warn,
    /// info and above.
    #[default]
    Normal,
    /// debug and above.
    Verbose,
    /// Everything.
    Trace,
}

impl Verbosity {
    #[must_use]
    pub fn to_level_filter(&self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Warn => Level::WARN,
            Self::Normal => Level::INFO,
            Self::Verbose => Level::DEBUG,
            Self::Trace => Level::TRACE,
        }
    }

    /// Parses a level name such as `"debug"` (the `SPECSTORE_LOG` value).
    pub fn from_level(level: &str) -> Option<Self> {
        match level.trim().to_ascii_lowercase().as_str() {
            "error" | "quiet" => Some(Self::Quiet),
            "warn" | "warning" => Some(Self::Warn),
            "info" => Some(Self::Normal),
            "debug" => Some(Self::Verbose),
            "trace" => Some(Self::Trace),
            _ => None,
        }
    }

    fn default_filter(&self) -> String {
        let level = self.to_level_filter();
        LOG_TARGETS
            .iter()
            .map(|t| format!("{}={}", t, level))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Installs the fmt subscriber. `RUST_LOG` takes precedence over `verbosity`.
///
/// Calling it again is a no-op.
pub fn init_logging(verbosity: Verbosity) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.default_filter()));

    let subscriber = tracing_subscriber::registry().with(env_filter).with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false),
    );

    let _ = subscriber.try_init();
}
