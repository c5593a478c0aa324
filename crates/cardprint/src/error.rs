use std::path::PathBuf;

use cardprint_export::ExportError;

/// Errors that abort a whole run.
///
/// Per-card failures never surface here; they become skips.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Reading or writing a file failed.
    #[error("{}: {source}", path.display())]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The card catalog is not valid JSON of the expected shape.
    #[error("invalid catalog {}: {source}", path.display())]
    Catalog {
        /// Catalog file.
        path: PathBuf,
        /// Parse error.
        source: serde_json::Error,
    },

    /// `--config-json` could not be parsed.
    #[error("invalid --config-json: {0}")]
    Config(#[source] serde_json::Error),

    /// Assembling an output document failed.
    #[error(transparent)]
    Export(#[from] ExportError),

    /// The feature extractor could not be constructed.
    #[error("extractor setup failed: {0}")]
    Extractor(String),

    /// The worker pool could not be started.
    #[error("failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// Serializing the skip report failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
