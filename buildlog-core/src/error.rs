//! Error types for buildlog-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from ledger, naming and config operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Underlying I/O failure, annotated with the path involved.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization error (save path).
    #[error("state serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// JSON parse error on load: includes file path and line context from serde_json.
    #[error("failed to parse state file at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// YAML parse error while reading the config file.
    #[error("failed to parse config at {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// An explicitly requested config file does not exist.
    #[error("config file not found at {path}")]
    ConfigNotFound { path: PathBuf },

    /// A project name that is not a valid slug.
    #[error("invalid project name '{name}': expected lowercase letters, digits and '-'")]
    InvalidProjectName { name: String },

    /// The state file was written by a newer schema than this build understands.
    #[error("state file {path} has schema version {found}; this build supports up to {supported}")]
    UnsupportedSchema {
        path: PathBuf,
        found: u32,
        supported: u32,
    },
}

/// Convenience constructor for [`CoreError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> CoreError {
    CoreError::Io {
        path: path.into(),
        source,
    }
}
