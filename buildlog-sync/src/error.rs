//! Error types for buildlog-sync.
//!
//! [`SyncError`] is the tagged result type the orchestrator matches on;
//! [`VcsError`] and [`IssueError`] are what the version-control and
//! issue-tracker capabilities surface.

use std::path::PathBuf;

use thiserror::Error;

use buildlog_core::{CoreError, SourceError};
use buildlog_renderer::RenderError;

/// Failure of one version-control invocation.
#[derive(Debug, Error)]
pub enum VcsError {
    /// The tool could not be started at all.
    #[error("failed to run `git {args}`: {source}")]
    Spawn {
        args: String,
        #[source]
        source: std::io::Error,
    },

    /// The tool ran and exited non-zero.
    #[error("`git {args}` failed ({status}): {stderr}")]
    Failed {
        args: String,
        status: String,
        stderr: String,
    },
}

/// Failure reported by an issue tracker.
#[derive(Debug, Error)]
pub enum IssueError {
    /// The credentials lack permission for this call. Never fatal.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Any other tracker failure.
    #[error("issue tracker request failed: {0}")]
    Api(String),
}

/// All errors that can arise from a reconciliation run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Photo source rejected our credentials; aborts the run.
    #[error("run aborted: {0}")]
    FatalAuth(#[source] SourceError),

    /// Project listing failed; aborts the run.
    #[error("failed to enumerate remote projects: {0}")]
    Enumeration(#[source] SourceError),

    /// Tracker failure other than a permission denial.
    #[error("issue tracker error: {0}")]
    Issue(#[from] IssueError),

    /// Listing or downloading for one project failed.
    #[error("photo source error: {0}")]
    Source(#[from] SourceError),

    /// Branch preparation failed; the project is skipped for this run.
    #[error("version control error: {0}")]
    VersionControl(#[from] VcsError),

    /// Staging or committing failed. Never treated as success.
    #[error("commit of {path} failed: {source}")]
    Commit {
        path: PathBuf,
        #[source]
        source: VcsError,
    },

    /// A remote project whose name is not a valid slug.
    #[error("rejected remote project: {0}")]
    InvalidProject(#[source] CoreError),

    /// Ledger or config error.
    #[error("state error: {0}")]
    Core(#[from] CoreError),

    #[error("render error: {0}")]
    Render(#[from] RenderError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("metadata JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SyncError {
    /// `true` for the failures that stop a whole run rather than one project.
    pub fn is_run_fatal(&self) -> bool {
        matches!(self, SyncError::FatalAuth(_) | SyncError::Enumeration(_))
    }

    /// Classify a per-project source failure: rejected credentials stop the
    /// run, anything else only the project.
    pub fn from_source(err: SourceError) -> Self {
        match err {
            SourceError::Auth(_) => SyncError::FatalAuth(err),
            other => SyncError::Source(other),
        }
    }
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
