//! # buildlog-sync
//!
//! Reconciliation engine: detects new photos on a [`PhotoSource`], commits
//! them to a per-project branch and keeps a tracking issue up to date.
//!
//! Build a [`SyncOrchestrator`] from its collaborators and call
//! [`SyncOrchestrator::run`], or [`SyncOrchestrator::plan`] for a dry run.
//!
//! [`PhotoSource`]: buildlog_core::PhotoSource

pub mod branch;
pub mod context;
pub mod detect;
pub mod error;
pub mod issue;
pub mod orchestrator;
pub mod vcs;
pub mod writer;

pub use branch::{BranchController, BranchResolution, WorkTreeGate};
pub use context::{Clock, FixedClock, SyncContext, SystemClock};
pub use detect::{ChangeDetector, DetectedImage, Sha256Fingerprinter};
pub use error::{IssueError, SyncError, VcsError};
pub use issue::{Issue, IssueCoordinator, IssueTracker, NoopTracker};
pub use orchestrator::{
    PlanReport, ProjectOutcome, ProjectPlan, ProjectReport, RunReport, SyncOrchestrator,
};
pub use vcs::{GitCli, VersionControl};
pub use writer::{write_metadata, ProjectMetadata, METADATA_FILE_NAME};
