//! buildlog core library: domain types, ledger persistence, naming rules,
//! configuration and the capability traits the sync engine consumes.
//!
//! - [`types`]: newtypes and ledger structs
//! - [`error`]: [`CoreError`]
//! - [`naming`]: slugs, branch names, project directories, issue titles
//! - [`state`]: [`StateStore`] load / save
//! - [`config`]: [`Config`]
//! - [`source`]: [`PhotoSource`] and [`Fingerprinter`]

pub mod config;
pub mod error;
pub mod naming;
pub mod source;
pub mod state;
pub mod types;

pub use config::Config;
pub use error::CoreError;
pub use source::{Fingerprinter, ImageMetadata, PhotoSource, RemoteImage, RemoteProject, SourceError};
pub use state::StateStore;
pub use types::{
    BranchName, ImageHash, ImageRecord, IssueId, Project, ProjectName, SyncState, SCHEMA_VERSION,
};
