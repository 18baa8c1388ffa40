//! # buildlog-renderer
//!
//! Tera-based rendering of the text buildlog publishes: tracking-issue
//! bodies, sync status comments and commit messages.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use buildlog_renderer::{CommitContext, Renderer};
//!
//! fn message() -> Option<String> {
//!     let renderer = Renderer::new().ok()?;
//!     let ctx = CommitContext { project_name: "deck-repair".into(), new_count: 3 };
//!     renderer.commit_message(&ctx).ok()
//! }
//! ```

pub mod context;
pub mod engine;
pub mod error;

pub use context::{CommitContext, IssueContext, SyncCommentContext};
pub use engine::{Renderer, TemplateEngine, TemplateKind};
pub use error::RenderError;
