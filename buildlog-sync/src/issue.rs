//! Tracking issues: find-or-create per project, best-effort status comments.
//!
//! Issue tracking is cosmetic. A permission failure never stops a photo
//! sync; it only leaves the project without an issue for this run.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use buildlog_core::{naming, BranchName, IssueId, ProjectName};
use buildlog_renderer::{IssueContext, Renderer, SyncCommentContext};

use crate::error::{IssueError, SyncError};

/// An open issue as reported by the tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub number: IssueId,
    pub title: String,
}

/// Minimal issue-tracker surface.
///
/// Implementations must report missing permissions as
/// [`IssueError::PermissionDenied`], distinct from other failures.
pub trait IssueTracker {
    /// First open issue whose title equals `title` exactly.
    fn find_issue(&self, title: &str) -> Result<Option<Issue>, IssueError>;

    fn create_issue(&self, title: &str, body: &str, labels: &[String]) -> Result<Issue, IssueError>;

    fn add_comment(&self, issue: IssueId, body: &str) -> Result<(), IssueError>;
}

/// Tracker used when no credentials are configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracker;

impl IssueTracker for NoopTracker {
    fn find_issue(&self, _title: &str) -> Result<Option<Issue>, IssueError> {
        Err(IssueError::PermissionDenied("issue tracking is not configured".into()))
    }

    fn create_issue(&self, _title: &str, _body: &str, _labels: &[String]) -> Result<Issue, IssueError> {
        Err(IssueError::PermissionDenied("issue tracking is not configured".into()))
    }

    fn add_comment(&self, _issue: IssueId, _body: &str) -> Result<(), IssueError> {
        Err(IssueError::PermissionDenied("issue tracking is not configured".into()))
    }
}

pub struct IssueCoordinator {
    tracker: Box<dyn IssueTracker>,
    renderer: Arc<Renderer>,
    labels: Vec<String>,
}

impl IssueCoordinator {
    pub fn new(tracker: Box<dyn IssueTracker>, renderer: Arc<Renderer>, labels: Vec<String>) -> Self {
        Self {
            tracker,
            renderer,
            labels,
        }
    }

    /// Reuse the project's open issue or open a new one.
    ///
    /// Returns `Ok(None)` when permissions prevent both. A non-permission
    /// failure while searching is returned as an error instead of falling
    /// through to create, so an outage never produces a duplicate issue.
    pub fn ensure_issue(
        &self,
        name: &ProjectName,
        project_title: &str,
        project_url: &str,
        branch: &BranchName,
        now: DateTime<Utc>,
    ) -> Result<Option<IssueId>, SyncError> {
        let title = naming::issue_title(name);

        match self.tracker.find_issue(&title) {
            Ok(Some(issue)) => {
                tracing::info!(project = %name, issue = %issue.number, "reusing existing issue");
                return Ok(Some(issue.number));
            }
            Ok(None) => {}
            Err(IssueError::PermissionDenied(msg)) => {
                tracing::warn!(project = %name, error = %msg, "cannot search issues");
            }
            Err(err @ IssueError::Api(_)) => return Err(err.into()),
        }

        let ctx = IssueContext::new(name, project_title, project_url, branch, now);
        let body = self.renderer.issue_body(&ctx)?;
        match self.tracker.create_issue(&title, &body, &self.labels) {
            Ok(issue) => {
                tracing::info!(project = %name, issue = %issue.number, "created issue");
                Ok(Some(issue.number))
            }
            Err(IssueError::PermissionDenied(msg)) => {
                tracing::warn!(
                    project = %name,
                    error = %msg,
                    "cannot create issue; project will be tracked without one"
                );
                Ok(None)
            }
            Err(err @ IssueError::Api(_)) => Err(err.into()),
        }
    }

    /// Find-only lookup for a tracked project that has no issue yet.
    ///
    /// Every failure leaves the project unlinked.
    pub fn link_existing(&self, name: &ProjectName) -> Option<IssueId> {
        match self.tracker.find_issue(&naming::issue_title(name)) {
            Ok(Some(issue)) => {
                tracing::info!(project = %name, issue = %issue.number, "linked existing issue");
                Some(issue.number)
            }
            Ok(None) => None,
            Err(err) => {
                tracing::debug!(project = %name, error = %err, "issue lookup skipped");
                None
            }
        }
    }

    /// Comment on `issue` with the sync result. Failures are logged only.
    pub fn post_update(
        &self,
        issue: IssueId,
        branch: &BranchName,
        total_count: usize,
        new_count: usize,
        now: DateTime<Utc>,
    ) {
        let ctx = SyncCommentContext::new(branch, total_count, new_count, now);
        let body = match self.renderer.sync_comment(&ctx) {
            Ok(body) => body,
            Err(err) => {
                tracing::warn!(issue = %issue, error = %err, "could not render sync comment");
                return;
            }
        };
        match self.tracker.add_comment(issue, &body) {
            Ok(()) => tracing::debug!(issue = %issue, "posted sync comment"),
            Err(err) => tracing::warn!(issue = %issue, error = %err, "sync comment not posted"),
        }
    }
}
