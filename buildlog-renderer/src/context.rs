//! Template contexts: serializable payloads for each [`TemplateKind`].
//!
//! [`TemplateKind`]: crate::engine::TemplateKind

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use buildlog_core::{naming, BranchName, ProjectName};

use crate::error::RenderError;

/// Timestamp format used in published text.
const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M UTC";

/// Payload for a new tracking issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueContext {
    pub project_name: String,
    pub project_title: String,
    pub project_url: String,
    pub branch_name: String,
    pub tag: String,
    pub started_at: String,
}

impl IssueContext {
    pub fn new(
        name: &ProjectName,
        project_title: &str,
        project_url: &str,
        branch: &BranchName,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            project_name: name.to_string(),
            project_title: project_title.to_string(),
            project_url: project_url.to_string(),
            branch_name: branch.to_string(),
            tag: naming::project_tag(name),
            started_at: started_at.format(DISPLAY_FORMAT).to_string(),
        }
    }
}

/// Payload for a sync status comment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncCommentContext {
    pub branch_name: String,
    pub new_count: usize,
    pub total_count: usize,
    pub synced_at: String,
}

impl SyncCommentContext {
    pub fn new(
        branch: &BranchName,
        total_count: usize,
        new_count: usize,
        synced_at: DateTime<Utc>,
    ) -> Self {
        Self {
            branch_name: branch.to_string(),
            new_count,
            total_count,
            synced_at: synced_at.format(DISPLAY_FORMAT).to_string(),
        }
    }
}

/// Payload for a sync commit message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitContext {
    pub project_name: String,
    pub new_count: usize,
}

pub(crate) fn to_tera_context<T: Serialize>(ctx: &T) -> Result<tera::Context, RenderError> {
    let value = serde_json::to_value(ctx)?;
    Ok(tera::Context::from_value(value)?)
}
