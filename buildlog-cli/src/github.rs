//! GitHub issues over the REST API.

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use buildlog_core::IssueId;
use buildlog_sync::{Issue, IssueError, IssueTracker};

/// Upper bound on pages followed while searching open issues.
const MAX_SEARCH_PAGES: usize = 50;

#[derive(Debug, Deserialize)]
struct GhIssue {
    number: u64,
    title: String,
}

impl From<GhIssue> for Issue {
    fn from(gh: GhIssue) -> Self {
        Issue {
            number: IssueId(gh.number),
            title: gh.title,
        }
    }
}

pub struct GithubTracker {
    agent: ureq::Agent,
    repo_url: String,
    token: String,
    search_label: Option<String>,
}

impl GithubTracker {
    pub fn new(api_base: &str, owner: &str, repo: &str, token: String, labels: &[String]) -> Self {
        Self {
            agent: ureq::AgentBuilder::new()
                .timeout(Duration::from_secs(30))
                .build(),
            repo_url: format!("{}/repos/{owner}/{repo}", api_base.trim_end_matches('/')),
            token,
            search_label: labels.first().cloned(),
        }
    }

    fn request(&self, method: &str, endpoint: &str) -> ureq::Request {
        self.authorized(self.agent.request(method, &format!("{}/{endpoint}", self.repo_url)))
    }

    fn authorized(&self, req: ureq::Request) -> ureq::Request {
        req.set("Authorization", &format!("token {}", self.token))
            .set("Accept", "application/vnd.github.v3+json")
            .set("User-Agent", concat!("buildlog/", env!("CARGO_PKG_VERSION")))
    }
}

fn map_err(err: ureq::Error) -> IssueError {
    match err {
        ureq::Error::Status(403, resp) => {
            IssueError::PermissionDenied(resp.into_string().unwrap_or_default())
        }
        ureq::Error::Status(code, resp) => {
            IssueError::Api(format!("{code}: {}", resp.into_string().unwrap_or_default()))
        }
        ureq::Error::Transport(t) => IssueError::Api(t.to_string()),
    }
}

fn decode_err(err: std::io::Error) -> IssueError {
    IssueError::Api(format!("unexpected response body: {err}"))
}

/// The `rel="next"` target of a `Link` header, if any.
fn next_link(header: &str) -> Option<String> {
    header.split(',').find_map(|part| {
        let (target, params) = part.split_once(';')?;
        params
            .split(';')
            .any(|p| p.trim() == r#"rel="next""#)
            .then(|| target.trim().trim_start_matches('<').trim_end_matches('>').to_string())
    })
}

impl IssueTracker for GithubTracker {
    /// Searches open issues under the first label, following `Link`
    /// pagination up to [`MAX_SEARCH_PAGES`] pages.
    fn find_issue(&self, title: &str) -> Result<Option<Issue>, IssueError> {
        let mut req = self
            .request("GET", "issues")
            .query("state", "open")
            .query("per_page", "100");
        if let Some(label) = &self.search_label {
            req = req.query("labels", label);
        }

        for _ in 0..MAX_SEARCH_PAGES {
            let resp = req.call().map_err(map_err)?;
            let next = resp.header("link").and_then(next_link);
            let issues: Vec<GhIssue> = resp.into_json().map_err(decode_err)?;
            if let Some(found) = issues.into_iter().find(|i| i.title == title) {
                return Ok(Some(found.into()));
            }
            match next {
                Some(url) => req = self.authorized(self.agent.get(&url)),
                None => return Ok(None),
            }
        }
        tracing::warn!(pages = MAX_SEARCH_PAGES, "issue search stopped at page limit");
        Ok(None)
    }

    fn create_issue(&self, title: &str, body: &str, labels: &[String]) -> Result<Issue, IssueError> {
        let created: GhIssue = self
            .request("POST", "issues")
            .send_json(json!({ "title": title, "body": body, "labels": labels }))
            .map_err(map_err)?
            .into_json()
            .map_err(decode_err)?;
        Ok(created.into())
    }

    fn add_comment(&self, issue: IssueId, body: &str) -> Result<(), IssueError> {
        self.request("POST", &format!("issues/{}/comments", issue.0))
            .send_json(json!({ "body": body }))
            .map_err(map_err)?;
        Ok(())
    }
}
