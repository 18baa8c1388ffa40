//! Runtime configuration.
//!
//! Read from an optional `buildlog.yaml` at the repository root (or an
//! explicit path). Every field has a default, so the file may be absent.
//! Secrets never come from the file: the issue-tracker token is read from
//! the environment by [`Config::apply_env`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{io_err, CoreError};

/// Default config file name, looked up in the repository root.
pub const CONFIG_FILE_NAME: &str = "buildlog.yaml";

/// Commit author used for sync commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitIdentity {
    pub name: String,
    pub email: String,
}

impl Default for GitIdentity {
    fn default() -> Self {
        Self {
            name: "Construction Bot".to_string(),
            email: "noreply@nordhus.site".to_string(),
        }
    }
}

/// Issue tracker coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IssueConfig {
    pub owner: Option<String>,
    pub repo: Option<String>,
    pub labels: Vec<String>,
    pub api_base: String,
}

impl Default for IssueConfig {
    fn default() -> Self {
        Self {
            owner: None,
            repo: None,
            labels: vec!["construction".to_string(), "auto-generated".to_string()],
            api_base: "https://api.github.com".to_string(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Master switch; `ENABLE_PHOTO_MONITORING=false` turns it off.
    pub enabled: bool,
    /// Ledger location, relative to the repository root.
    pub state_file: PathBuf,
    /// Parent of every project photo directory, relative to the repository root.
    pub images_root: PathBuf,
    /// Root of the local album photo source, relative to the repository root.
    pub albums_dir: PathBuf,
    pub branch_prefix: String,
    pub main_branch: String,
    pub remote: String,
    pub git_identity: GitIdentity,
    pub issues: IssueConfig,
    /// Directory of `.tera` files overriding the built-in templates.
    pub templates_dir: Option<PathBuf>,
    /// Issue tracker token; environment only.
    #[serde(skip)]
    pub issue_token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enabled: true,
            state_file: PathBuf::from(".github/construction-project-state.json"),
            images_root: PathBuf::from("assets/images"),
            albums_dir: PathBuf::from("albums"),
            branch_prefix: "project/".to_string(),
            main_branch: "main".to_string(),
            remote: "origin".to_string(),
            git_identity: GitIdentity::default(),
            issues: IssueConfig::default(),
            templates_dir: None,
            issue_token: None,
        }
    }
}

impl Config {
    /// Load configuration.
    ///
    /// With `explicit = Some(path)` the file must exist. Otherwise
    /// `<repo_root>/buildlog.yaml` is used when present and defaults when not.
    pub fn load(repo_root: &Path, explicit: Option<&Path>) -> Result<Self, CoreError> {
        let path = match explicit {
            Some(path) if !path.exists() => {
                return Err(CoreError::ConfigNotFound {
                    path: path.to_path_buf(),
                })
            }
            Some(path) => path.to_path_buf(),
            None => {
                let candidate = repo_root.join(CONFIG_FILE_NAME);
                if !candidate.exists() {
                    return Ok(Self::default());
                }
                candidate
            }
        };
        let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        Self::from_yaml(&contents).map_err(|source| CoreError::Config { path, source })
    }

    pub fn from_yaml(contents: &str) -> Result<Self, serde_yaml::Error> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(contents)
    }

    /// Overlay environment values. `lookup` is `std::env::var(..).ok()` in
    /// production and a map in tests.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(flag) = lookup("ENABLE_PHOTO_MONITORING") {
            self.enabled = flag.trim().eq_ignore_ascii_case("true");
        }
        self.issue_token = lookup("GITHUB_TOKEN").filter(|t| !t.trim().is_empty());
    }

    /// Names of settings that are required but missing.
    pub fn validate(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if self.issue_token.is_some() {
            if self.issues.owner.is_none() {
                missing.push("issues.owner".to_string());
            }
            if self.issues.repo.is_none() {
                missing.push("issues.repo".to_string());
            }
        }
        if self.main_branch.trim().is_empty() {
            missing.push("main_branch".to_string());
        }
        missing
    }

    /// Resolve a configured relative path against the repository root.
    pub fn resolve(repo_root: &Path, configured: &Path) -> PathBuf {
        if configured.is_absolute() {
            configured.to_path_buf()
        } else {
            repo_root.join(configured)
        }
    }
}
