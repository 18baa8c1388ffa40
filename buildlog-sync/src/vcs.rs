//! Version-control capability and its `git` subprocess implementation.
//!
//! Every method is one blocking invocation of the tool. No retries and no
//! timeouts are applied here.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use crate::error::VcsError;

/// The version-control operations the branch controller needs.
pub trait VersionControl {
    /// `true` if `branch` exists as a local branch.
    fn local_branch_exists(&self, branch: &str) -> Result<bool, VcsError>;

    /// `true` if `branch` exists on `remote`. Makes a network call.
    fn remote_branch_exists(&self, remote: &str, branch: &str) -> Result<bool, VcsError>;

    /// Switch to an existing local branch.
    fn checkout(&self, branch: &str) -> Result<(), VcsError>;

    /// Create `branch` (from `start_point` when given, otherwise from HEAD)
    /// and switch to it.
    fn checkout_new(&self, branch: &str, start_point: Option<&str>) -> Result<(), VcsError>;

    fn fetch(&self, remote: &str, branch: &str) -> Result<(), VcsError>;

    fn pull(&self, remote: &str, branch: &str) -> Result<(), VcsError>;

    /// Stage everything under `path` (relative to the working tree root).
    fn stage(&self, path: &Path) -> Result<(), VcsError>;

    /// `true` if the index differs from HEAD.
    fn has_staged_changes(&self) -> Result<bool, VcsError>;

    fn commit(&self, message: &str) -> Result<(), VcsError>;

    /// Set the commit author for this working tree.
    fn set_identity(&self, name: &str, email: &str) -> Result<(), VcsError>;
}

/// [`VersionControl`] backed by the `git` executable.
#[derive(Debug, Clone)]
pub struct GitCli {
    workdir: PathBuf,
    program: OsString,
}

impl GitCli {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            program: OsString::from("git"),
        }
    }

    /// Use a different executable (for example an absolute path to git).
    pub fn with_program(mut self, program: impl Into<OsString>) -> Self {
        self.program = program.into();
        self
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn output(&self, args: &[&str]) -> Result<Output, VcsError> {
        tracing::debug!(workdir = %self.workdir.display(), "git {}", args.join(" "));
        Command::new(&self.program)
            .current_dir(&self.workdir)
            .args(args)
            .output()
            .map_err(|source| VcsError::Spawn {
                args: args.join(" "),
                source,
            })
    }

    /// Run and require exit status 0; returns stdout.
    fn run(&self, args: &[&str]) -> Result<String, VcsError> {
        let output = self.output(args)?;
        if !output.status.success() {
            return Err(VcsError::Failed {
                args: args.join(" "),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl VersionControl for GitCli {
    fn local_branch_exists(&self, branch: &str) -> Result<bool, VcsError> {
        let stdout = self.run(&["branch", "--list", branch, "--format=%(refname:short)"])?;
        Ok(stdout.lines().any(|line| line.trim() == branch))
    }

    fn remote_branch_exists(&self, remote: &str, branch: &str) -> Result<bool, VcsError> {
        let stdout = self.run(&["ls-remote", "--heads", remote, branch])?;
        let wanted = format!("refs/heads/{branch}");
        Ok(stdout
            .lines()
            .filter_map(|line| line.split_whitespace().nth(1))
            .any(|r| r == wanted))
    }

    fn checkout(&self, branch: &str) -> Result<(), VcsError> {
        self.run(&["checkout", branch]).map(drop)
    }

    fn checkout_new(&self, branch: &str, start_point: Option<&str>) -> Result<(), VcsError> {
        match start_point {
            Some(start) => self.run(&["checkout", "-b", branch, start]).map(drop),
            None => self.run(&["checkout", "-b", branch]).map(drop),
        }
    }

    fn fetch(&self, remote: &str, branch: &str) -> Result<(), VcsError> {
        self.run(&["fetch", remote, branch]).map(drop)
    }

    fn pull(&self, remote: &str, branch: &str) -> Result<(), VcsError> {
        self.run(&["pull", remote, branch]).map(drop)
    }

    fn stage(&self, path: &Path) -> Result<(), VcsError> {
        let path = path.to_string_lossy();
        self.run(&["add", "--", &*path]).map(drop)
    }

    fn has_staged_changes(&self) -> Result<bool, VcsError> {
        // `diff --cached --quiet` exits 1 when there are staged changes.
        let output = self.output(&["diff", "--cached", "--quiet"])?;
        match output.status.code() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(VcsError::Failed {
                args: "diff --cached --quiet".to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }),
        }
    }

    fn commit(&self, message: &str) -> Result<(), VcsError> {
        self.run(&["commit", "-m", message]).map(drop)
    }

    fn set_identity(&self, name: &str, email: &str) -> Result<(), VcsError> {
        self.run(&["config", "user.name", name])?;
        self.run(&["config", "user.email", email]).map(drop)
    }
}
