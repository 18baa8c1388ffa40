//! Branch resolution and commits for one project at a time.
//!
//! [`BranchController::resolve`] walks a fixed precedence:
//!
//! 1. local branch exists: check it out, no network
//! 2. remote branch exists: fetch it and create a tracking branch
//! 3. otherwise: bring `main` up to date and branch from it
//!
//! The working tree is a single shared resource, so every controller call
//! goes through [`WorkTreeGate`].

use std::path::Path;
use std::sync::Mutex;

use buildlog_core::config::GitIdentity;
use buildlog_core::BranchName;

use crate::error::{SyncError, VcsError};
use crate::vcs::VersionControl;

/// Which step of the precedence produced the checked-out branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchResolution {
    Local,
    Remote,
    New,
}

pub struct BranchController {
    vcs: Box<dyn VersionControl + Send>,
    remote: String,
    main_branch: String,
    identity: GitIdentity,
}

impl BranchController {
    pub fn new(
        vcs: Box<dyn VersionControl + Send>,
        remote: impl Into<String>,
        main_branch: impl Into<String>,
        identity: GitIdentity,
    ) -> Self {
        Self {
            vcs,
            remote: remote.into(),
            main_branch: main_branch.into(),
            identity,
        }
    }

    /// Leave the working tree on `branch`.
    ///
    /// Any failing VCS call aborts resolution; the caller must not commit.
    pub fn resolve(&self, branch: &BranchName) -> Result<BranchResolution, VcsError> {
        let name = branch.as_str();

        if self.vcs.local_branch_exists(name)? {
            self.vcs.checkout(name)?;
            tracing::debug!(branch = %branch, "checked out local branch");
            return Ok(BranchResolution::Local);
        }

        if self.vcs.remote_branch_exists(&self.remote, name)? {
            self.vcs.fetch(&self.remote, name)?;
            let tracking = format!("{}/{}", self.remote, name);
            self.vcs.checkout_new(name, Some(&tracking))?;
            tracing::info!(branch = %branch, remote = %self.remote, "tracking remote branch");
            return Ok(BranchResolution::Remote);
        }

        self.update_main()?;
        self.vcs.checkout_new(name, None)?;
        tracing::info!(branch = %branch, from = %self.main_branch, "created branch");
        Ok(BranchResolution::New)
    }

    fn update_main(&self) -> Result<(), VcsError> {
        let main = self.main_branch.as_str();
        if let Err(err) = self.vcs.checkout(main) {
            tracing::debug!(branch = main, error = %err, "no local main; fetching");
            self.vcs.fetch(&self.remote, main)?;
            let tracking = format!("{}/{}", self.remote, main);
            self.vcs.checkout_new(main, Some(&tracking))?;
        }
        self.vcs.pull(&self.remote, main)
    }

    /// Stage `path` and commit it on the current branch.
    ///
    /// Returns `Ok(false)` when staging left nothing to commit, which happens
    /// when a previous run committed these files but never saved the ledger.
    /// Every failure is returned as [`SyncError::Commit`].
    pub fn commit(&self, path: &Path, message: &str) -> Result<bool, SyncError> {
        let commit_err = |source| SyncError::Commit {
            path: path.to_path_buf(),
            source,
        };

        if let Err(err) = self
            .vcs
            .set_identity(&self.identity.name, &self.identity.email)
        {
            tracing::warn!(error = %err, "could not set commit identity");
        }

        self.vcs.stage(path).map_err(commit_err)?;
        if !self.vcs.has_staged_changes().map_err(commit_err)? {
            tracing::info!(path = %path.display(), "nothing staged; content already committed");
            return Ok(false);
        }
        self.vcs.commit(message).map_err(commit_err)?;
        Ok(true)
    }
}

/// Single-owner gate over the working tree.
///
/// Read-only work may run concurrently elsewhere; every branch switch and
/// commit is serialized here.
pub struct WorkTreeGate {
    inner: Mutex<BranchController>,
}

impl WorkTreeGate {
    pub fn new(controller: BranchController) -> Self {
        Self {
            inner: Mutex::new(controller),
        }
    }

    /// Run `f` with exclusive access to the controller.
    pub fn with<R>(&self, f: impl FnOnce(&BranchController) -> R) -> R {
        // A panic mid-operation leaves git in whatever state it was in; the
        // controller itself holds no state that could be corrupted.
        let guard = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Script {
        local: Vec<String>,
        remote: Vec<String>,
        fail_on: Vec<&'static str>,
        nothing_staged: bool,
    }

    #[derive(Clone, Default)]
    struct FakeVcs {
        script: Arc<Script>,
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl FakeVcs {
        fn with(script: Script) -> Self {
            Self {
                script: Arc::new(script),
                calls: Arc::default(),
            }
        }

        fn log(&self, op: &'static str, detail: String) -> Result<(), VcsError> {
            self.calls.lock().unwrap().push(format!("{op} {detail}").trim().to_string());
            if self.script.fail_on.contains(&op) {
                return Err(VcsError::Failed {
                    args: op.to_string(),
                    status: "exit status: 1".into(),
                    stderr: "scripted failure".into(),
                });
            }
            Ok(())
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl VersionControl for FakeVcs {
        fn local_branch_exists(&self, branch: &str) -> Result<bool, VcsError> {
            self.log("local_branch_exists", branch.into())?;
            Ok(self.script.local.iter().any(|b| b == branch))
        }
        fn remote_branch_exists(&self, remote: &str, branch: &str) -> Result<bool, VcsError> {
            self.log("remote_branch_exists", format!("{remote} {branch}"))?;
            Ok(self.script.remote.iter().any(|b| b == branch))
        }
        fn checkout(&self, branch: &str) -> Result<(), VcsError> {
            self.log("checkout", branch.into())?;
            if self.script.local.iter().any(|b| b == branch) {
                Ok(())
            } else {
                Err(VcsError::Failed {
                    args: format!("checkout {branch}"),
                    status: "exit status: 1".into(),
                    stderr: "pathspec did not match".into(),
                })
            }
        }
        fn checkout_new(&self, branch: &str, start: Option<&str>) -> Result<(), VcsError> {
            self.log("checkout_new", format!("{branch} {}", start.unwrap_or("")))
        }
        fn fetch(&self, remote: &str, branch: &str) -> Result<(), VcsError> {
            self.log("fetch", format!("{remote} {branch}"))
        }
        fn pull(&self, remote: &str, branch: &str) -> Result<(), VcsError> {
            self.log("pull", format!("{remote} {branch}"))
        }
        fn stage(&self, path: &Path) -> Result<(), VcsError> {
            self.log("stage", path.display().to_string())
        }
        fn has_staged_changes(&self) -> Result<bool, VcsError> {
            self.log("has_staged_changes", String::new())?;
            Ok(!self.script.nothing_staged)
        }
        fn commit(&self, message: &str) -> Result<(), VcsError> {
            self.log("commit", message.into())
        }
        fn set_identity(&self, name: &str, email: &str) -> Result<(), VcsError> {
            self.log("set_identity", format!("{name} {email}"))
        }
    }

    fn controller(vcs: &FakeVcs) -> BranchController {
        BranchController::new(Box::new(vcs.clone()), "origin", "main", GitIdentity::default())
    }

    const BRANCH: &str = "project/2025-01-15-deck-repair";

    #[test]
    fn local_branch_skips_all_remote_calls() {
        let vcs = FakeVcs::with(Script {
            local: vec![BRANCH.into()],
            ..Script::default()
        });
        let outcome = controller(&vcs).resolve(&BranchName::from(BRANCH)).unwrap();
        assert_eq!(outcome, BranchResolution::Local);
        assert_eq!(
            vcs.calls(),
            vec![format!("local_branch_exists {BRANCH}"), format!("checkout {BRANCH}")]
        );
    }

    #[test]
    fn remote_branch_is_fetched_and_tracked() {
        let vcs = FakeVcs::with(Script {
            remote: vec![BRANCH.into()],
            ..Script::default()
        });
        let outcome = controller(&vcs).resolve(&BranchName::from(BRANCH)).unwrap();
        assert_eq!(outcome, BranchResolution::Remote);
        let calls = vcs.calls();
        assert!(calls.contains(&format!("fetch origin {BRANCH}")));
        assert!(calls.contains(&format!("checkout_new {BRANCH} origin/{BRANCH}")));
        assert!(!calls.iter().any(|c| c.starts_with("pull")));
    }

    #[test]
    fn new_branch_is_created_from_updated_main() {
        let vcs = FakeVcs::with(Script {
            local: vec!["main".into()],
            ..Script::default()
        });
        let outcome = controller(&vcs).resolve(&BranchName::from(BRANCH)).unwrap();
        assert_eq!(outcome, BranchResolution::New);
        assert_eq!(
            &vcs.calls()[2..],
            &[
                "checkout main".to_string(),
                "pull origin main".to_string(),
                format!("checkout_new {BRANCH}"),
            ]
        );
    }

    #[test]
    fn missing_local_main_is_fetched_from_remote() {
        let vcs = FakeVcs::with(Script::default());
        controller(&vcs).resolve(&BranchName::from(BRANCH)).unwrap();
        let calls = vcs.calls();
        assert!(calls.contains(&"fetch origin main".to_string()));
        assert!(calls.contains(&"checkout_new main origin/main".to_string()));
        assert!(calls.contains(&"pull origin main".to_string()));
    }

    #[test]
    fn failing_step_aborts_resolution() {
        let vcs = FakeVcs::with(Script {
            local: vec!["main".into()],
            fail_on: vec!["pull"],
            ..Script::default()
        });
        assert!(controller(&vcs).resolve(&BranchName::from(BRANCH)).is_err());
        assert!(!vcs.calls().iter().any(|c| c.starts_with("checkout_new")));
    }

    #[test]
    fn commit_failure_propagates() {
        let vcs = FakeVcs::with(Script {
            fail_on: vec!["commit"],
            ..Script::default()
        });
        let err = controller(&vcs)
            .commit(Path::new("assets/images/x"), "msg")
            .unwrap_err();
        assert!(matches!(err, SyncError::Commit { .. }));
    }

    #[test]
    fn identity_failure_does_not_block_commit() {
        let vcs = FakeVcs::with(Script {
            fail_on: vec!["set_identity"],
            ..Script::default()
        });
        assert!(controller(&vcs).commit(Path::new("x"), "msg").unwrap());
        assert!(vcs.calls().contains(&"commit msg".to_string()));
    }

    #[test]
    fn empty_index_skips_commit() {
        let vcs = FakeVcs::with(Script {
            nothing_staged: true,
            ..Script::default()
        });
        assert!(!controller(&vcs).commit(Path::new("x"), "msg").unwrap());
        assert!(!vcs.calls().iter().any(|c| c.starts_with("commit")));
    }

    #[test]
    fn gate_serializes_access() {
        let vcs = FakeVcs::with(Script {
            local: vec![BRANCH.into()],
            ..Script::default()
        });
        let gate = WorkTreeGate::new(controller(&vcs));
        let outcome = gate.with(|ctl| ctl.resolve(&BranchName::from(BRANCH)));
        assert_eq!(outcome.unwrap(), BranchResolution::Local);
    }
}
