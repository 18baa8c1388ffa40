//! In-memory collaborators shared by the orchestrator tests.
//!
//! Every fake is `Clone` over shared state so a test keeps a handle after
//! boxing one into the orchestrator.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};
use tempfile::TempDir;

use buildlog_core::config::GitIdentity;
use buildlog_core::{
    Config, Fingerprinter, ImageHash, ImageMetadata, IssueId, PhotoSource, RemoteImage,
    RemoteProject, SourceError, StateStore, SyncState,
};
use buildlog_renderer::Renderer;
use buildlog_sync::{
    BranchController, ChangeDetector, FixedClock, Issue, IssueCoordinator, IssueError,
    IssueTracker, Sha256Fingerprinter, SyncContext, SyncOrchestrator, VcsError, VersionControl,
    WorkTreeGate,
};

pub fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, day, hour, 0, 0).unwrap()
}

pub fn image(id: &str) -> RemoteImage {
    RemoteImage {
        id: id.to_string(),
        title: format!("photo {id}"),
        url: Some(format!("https://cdn.example/{id}.jpg")),
        filename: format!("{id}.jpg"),
        metadata: ImageMetadata {
            datetime: Some(1_736_932_800),
            ..ImageMetadata::default()
        },
    }
}

pub fn hash(img: &RemoteImage) -> ImageHash {
    Sha256Fingerprinter.fingerprint_image(img)
}

// ---------------------------------------------------------------------------
// Photo source
// ---------------------------------------------------------------------------

#[derive(Default)]
struct SourceState {
    projects: Vec<RemoteProject>,
    images: BTreeMap<String, Vec<RemoteImage>>,
    auth_fails: bool,
    listing_fails: bool,
    broken_downloads: Vec<String>,
    /// Album id and whether the failure is an auth rejection.
    failing_images: Vec<(String, bool)>,
    list_image_calls: usize,
}

#[derive(Clone, Default)]
pub struct FakeSource {
    state: Arc<Mutex<SourceState>>,
}

impl FakeSource {
    /// Add or replace a project; its id is `album-<name>`.
    pub fn set_project(&self, name: &str, images: Vec<RemoteImage>) {
        let mut state = self.state.lock().unwrap();
        let id = format!("album-{name}");
        state.projects.retain(|p| p.id != id);
        state.projects.push(RemoteProject {
            id: id.clone(),
            name: name.to_string(),
            title: name.replace('-', " "),
            url: format!("https://photos.example/{name}"),
            image_count: images.len(),
        });
        state.images.insert(id, images);
    }

    pub fn fail_auth(&self) {
        self.state.lock().unwrap().auth_fails = true;
    }

    pub fn fail_listing(&self) {
        self.state.lock().unwrap().listing_fails = true;
    }

    pub fn break_download(&self, image_id: &str) {
        self.state
            .lock()
            .unwrap()
            .broken_downloads
            .push(format!("https://cdn.example/{image_id}.jpg"));
    }

    /// Make `list_images` for project `name` fail transiently.
    pub fn fail_images_for(&self, name: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_images
            .push((format!("album-{name}"), false));
    }

    /// Make `list_images` for project `name` reject the credentials.
    pub fn revoke_auth_for(&self, name: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_images
            .push((format!("album-{name}"), true));
    }

    pub fn list_image_calls(&self) -> usize {
        self.state.lock().unwrap().list_image_calls
    }
}

impl PhotoSource for FakeSource {
    fn authenticate(&self) -> Result<(), SourceError> {
        if self.state.lock().unwrap().auth_fails {
            return Err(SourceError::Auth("invalid api key".into()));
        }
        Ok(())
    }

    fn list_projects(&self) -> Result<Vec<RemoteProject>, SourceError> {
        let state = self.state.lock().unwrap();
        if state.listing_fails {
            return Err(SourceError::Transient("503 service unavailable".into()));
        }
        Ok(state.projects.clone())
    }

    fn list_images(&self, project_id: &str) -> Result<Vec<RemoteImage>, SourceError> {
        let mut state = self.state.lock().unwrap();
        state.list_image_calls += 1;
        if let Some((_, auth)) = state.failing_images.iter().find(|(id, _)| id == project_id) {
            return Err(if *auth {
                SourceError::Auth("token revoked".into())
            } else {
                SourceError::Transient(format!("502 listing {project_id}"))
            });
        }
        Ok(state.images.get(project_id).cloned().unwrap_or_default())
    }

    fn download_image(
        &self,
        url: &str,
        dir: &Path,
        filename: &str,
    ) -> Result<Option<PathBuf>, SourceError> {
        if self.state.lock().unwrap().broken_downloads.iter().any(|u| u == url) {
            return Err(SourceError::Transient(format!("404 for {url}")));
        }
        let path = dir.join(filename);
        std::fs::write(&path, url.as_bytes()).map_err(|source| SourceError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(Some(path))
    }
}

// ---------------------------------------------------------------------------
// Issue tracker
// ---------------------------------------------------------------------------

#[derive(Default)]
struct TrackerState {
    open: Vec<Issue>,
    deny: bool,
    find_calls: Vec<String>,
    create_calls: Vec<String>,
    comments: Vec<(IssueId, String)>,
}

#[derive(Clone, Default)]
pub struct FakeTracker {
    state: Arc<Mutex<TrackerState>>,
}

impl FakeTracker {
    pub fn deny_all(&self, deny: bool) {
        self.state.lock().unwrap().deny = deny;
    }

    pub fn open_issue(&self, number: u64, title: &str) {
        self.state.lock().unwrap().open.push(Issue {
            number: IssueId(number),
            title: title.to_string(),
        });
    }

    pub fn find_calls(&self) -> Vec<String> {
        self.state.lock().unwrap().find_calls.clone()
    }

    pub fn create_calls(&self) -> Vec<String> {
        self.state.lock().unwrap().create_calls.clone()
    }

    pub fn comments(&self) -> Vec<(IssueId, String)> {
        self.state.lock().unwrap().comments.clone()
    }
}

impl IssueTracker for FakeTracker {
    fn find_issue(&self, title: &str) -> Result<Option<Issue>, IssueError> {
        let mut state = self.state.lock().unwrap();
        state.find_calls.push(title.to_string());
        if state.deny {
            return Err(IssueError::PermissionDenied("403 resource not accessible".into()));
        }
        Ok(state.open.iter().find(|i| i.title == title).cloned())
    }

    fn create_issue(&self, title: &str, _body: &str, _labels: &[String]) -> Result<Issue, IssueError> {
        let mut state = self.state.lock().unwrap();
        state.create_calls.push(title.to_string());
        if state.deny {
            return Err(IssueError::PermissionDenied("403 resource not accessible".into()));
        }
        let issue = Issue {
            number: IssueId(state.open.len() as u64 + 1),
            title: title.to_string(),
        };
        state.open.push(issue.clone());
        Ok(issue)
    }

    fn add_comment(&self, issue: IssueId, body: &str) -> Result<(), IssueError> {
        let mut state = self.state.lock().unwrap();
        if state.deny {
            return Err(IssueError::PermissionDenied("403 resource not accessible".into()));
        }
        state.comments.push((issue, body.to_string()));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Version control
// ---------------------------------------------------------------------------

#[derive(Default)]
struct VcsState {
    local: Vec<String>,
    remote: Vec<String>,
    current: String,
    fail_commit_on: Option<String>,
    fail_checkout_on: Option<String>,
    calls: Vec<String>,
}

impl VcsState {
    fn refuses_checkout(&self, branch: &str) -> bool {
        self.fail_checkout_on
            .as_deref()
            .is_some_and(|fragment| branch.contains(fragment))
    }
}

/// Branch model: `checkout_new` creates a local branch, `checkout` only
/// succeeds for existing ones. Starts with a local `main`.
#[derive(Clone)]
pub struct FakeVcs {
    state: Arc<Mutex<VcsState>>,
}

impl Default for FakeVcs {
    fn default() -> Self {
        Self {
            state: Arc::new(Mutex::new(VcsState {
                local: vec!["main".into()],
                remote: vec!["main".into()],
                current: "main".into(),
                ..VcsState::default()
            })),
        }
    }
}

impl FakeVcs {
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn add_remote_branch(&self, branch: &str) {
        self.state.lock().unwrap().remote.push(branch.to_string());
    }

    /// Make `commit` fail while the current branch contains `fragment`.
    pub fn fail_commit_on(&self, fragment: Option<&str>) {
        self.state.lock().unwrap().fail_commit_on = fragment.map(str::to_string);
    }

    /// Make `checkout` and `checkout_new` fail for branches containing `fragment`.
    pub fn fail_checkout_on(&self, fragment: Option<&str>) {
        self.state.lock().unwrap().fail_checkout_on = fragment.map(str::to_string);
    }

    pub fn commits(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.starts_with("commit "))
            .collect()
    }

    fn record(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }
}

fn failed(args: &str) -> VcsError {
    VcsError::Failed {
        args: args.to_string(),
        status: "exit status: 1".into(),
        stderr: "scripted failure".into(),
    }
}

impl VersionControl for FakeVcs {
    fn local_branch_exists(&self, branch: &str) -> Result<bool, VcsError> {
        self.record(format!("local_branch_exists {branch}"));
        Ok(self.state.lock().unwrap().local.iter().any(|b| b == branch))
    }

    fn remote_branch_exists(&self, remote: &str, branch: &str) -> Result<bool, VcsError> {
        self.record(format!("remote_branch_exists {remote} {branch}"));
        Ok(self.state.lock().unwrap().remote.iter().any(|b| b == branch))
    }

    fn checkout(&self, branch: &str) -> Result<(), VcsError> {
        self.record(format!("checkout {branch}"));
        let mut state = self.state.lock().unwrap();
        if !state.local.iter().any(|b| b == branch) || state.refuses_checkout(branch) {
            return Err(failed("checkout"));
        }
        state.current = branch.to_string();
        Ok(())
    }

    fn checkout_new(&self, branch: &str, start_point: Option<&str>) -> Result<(), VcsError> {
        self.record(format!("checkout_new {branch} {}", start_point.unwrap_or("HEAD")));
        let mut state = self.state.lock().unwrap();
        if state.refuses_checkout(branch) {
            return Err(failed("checkout -b"));
        }
        state.local.push(branch.to_string());
        state.current = branch.to_string();
        Ok(())
    }

    fn fetch(&self, remote: &str, branch: &str) -> Result<(), VcsError> {
        self.record(format!("fetch {remote} {branch}"));
        Ok(())
    }

    fn pull(&self, remote: &str, branch: &str) -> Result<(), VcsError> {
        self.record(format!("pull {remote} {branch}"));
        Ok(())
    }

    fn stage(&self, path: &Path) -> Result<(), VcsError> {
        self.record(format!("stage {}", path.display()));
        Ok(())
    }

    fn has_staged_changes(&self) -> Result<bool, VcsError> {
        Ok(true)
    }

    fn commit(&self, message: &str) -> Result<(), VcsError> {
        self.record(format!("commit {message}"));
        let state = self.state.lock().unwrap();
        if let Some(fragment) = &state.fail_commit_on {
            if state.current.contains(fragment.as_str()) {
                return Err(failed("commit"));
            }
        }
        Ok(())
    }

    fn set_identity(&self, name: &str, email: &str) -> Result<(), VcsError> {
        self.record(format!("set_identity {name} <{email}>"));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub root: TempDir,
    pub source: FakeSource,
    pub tracker: FakeTracker,
    pub vcs: FakeVcs,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            root: TempDir::new().expect("tempdir"),
            source: FakeSource::default(),
            tracker: FakeTracker::default(),
            vcs: FakeVcs::default(),
        }
    }

    pub fn config(&self) -> Config {
        Config::default()
    }

    pub fn store(&self) -> StateStore {
        StateStore::new(Config::resolve(self.root.path(), &self.config().state_file))
    }

    pub fn state(&self) -> SyncState {
        self.store().load().expect("load state")
    }

    pub fn images_root(&self) -> PathBuf {
        self.root.path().join("assets/images")
    }

    /// Orchestrator whose clock is frozen at `now`.
    pub fn orchestrator(&self, now: DateTime<Utc>) -> SyncOrchestrator {
        let config = self.config();
        let renderer = Arc::new(Renderer::new().expect("renderer"));
        let issues = IssueCoordinator::new(
            Box::new(self.tracker.clone()),
            Arc::clone(&renderer),
            config.issues.labels.clone(),
        );
        let gate = WorkTreeGate::new(BranchController::new(
            Box::new(self.vcs.clone()),
            config.remote.clone(),
            config.main_branch.clone(),
            GitIdentity::default(),
        ));
        let ctx = SyncContext::new(config, self.root.path()).with_clock(FixedClock(now));
        SyncOrchestrator::new(
            ctx,
            Box::new(self.source.clone()),
            ChangeDetector::default(),
            issues,
            gate,
            self.store(),
            renderer,
        )
    }
}
