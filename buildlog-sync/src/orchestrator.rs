//! One reconciliation run over every remote project.
//!
//! ## Per-project protocol
//!
//! 1. Unseen project: ensure a tracking issue, build a fresh [`Project`].
//!    Tracked project without an issue: try to link one (find only).
//! 2. Diff the remote listing against the tracked fingerprints.
//! 3. Nothing new: done, no git or tracker traffic.
//! 4. Otherwise, under the work-tree gate: resolve the branch, download,
//!    write `project.json`, commit.
//! 5. Record the downloaded images and post a status comment.
//!
//! Each project works on a clone of its ledger entry. The clone replaces the
//! entry only when the project finishes without error, so a failed project
//! keeps exactly the state it had before the run. The ledger is saved once,
//! after every project has been visited.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use buildlog_core::{
    naming, BranchName, ImageRecord, PhotoSource, Project, ProjectName, RemoteImage,
    RemoteProject, StateStore, SyncState,
};
use buildlog_renderer::{CommitContext, Renderer};

use crate::branch::WorkTreeGate;
use crate::context::SyncContext;
use crate::detect::{ChangeDetector, DetectedImage};
use crate::error::{io_err, SyncError};
use crate::issue::IssueCoordinator;
use crate::writer::{write_metadata, ProjectMetadata};

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// What happened to one remote project during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectOutcome {
    /// No untracked images.
    Unchanged,
    /// New images were detected but none could be downloaded.
    NoDownloads { candidates: usize },
    /// New images were downloaded and recorded.
    Synced {
        new_images: usize,
        total_images: usize,
        /// `false` when the files were already committed by an earlier run.
        committed: bool,
    },
    /// Processing stopped with an error; the ledger entry is untouched.
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectReport {
    pub name: String,
    pub outcome: ProjectOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub scanned_at: DateTime<Utc>,
    pub projects: Vec<ProjectReport>,
}

impl RunReport {
    pub fn new_image_count(&self) -> usize {
        self.projects
            .iter()
            .map(|p| match p.outcome {
                ProjectOutcome::Synced { new_images, .. } => new_images,
                _ => 0,
            })
            .sum()
    }

    pub fn failed(&self) -> impl Iterator<Item = &ProjectReport> {
        self.projects
            .iter()
            .filter(|p| matches!(p.outcome, ProjectOutcome::Failed { .. }))
    }
}

/// Dry-run view of one remote project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPlan {
    pub name: String,
    /// Existing branch for tracked projects, the would-be branch otherwise.
    pub branch: Option<BranchName>,
    pub is_new: bool,
    pub new_images: usize,
    pub total_images: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlanReport {
    pub projects: Vec<ProjectPlan>,
}

impl PlanReport {
    pub fn new_image_count(&self) -> usize {
        self.projects.iter().map(|p| p.new_images).sum()
    }
}

// ---------------------------------------------------------------------------
// SyncOrchestrator
// ---------------------------------------------------------------------------

pub struct SyncOrchestrator {
    ctx: SyncContext,
    source: Box<dyn PhotoSource>,
    detector: ChangeDetector,
    issues: IssueCoordinator,
    gate: WorkTreeGate,
    store: StateStore,
    renderer: Arc<Renderer>,
}

impl SyncOrchestrator {
    pub fn new(
        ctx: SyncContext,
        source: Box<dyn PhotoSource>,
        detector: ChangeDetector,
        issues: IssueCoordinator,
        gate: WorkTreeGate,
        store: StateStore,
        renderer: Arc<Renderer>,
    ) -> Self {
        Self {
            ctx,
            source,
            detector,
            issues,
            gate,
            store,
            renderer,
        }
    }

    /// Authenticate, enumerate and load the ledger. Any error here is fatal.
    fn prepare(&self) -> Result<(Vec<RemoteProject>, SyncState), SyncError> {
        self.source.authenticate().map_err(SyncError::FatalAuth)?;
        let remote = self.source.list_projects().map_err(SyncError::Enumeration)?;
        tracing::info!(count = remote.len(), "enumerated remote projects");
        let state = self.store.load()?;
        Ok((remote, state))
    }

    /// Execute one reconciliation run.
    ///
    /// `Err` means the run itself failed (authentication, enumeration or
    /// ledger I/O). Per-project failures are reported in [`RunReport`] and
    /// never turn into an `Err`. Credentials rejected part-way through stop
    /// the run after saving what the finished projects recorded.
    pub fn run(&self) -> Result<RunReport, SyncError> {
        let (remote, mut state) = self.prepare()?;

        let mut projects = Vec::with_capacity(remote.len());
        for project in &remote {
            let span = tracing::info_span!("project", name = %project.name);
            let _enter = span.enter();

            let outcome = match self.process(project, &state) {
                Ok((name, updated, outcome)) => {
                    state.projects.insert(name, updated);
                    outcome
                }
                Err(err) if err.is_run_fatal() => {
                    tracing::error!(project = %project.name, error = %err, "run aborted");
                    self.store.save(&state)?;
                    return Err(err);
                }
                Err(err) => {
                    tracing::error!(project = %project.name, error = %err, "project skipped");
                    ProjectOutcome::Failed {
                        error: err.to_string(),
                    }
                }
            };
            projects.push(ProjectReport {
                name: project.name.clone(),
                outcome,
            });
        }

        let scanned_at = self.ctx.now();
        state.last_scan_at = Some(scanned_at);
        self.store.save(&state)?;

        let report = RunReport {
            scanned_at,
            projects,
        };
        tracing::info!(
            projects = report.projects.len(),
            new_images = report.new_image_count(),
            failed = report.failed().count(),
            "run complete"
        );
        Ok(report)
    }

    /// Work out what [`run`](Self::run) would do without side effects.
    ///
    /// Only reads: no git calls, no tracker calls and no writes to disk.
    pub fn plan(&self) -> Result<PlanReport, SyncError> {
        let (remote, state) = self.prepare()?;
        let now = self.ctx.now();

        let mut report = PlanReport::default();
        for project in &remote {
            let mut entry = ProjectPlan {
                name: project.name.clone(),
                branch: None,
                is_new: false,
                new_images: 0,
                total_images: 0,
                error: None,
            };
            let name = match ProjectName::parse(project.name.clone()) {
                Ok(name) => name,
                Err(err) => {
                    entry.error = Some(err.to_string());
                    report.projects.push(entry);
                    continue;
                }
            };

            let tracked = match state.projects.get(&name) {
                Some(existing) => {
                    entry.branch = Some(existing.branch_name.clone());
                    existing.tracked_hashes()
                }
                None => {
                    entry.is_new = true;
                    entry.branch = Some(self.new_branch_name(&name, now));
                    Default::default()
                }
            };

            match self.source.list_images(&project.id) {
                Ok(images) => {
                    entry.total_images = images.len();
                    entry.new_images = self.detector.diff(&images, &tracked).len();
                }
                Err(err) => entry.error = Some(err.to_string()),
            }
            report.projects.push(entry);
        }
        Ok(report)
    }

    fn new_branch_name(&self, name: &ProjectName, now: DateTime<Utc>) -> BranchName {
        naming::branch_name(&self.ctx.config.branch_prefix, now.date_naive(), name)
    }

    /// Process one project against a read-only view of the ledger.
    ///
    /// Returns the updated entry for the caller to fold in.
    fn process(
        &self,
        project: &RemoteProject,
        state: &SyncState,
    ) -> Result<(ProjectName, Project, ProjectOutcome), SyncError> {
        let name = ProjectName::parse(project.name.clone()).map_err(SyncError::InvalidProject)?;
        let now = self.ctx.now();

        let mut record = match state.projects.get(&name) {
            Some(existing) => {
                let mut record = existing.clone();
                if record.issue_id.is_none() {
                    record.issue_id = self.issues.link_existing(&name);
                }
                record
            }
            None => {
                let branch = self.new_branch_name(&name, now);
                tracing::info!(project = %name, branch = %branch, "new project");
                let issue = self
                    .issues
                    .ensure_issue(&name, &project.title, &project.url, &branch, now)?;
                Project::new(&project.id, &project.title, issue, branch, now)
            }
        };

        let images = self
            .source
            .list_images(&project.id)
            .map_err(SyncError::from_source)?;
        let fresh = self.detector.diff(&images, &record.tracked_hashes());
        if fresh.is_empty() {
            tracing::debug!(project = %name, total = images.len(), "no new images");
            return Ok((name, record, ProjectOutcome::Unchanged));
        }
        tracing::info!(project = %name, new = fresh.len(), total = images.len(), "new images detected");

        let dir = naming::project_dir(&self.ctx.images_root(), record.created_date(), &name);
        let branch = record.branch_name.clone();

        let synced = self.gate.with(|ctl| -> Result<_, SyncError> {
            ctl.resolve(&branch)?;

            let downloaded = self.download_all(&dir, &fresh)?;
            if downloaded.is_empty() {
                return Ok(None);
            }

            write_metadata(&dir, &ProjectMetadata::new(&name, project, &images, now))?;
            let message = self.renderer.commit_message(&CommitContext {
                project_name: name.to_string(),
                new_count: downloaded.len(),
            })?;
            let committed = ctl.commit(self.ctx.repo_relative(&dir), &message)?;
            Ok(Some((downloaded, committed)))
        })?;

        let Some((downloaded, committed)) = synced else {
            tracing::warn!(project = %name, candidates = fresh.len(), "no images could be downloaded");
            return Ok((
                name,
                record,
                ProjectOutcome::NoDownloads {
                    candidates: fresh.len(),
                },
            ));
        };

        let new_images = downloaded.len();
        for detected in downloaded {
            record.record_image(
                detected.hash.clone(),
                ImageRecord {
                    source_image_id: detected.image.id.clone(),
                    title: detected.image.title.clone(),
                    filename: detected.image.filename.clone(),
                    added_at: now,
                },
            );
        }

        if let Some(issue) = record.issue_id {
            self.issues
                .post_update(issue, &branch, images.len(), new_images, now);
        }

        Ok((
            name,
            record,
            ProjectOutcome::Synced {
                new_images,
                total_images: images.len(),
                committed,
            },
        ))
    }

    /// Download every candidate into `dir`, skipping the ones that fail.
    fn download_all<'a>(
        &self,
        dir: &Path,
        fresh: &'a [DetectedImage],
    ) -> Result<Vec<&'a DetectedImage>, SyncError> {
        std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;

        let mut downloaded = Vec::with_capacity(fresh.len());
        for detected in fresh {
            if self.download_one(dir, &detected.image) {
                downloaded.push(detected);
            }
        }
        Ok(downloaded)
    }

    fn download_one(&self, dir: &Path, image: &RemoteImage) -> bool {
        let Some(url) = image.url.as_deref() else {
            tracing::warn!(image = %image.id, "no download url; skipping");
            return false;
        };
        match self.source.download_image(url, dir, &image.filename) {
            Ok(Some(path)) => {
                tracing::debug!(image = %image.id, path = %path.display(), "downloaded");
                true
            }
            Ok(None) => {
                tracing::warn!(image = %image.id, "source returned no file; skipping");
                false
            }
            Err(err) => {
                tracing::warn!(image = %image.id, error = %err, "download failed; skipping");
                false
            }
        }
    }
}
