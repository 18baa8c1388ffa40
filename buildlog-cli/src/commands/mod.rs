pub mod plan;
pub mod status;
pub mod sync;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};

use buildlog_core::{Config, StateStore};
use buildlog_renderer::Renderer;
use buildlog_sync::{
    BranchController, ChangeDetector, GitCli, IssueCoordinator, IssueTracker, NoopTracker,
    SyncContext, SyncOrchestrator, WorkTreeGate,
};

use crate::github::GithubTracker;
use crate::local_source::LocalAlbumSource;

/// Options shared by every subcommand.
#[derive(Debug)]
pub struct GlobalOpts {
    pub repo: PathBuf,
    pub config: Option<PathBuf>,
}

impl GlobalOpts {
    /// Config file plus environment overrides.
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load(&self.repo, self.config.as_deref())
            .context("failed to load configuration")?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn state_store(&self, config: &Config) -> StateStore {
        StateStore::new(Config::resolve(&self.repo, &config.state_file))
    }
}

fn issue_tracker(config: &Config) -> Box<dyn IssueTracker> {
    let (Some(token), Some(owner), Some(repo)) = (
        config.issue_token.clone(),
        config.issues.owner.as_deref(),
        config.issues.repo.as_deref(),
    ) else {
        tracing::info!("GITHUB_TOKEN or issues.owner/issues.repo not set; issue tracking disabled");
        return Box::new(NoopTracker);
    };
    Box::new(GithubTracker::new(
        &config.issues.api_base,
        owner,
        repo,
        token,
        &config.issues.labels,
    ))
}

/// Wire the production collaborators for `repo` into an orchestrator.
pub fn build_orchestrator(repo: &Path, config: Config) -> Result<SyncOrchestrator> {
    let missing = config.validate();
    if !missing.is_empty() {
        bail!("missing required settings: {}", missing.join(", "));
    }

    let renderer = match &config.templates_dir {
        Some(dir) => Renderer::with_overrides(&Config::resolve(repo, dir)),
        None => Renderer::new(),
    }
    .context("failed to load templates")?;
    let renderer = Arc::new(renderer);

    let source = LocalAlbumSource::new(Config::resolve(repo, &config.albums_dir));
    let issues = IssueCoordinator::new(
        issue_tracker(&config),
        Arc::clone(&renderer),
        config.issues.labels.clone(),
    );
    let gate = WorkTreeGate::new(BranchController::new(
        Box::new(GitCli::new(repo)),
        config.remote.clone(),
        config.main_branch.clone(),
        config.git_identity.clone(),
    ));
    let store = StateStore::new(Config::resolve(repo, &config.state_file));

    Ok(SyncOrchestrator::new(
        SyncContext::new(config, repo),
        Box::new(source),
        ChangeDetector::default(),
        issues,
        gate,
        store,
        renderer,
    ))
}
