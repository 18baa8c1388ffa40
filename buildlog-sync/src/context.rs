//! Per-run context threaded into the orchestrator instead of globals.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use buildlog_core::Config;

/// Source of "now" for timestamps written to the ledger and rendered text.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always returns the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

pub struct SyncContext {
    pub config: Config,
    pub repo_root: PathBuf,
    pub clock: Box<dyn Clock>,
}

impl SyncContext {
    pub fn new(config: Config, repo_root: impl Into<PathBuf>) -> Self {
        Self {
            config,
            repo_root: repo_root.into(),
            clock: Box::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Absolute images root inside the repository.
    pub fn images_root(&self) -> PathBuf {
        Config::resolve(&self.repo_root, &self.config.images_root)
    }

    /// Path of `abs` relative to the repository root, for staging.
    pub fn repo_relative<'a>(&self, abs: &'a Path) -> &'a Path {
        abs.strip_prefix(&self.repo_root).unwrap_or(abs)
    }
}
