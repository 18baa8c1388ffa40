//! State store: persists the [`SyncState`] ledger as pretty-printed JSON.
//!
//! There is no locking: one writer per repository at a time is a
//! precondition of the caller. Saves use the `.tmp` + rename pattern so a
//! crash mid-write leaves the previous ledger intact.

use std::path::{Path, PathBuf};

use crate::error::{io_err, CoreError};
use crate::types::{SyncState, SCHEMA_VERSION};

/// Loads and saves the reconciliation ledger at a fixed path.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the ledger.
    ///
    /// A missing file is not an error: returns an empty [`SyncState`].
    pub fn load(&self) -> Result<SyncState, CoreError> {
        if !self.path.exists() {
            return Ok(SyncState::default());
        }
        let contents = std::fs::read_to_string(&self.path).map_err(|e| io_err(&self.path, e))?;
        let state: SyncState =
            serde_json::from_str(&contents).map_err(|e| CoreError::Parse {
                path: self.path.clone(),
                source: e,
            })?;
        if state.schema_version > SCHEMA_VERSION {
            return Err(CoreError::UnsupportedSchema {
                path: self.path.clone(),
                found: state.schema_version,
                supported: SCHEMA_VERSION,
            });
        }
        Ok(state)
    }

    /// Persist the full ledger, creating missing parent directories.
    pub fn save(&self, state: &SyncState) -> Result<(), CoreError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
        }

        let mut json = serde_json::to_string_pretty(state)?;
        json.push('\n');
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, &json).map_err(|e| io_err(&tmp, e))?;
        if let Err(e) = std::fs::rename(&tmp, &self.path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(io_err(&self.path, e));
        }
        Ok(())
    }
}
