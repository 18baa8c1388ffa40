//! `project.json` written next to a project's photos on every committed sync.
//!
//! The file is written to `project.json.tmp` first and renamed into place,
//! so a crash never leaves a truncated file in the tree.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use buildlog_core::{ImageMetadata, ProjectName, RemoteImage, RemoteProject};

use crate::error::{io_err, SyncError};

pub const METADATA_FILE_NAME: &str = "project.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataImage {
    pub id: String,
    pub title: String,
    pub filename: String,
    pub metadata: ImageMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    pub project_name: ProjectName,
    pub project_id: String,
    pub project_title: String,
    pub total_photos: usize,
    pub last_sync: DateTime<Utc>,
    pub project_url: String,
    pub images: Vec<MetadataImage>,
}

impl ProjectMetadata {
    /// Snapshot of the remote listing as of this sync.
    pub fn new(
        name: &ProjectName,
        project: &RemoteProject,
        images: &[RemoteImage],
        synced_at: DateTime<Utc>,
    ) -> Self {
        Self {
            project_name: name.clone(),
            project_id: project.id.clone(),
            project_title: project.title.clone(),
            total_photos: images.len(),
            last_sync: synced_at,
            project_url: project.url.clone(),
            images: images
                .iter()
                .map(|img| MetadataImage {
                    id: img.id.clone(),
                    title: img.title.clone(),
                    filename: img.filename.clone(),
                    metadata: img.metadata.clone(),
                })
                .collect(),
        }
    }
}

/// Write `metadata` to `<dir>/project.json`; returns the final path.
pub fn write_metadata(dir: &Path, metadata: &ProjectMetadata) -> Result<PathBuf, SyncError> {
    let path = dir.join(METADATA_FILE_NAME);
    let mut content = serde_json::to_string_pretty(metadata)?;
    content.push('\n');
    atomic_write(&path, &content)?;
    Ok(path)
}

pub(crate) fn atomic_write(path: &Path, content: &str) -> Result<(), SyncError> {
    let tmp = PathBuf::from(format!("{}.tmp", path.display()));

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    std::fs::write(&tmp, content).map_err(|e| io_err(&tmp, e))?;

    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }

    tracing::debug!(path = %path.display(), "wrote metadata");
    Ok(())
}
