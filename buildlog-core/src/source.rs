//! Photo source capability.
//!
//! The sync engine never talks to a photo-hosting service directly. It
//! consumes a [`PhotoSource`] for listing and downloading, and a
//! [`Fingerprinter`] for change detection.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::ImageHash;

/// Failures surfaced by a [`PhotoSource`].
#[derive(Debug, Error)]
pub enum SourceError {
    /// Credentials rejected or missing. Fatal for a reconciliation run.
    #[error("photo source authentication failed: {0}")]
    Auth(String),

    /// A single listing or download failed; the caller may skip and continue.
    #[error("photo source request failed: {0}")]
    Transient(String),

    #[error("photo source I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// An album/folder on the photo source that maps to one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteProject {
    pub id: String,
    /// Raw project name; validated as a slug before it enters the ledger.
    pub name: String,
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub image_count: usize,
}

/// Metadata reported alongside an image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageMetadata {
    /// Capture or upload time, Unix seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datetime: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

/// One image inside a [`RemoteProject`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteImage {
    pub id: String,
    pub title: String,
    /// Download location. `None` when the source could not resolve one.
    pub url: Option<String>,
    pub filename: String,
    #[serde(default)]
    pub metadata: ImageMetadata,
}

/// Listing and download access to a photo-hosting service.
pub trait PhotoSource {
    /// Verify credentials. An error here aborts the whole run.
    fn authenticate(&self) -> Result<(), SourceError>;

    /// All projects currently visible on the source, in listing order.
    fn list_projects(&self) -> Result<Vec<RemoteProject>, SourceError>;

    /// All images of one project.
    fn list_images(&self, project_id: &str) -> Result<Vec<RemoteImage>, SourceError>;

    /// Download `url` into `dir/filename`.
    ///
    /// `Ok(None)` means the source declined to produce the file (for example
    /// the object vanished between listing and download).
    fn download_image(
        &self,
        url: &str,
        dir: &Path,
        filename: &str,
    ) -> Result<Option<PathBuf>, SourceError>;
}

/// Deterministic fingerprints used for change detection.
///
/// Identical logical images must produce identical hashes across runs and
/// processes; a change in id or url must change the hash.
pub trait Fingerprinter {
    fn fingerprint_project(&self, project: &RemoteProject) -> String;
    fn fingerprint_image(&self, image: &RemoteImage) -> ImageHash;
}
