//! Change detection: fingerprint remote images and diff them against the
//! hashes already recorded in the ledger.
//!
//! Only additions are detected. An image that disappears from the source is
//! simply never revisited, so renames, reordering or pagination artifacts on
//! the remote side never turn into deletions here.

use std::collections::BTreeSet;

use sha2::{Digest, Sha256};

use buildlog_core::{Fingerprinter, ImageHash, RemoteImage, RemoteProject};

/// SHA-256 over the identity fields of an image: id, url, capture time.
///
/// Any change to id or url yields a new hash. Visually identical images
/// re-uploaded under a new id count as new content.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Fingerprinter;

impl Sha256Fingerprinter {
    fn digest(parts: &[&str]) -> String {
        let mut hasher = Sha256::new();
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                hasher.update(b"\n");
            }
            hasher.update(part.as_bytes());
        }
        hex::encode(hasher.finalize())
    }
}

impl Fingerprinter for Sha256Fingerprinter {
    fn fingerprint_project(&self, project: &RemoteProject) -> String {
        let count = project.image_count.to_string();
        Self::digest(&[&project.id, &count, &project.title])
    }

    fn fingerprint_image(&self, image: &RemoteImage) -> ImageHash {
        let datetime = image
            .metadata
            .datetime
            .map(|t| t.to_string())
            .unwrap_or_default();
        let url = image.url.as_deref().unwrap_or_default();
        ImageHash(Self::digest(&[&image.id, url, &datetime]))
    }
}

/// A remote image together with its fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedImage {
    pub hash: ImageHash,
    pub image: RemoteImage,
}

/// Diffs remote listings against tracked fingerprints.
pub struct ChangeDetector {
    fingerprinter: Box<dyn Fingerprinter>,
}

impl Default for ChangeDetector {
    fn default() -> Self {
        Self::new(Box::new(Sha256Fingerprinter))
    }
}

impl ChangeDetector {
    pub fn new(fingerprinter: Box<dyn Fingerprinter>) -> Self {
        Self { fingerprinter }
    }

    pub fn fingerprint(&self, image: &RemoteImage) -> ImageHash {
        self.fingerprinter.fingerprint_image(image)
    }

    /// Images from `current` whose fingerprint is not in `tracked`, in
    /// listing order.
    ///
    /// If two images in one listing share a fingerprint only the first is
    /// returned, so a batch can never overwrite its own ledger entry.
    pub fn diff(&self, current: &[RemoteImage], tracked: &BTreeSet<ImageHash>) -> Vec<DetectedImage> {
        let mut seen = BTreeSet::new();
        let mut fresh = Vec::new();
        for image in current {
            let hash = self.fingerprint(image);
            if tracked.contains(&hash) {
                continue;
            }
            if !seen.insert(hash.clone()) {
                tracing::warn!(
                    hash = %hash.short(),
                    image = %image.id,
                    "duplicate fingerprint in listing; keeping first image"
                );
                continue;
            }
            fresh.push(DetectedImage {
                hash,
                image: image.clone(),
            });
        }
        fresh
    }
}
