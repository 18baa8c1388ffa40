//! Photo source backed by a directory of albums.
//!
//! ```text
//! albums/
//!   Deck Repair/                 -> project "deck-repair"
//!     before.jpg
//!     after.png
//!   Construction: Garage Roof/   -> project "garage-roof"
//!   Misc/                        -> project "fence-north" (from its tag file)
//!     .project-tag               "project:fence_north"
//! ```
//!
//! Image urls are `album://<album>/<file>`, relative to the album root, so a
//! file fingerprints the same wherever the checkout lives.

use std::path::{Component, Path, PathBuf};
use std::time::UNIX_EPOCH;

use buildlog_core::naming::{extract_from_tag, extract_from_title, slugify};
use buildlog_core::{ImageMetadata, PhotoSource, RemoteImage, RemoteProject, SourceError};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "heic"];
const ALBUM_SCHEME: &str = "album://";
const TAG_FILE: &str = ".project-tag";
const TAG_PREFIX: &str = "project:";
const TITLE_PREFIX: &str = "Construction:";

pub struct LocalAlbumSource {
    root: PathBuf,
}

fn io_err(path: &Path, source: std::io::Error) -> SourceError {
    SourceError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .filter(|e| IMAGE_EXTENSIONS.contains(&e.as_str()))
}

fn album_url(album: &str, file_name: Option<&str>) -> String {
    match file_name {
        Some(file) => format!("{ALBUM_SCHEME}{album}/{file}"),
        None => format!("{ALBUM_SCHEME}{album}"),
    }
}

/// Project name and display title for an album directory.
///
/// A `project:` line in the tag file wins, then a `Construction:` title
/// prefix, then the plain directory name.
fn project_identity(dir: &Path, dir_name: &str) -> (String, String) {
    let tagged = std::fs::read_to_string(dir.join(TAG_FILE))
        .ok()
        .and_then(|tags| {
            tags.lines()
                .find_map(|line| extract_from_tag(line.trim(), TAG_PREFIX))
        });
    if let Some(name) = tagged {
        return (name.to_string(), dir_name.to_string());
    }
    if let Some(name) = extract_from_title(dir_name, TITLE_PREFIX) {
        let title = dir_name.strip_prefix(TITLE_PREFIX).unwrap_or(dir_name).trim().to_string();
        return (name.to_string(), title);
    }
    let name = slugify(dir_name).unwrap_or_else(|| dir_name.to_string());
    (name, dir_name.to_string())
}

/// Sorted entries of `dir` matching `keep`.
fn sorted_entries(dir: &Path, keep: impl Fn(&Path) -> bool) -> Result<Vec<PathBuf>, SourceError> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| io_err(dir, e))? {
        let path = entry.map_err(|e| io_err(dir, e))?.path();
        if keep(&path) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

fn is_image(path: &Path) -> bool {
    path.is_file() && extension(path).is_some()
}

impl LocalAlbumSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn album_dir(&self, project_id: &str) -> PathBuf {
        self.root.join(project_id)
    }

    fn to_image(&self, project_id: &str, index: usize, path: &Path) -> Result<RemoteImage, SourceError> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = extension(path).unwrap_or_else(|| "jpg".to_string());
        let clean = slugify(&stem).unwrap_or_else(|| "image".to_string());

        let meta = std::fs::metadata(path).map_err(|e| io_err(path, e))?;
        let datetime = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .and_then(|d| i64::try_from(d.as_secs()).ok());

        Ok(RemoteImage {
            id: format!("{project_id}/{file_name}"),
            title: stem,
            url: Some(album_url(project_id, Some(&file_name))),
            filename: format!("{:03}_{clean}.{ext}", index + 1),
            metadata: ImageMetadata {
                datetime,
                size: Some(meta.len()),
                width: None,
                height: None,
                format: Some(ext.to_ascii_uppercase()),
            },
        })
    }
}

impl PhotoSource for LocalAlbumSource {
    fn authenticate(&self) -> Result<(), SourceError> {
        if !self.root.is_dir() {
            return Err(SourceError::Auth(format!(
                "album directory {} does not exist",
                self.root.display()
            )));
        }
        Ok(())
    }

    fn list_projects(&self) -> Result<Vec<RemoteProject>, SourceError> {
        let mut projects = Vec::new();
        for dir in sorted_entries(&self.root, Path::is_dir)? {
            let Some(dir_name) = dir.file_name().map(|n| n.to_string_lossy().into_owned()) else {
                continue;
            };
            let image_count = sorted_entries(&dir, is_image)?.len();
            let (name, title) = project_identity(&dir, &dir_name);
            projects.push(RemoteProject {
                name,
                url: album_url(&dir_name, None),
                id: dir_name,
                title,
                image_count,
            });
        }
        Ok(projects)
    }

    fn list_images(&self, project_id: &str) -> Result<Vec<RemoteImage>, SourceError> {
        let dir = self.album_dir(project_id);
        if !dir.is_dir() {
            return Err(SourceError::Transient(format!(
                "album {project_id} is no longer present"
            )));
        }
        sorted_entries(&dir, is_image)?
            .iter()
            .enumerate()
            .map(|(i, path)| self.to_image(project_id, i, path))
            .collect()
    }

    fn download_image(
        &self,
        url: &str,
        dir: &Path,
        filename: &str,
    ) -> Result<Option<PathBuf>, SourceError> {
        let Some(relative) = url.strip_prefix(ALBUM_SCHEME).map(Path::new) else {
            return Err(SourceError::Transient(format!("unsupported url {url}")));
        };
        if !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(SourceError::Transient(format!("url escapes the album root: {url}")));
        }
        let from = self.root.join(relative);
        if !from.is_file() {
            return Ok(None);
        }
        std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
        let to = dir.join(filename);
        std::fs::copy(&from, &to).map_err(|e| io_err(&to, e))?;
        Ok(Some(to))
    }
}
