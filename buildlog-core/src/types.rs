//! Domain types for the buildlog reconciliation ledger.
//!
//! The on-disk field names are fixed by the state file layout; Rust field
//! names are mapped onto them with `#[serde(rename)]` where they differ.
//! Maps are `BTreeMap` so a save of an unchanged ledger is byte-identical.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::CoreError;
use crate::naming;

/// Current on-disk schema version of [`SyncState`].
pub const SCHEMA_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A validated project slug (`[a-z0-9-]+`).
///
/// Construction always goes through [`ProjectName::parse`], including when a
/// state file is deserialized, so an invalid name can never enter the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProjectName(String);

impl ProjectName {
    pub fn parse(raw: impl Into<String>) -> Result<Self, CoreError> {
        let raw = raw.into();
        if naming::is_slug(&raw) {
            Ok(Self(raw))
        } else {
            Err(CoreError::InvalidProjectName { name: raw })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<String> for ProjectName {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl From<ProjectName> for String {
    fn from(name: ProjectName) -> Self {
        name.0
    }
}

impl AsRef<str> for ProjectName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Opaque fingerprint of one remote image.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageHash(pub String);

impl ImageHash {
    /// First eight characters, for log lines.
    pub fn short(&self) -> &str {
        self.0.get(..8).unwrap_or(&self.0)
    }
}

impl fmt::Display for ImageHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ImageHash {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ImageHash {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Issue number in the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IssueId(pub u64);

impl fmt::Display for IssueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A version-control branch name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BranchName(pub String);

impl BranchName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for BranchName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Ledger structs
// ---------------------------------------------------------------------------

/// One synchronized image, keyed by its [`ImageHash`] in [`Project::images`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    #[serde(rename = "image_id")]
    pub source_image_id: String,
    pub title: String,
    pub filename: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub added_at: DateTime<Utc>,
}

/// A tracked construction project.
///
/// `branch_name` and `created_at` are fixed at creation; `images` only grows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    #[serde(rename = "project_id")]
    pub source_id: String,
    #[serde(rename = "project_title")]
    pub title: String,
    #[serde(rename = "issue_number", default)]
    pub issue_id: Option<IssueId>,
    pub branch_name: BranchName,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub images: BTreeMap<ImageHash, ImageRecord>,
}

impl Project {
    /// A freshly observed project with no tracked images.
    pub fn new(
        source_id: impl Into<String>,
        title: impl Into<String>,
        issue_id: Option<IssueId>,
        branch_name: BranchName,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            title: title.into(),
            issue_id,
            branch_name,
            created_at,
            images: BTreeMap::new(),
        }
    }

    /// Fingerprints already recorded as synchronized.
    pub fn tracked_hashes(&self) -> BTreeSet<ImageHash> {
        self.images.keys().cloned().collect()
    }

    /// Append an image to the ledger.
    ///
    /// Returns `false` and leaves the existing entry untouched if the hash is
    /// already tracked.
    pub fn record_image(&mut self, hash: ImageHash, record: ImageRecord) -> bool {
        use std::collections::btree_map::Entry;
        match self.images.entry(hash) {
            Entry::Vacant(slot) => {
                slot.insert(record);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    /// Date component of `created_at`, used for directory naming.
    pub fn created_date(&self) -> NaiveDate {
        self.created_at.date_naive()
    }
}

/// Root of the persisted reconciliation ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncState {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub projects: BTreeMap<ProjectName, Project>,
    #[serde(
        rename = "last_scan",
        default,
        deserialize_with = "deserialize_optional_timestamp"
    )]
    pub last_scan_at: Option<DateTime<Utc>>,
}

impl Default for SyncState {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            projects: BTreeMap::new(),
            last_scan_at: None,
        }
    }
}

impl SyncState {
    /// Total number of tracked images across all projects.
    pub fn tracked_image_count(&self) -> usize {
        self.projects.values().map(|p| p.images.len()).sum()
    }
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

// ---------------------------------------------------------------------------
// Timestamps
// ---------------------------------------------------------------------------

/// Parse an RFC 3339 timestamp, or a naive ISO-8601 one (read as UTC) as
/// written by earlier tooling.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{raw}'")))
}

fn deserialize_optional_timestamp<'de, D>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(raw) => parse_timestamp(&raw)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{raw}'"))),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
