//! Naming rules shared by the ledger, the branch controller and the issue
//! coordinator.
//!
//! Everything here is pure: no I/O, no clock. Callers pass the date.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::types::{BranchName, ProjectName};

/// Prefix of canonical tracking-issue titles.
pub const ISSUE_TITLE_PREFIX: &str = "Construction Project: ";

/// `true` for a non-empty string made only of `[a-z0-9-]`.
pub fn is_slug(raw: &str) -> bool {
    !raw.is_empty()
        && raw
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Lowercase, map spaces and underscores to `-`, drop anything else that is
/// not alphanumeric. Returns `None` when nothing survives.
pub fn slugify(raw: &str) -> Option<String> {
    let slug: String = raw
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '_' { '-' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect();
    (!slug.is_empty()).then_some(slug)
}

/// Project name from a photo tag such as `project:deck_repair`.
pub fn extract_from_tag(tag: &str, prefix: &str) -> Option<ProjectName> {
    let rest = tag.strip_prefix(prefix)?;
    slugify(rest).and_then(|s| ProjectName::parse(s).ok())
}

/// Project name from an album title such as `Construction: Deck Repair`.
pub fn extract_from_title(title: &str, prefix: &str) -> Option<ProjectName> {
    let rest = title.strip_prefix(prefix)?;
    slugify(rest).and_then(|s| ProjectName::parse(s).ok())
}

/// `{prefix}{YYYY-MM-DD}-{name}`, e.g. `project/2025-01-15-deck-repair`.
pub fn branch_name(prefix: &str, date: NaiveDate, name: &ProjectName) -> BranchName {
    BranchName(format!("{prefix}{}-{name}", date.format("%Y-%m-%d")))
}

/// `{images_root}/{YYYY-MM-DD}-{name}`: where a project's photos live.
pub fn project_dir(images_root: &Path, date: NaiveDate, name: &ProjectName) -> PathBuf {
    images_root.join(format!("{}-{name}", date.format("%Y-%m-%d")))
}

/// `deck-repair` → `Deck Repair`.
pub fn title_case(name: &ProjectName) -> String {
    name.as_str()
        .split('-')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Canonical tracking-issue title: `Construction Project: Deck Repair`.
pub fn issue_title(name: &ProjectName) -> String {
    format!("{ISSUE_TITLE_PREFIX}{}", title_case(name))
}

/// Canonical tag: `project:deck_repair`.
pub fn project_tag(name: &ProjectName) -> String {
    format!("project:{}", name.as_str().replace('-', "_"))
}
