//! Ledger load/save error messages, crash safety and documented layout.

use assert_fs::prelude::*;
use buildlog_core::{
    BranchName, CoreError, ImageHash, ImageRecord, IssueId, Project, ProjectName, StateStore,
    SyncState,
};
use chrono::{TimeZone, Utc};
use predicates::prelude::*;
use std::fs;

fn deck() -> ProjectName {
    ProjectName::parse("deck-repair").expect("slug")
}

fn sample_state() -> SyncState {
    let created = Utc.with_ymd_and_hms(2025, 1, 15, 9, 30, 0).unwrap();
    let mut project = Project::new(
        "construction/deck",
        "Construction: Deck Repair",
        Some(IssueId(12)),
        BranchName::from("project/2025-01-15-deck-repair"),
        created,
    );
    project.record_image(
        ImageHash::from("0f3c"),
        ImageRecord {
            source_image_id: "construction/deck/before".into(),
            title: "before".into(),
            filename: "001_before.jpg".into(),
            added_at: created,
        },
    );
    let mut state = SyncState::default();
    state.projects.insert(deck(), project);
    state.last_scan_at = Some(created);
    state
}

// ---------------------------------------------------------------------------
// 1. Load error messages
// ---------------------------------------------------------------------------

#[test]
fn corrupt_json_returns_parse_error_with_path() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("state.json");
    file.write_str("{ \"projects\": [ broken").expect("write");

    let err = StateStore::new(file.path()).load().unwrap_err();
    assert!(matches!(err, CoreError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains("state.json"), "must name the file: {err}");
}

#[test]
fn invalid_project_slug_in_file_is_rejected() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("state.json");
    file.write_str(
        r#"{"projects": {"Deck Repair": {"project_id": "x", "project_title": "x",
        "issue_number": null, "branch_name": "b", "created_at": "2025-01-01T00:00:00Z",
        "images": {}}}, "last_scan": null}"#,
    )
    .expect("write");

    let err = StateStore::new(file.path()).load().unwrap_err();
    assert!(matches!(err, CoreError::Parse { .. }), "got: {err}");
}

// ---------------------------------------------------------------------------
// 2. Save behaviour
// ---------------------------------------------------------------------------

#[test]
fn save_writes_documented_layout() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child(".github/construction-project-state.json");
    StateStore::new(file.path()).save(&sample_state()).expect("save");

    file.assert(predicate::path::exists());
    file.assert(predicate::str::contains("\"deck-repair\""));
    file.assert(predicate::str::contains("\"project_id\": \"construction/deck\""));
    file.assert(predicate::str::contains("\"issue_number\": 12"));
    file.assert(predicate::str::contains("\"branch_name\": \"project/2025-01-15-deck-repair\""));
    file.assert(predicate::str::contains("\"image_id\": \"construction/deck/before\""));
    file.assert(predicate::str::contains("\"last_scan\": \"2025-01-15T09:30:00Z\""));
}

#[test]
fn mid_write_crash_leaves_original_intact() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("state.json");
    let store = StateStore::new(file.path());
    store.save(&sample_state()).expect("save");
    let original = fs::read(file.path()).expect("read");

    // Simulated crash: .tmp written, rename never happened.
    let tmp = dir.child("state.json.tmp");
    tmp.write_str("CRASH - INCOMPLETE WRITE").expect("write tmp");

    assert_eq!(original, fs::read(file.path()).expect("read after crash"));
    assert_eq!(store.load().expect("load"), sample_state());
}

#[test]
fn load_reads_file_written_by_older_tool() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("state.json");
    file.write_str(
        r#"{
  "projects": {
    "deck-repair": {
      "project_id": "construction/deck",
      "project_title": "Deck Repair",
      "issue_number": null,
      "branch_name": "project/2025-01-15-deck-repair",
      "created_at": "2025-01-15T09:30:00.123456",
      "images": {
        "abc": {"image_id": "i1", "title": "t", "filename": "001_t.jpg", "added_at": "2025-01-15T09:31:00+00:00"}
      }
    }
  },
  "last_scan": "2025-01-15T09:32:00Z"
}"#,
    )
    .expect("write");

    let state = StateStore::new(file.path()).load().expect("load");
    assert_eq!(state.schema_version, buildlog_core::SCHEMA_VERSION);
    let project = &state.projects[&deck()];
    assert_eq!(project.issue_id, None);
    assert_eq!(
        project.created_at,
        Utc.with_ymd_and_hms(2025, 1, 15, 9, 30, 0).unwrap() + chrono::Duration::microseconds(123456)
    );
    assert_eq!(project.images.len(), 1);
    assert!(state.last_scan_at.is_some());
}
