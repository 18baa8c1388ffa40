//! `buildlog status`: tracked projects from the state file.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use buildlog_core::SyncState;

use super::GlobalOpts;

/// Arguments for `buildlog status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self, opts: &GlobalOpts) -> Result<()> {
        let config = opts.load_config()?;
        let store = opts.state_store(&config);
        let state = store
            .load()
            .with_context(|| format!("failed to load state from {}", store.path().display()))?;

        let report = build_report(&state);
        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize status JSON")?
            );
            return Ok(());
        }
        print_table(report);
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct StatusReport {
    last_scan: Option<String>,
    tracked_images: usize,
    projects: Vec<ProjectStatus>,
}

#[derive(Debug, Serialize)]
struct ProjectStatus {
    name: String,
    branch: String,
    issue: Option<u64>,
    images: usize,
    created: String,
}

#[derive(Tabled)]
struct StatusTableRow {
    #[tabled(rename = "project")]
    name: String,
    #[tabled(rename = "branch")]
    branch: String,
    #[tabled(rename = "issue")]
    issue: String,
    #[tabled(rename = "photos")]
    images: usize,
    #[tabled(rename = "created")]
    created: String,
}

fn build_report(state: &SyncState) -> StatusReport {
    StatusReport {
        last_scan: state.last_scan_at.map(|t| t.to_rfc3339()),
        tracked_images: state.tracked_image_count(),
        projects: state
            .projects
            .iter()
            .map(|(name, project)| ProjectStatus {
                name: name.to_string(),
                branch: project.branch_name.to_string(),
                issue: project.issue_id.map(|i| i.0),
                images: project.images.len(),
                created: project.created_date().to_string(),
            })
            .collect(),
    }
}

fn print_table(report: StatusReport) {
    println!(
        "buildlog v{} | {} projects | {} photos | last scan: {}",
        env!("CARGO_PKG_VERSION"),
        report.projects.len(),
        report.tracked_images,
        report.last_scan.as_deref().unwrap_or("never"),
    );

    if report.projects.is_empty() {
        println!("No projects tracked yet. Run 'buildlog sync' first.");
        return;
    }

    let rows: Vec<StatusTableRow> = report
        .projects
        .into_iter()
        .map(|p| StatusTableRow {
            issue: match p.issue {
                Some(n) => format!("#{n}"),
                None => "-".bright_black().to_string(),
            },
            name: p.name,
            branch: p.branch,
            images: p.images,
            created: p.created,
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}
