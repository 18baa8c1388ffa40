//! `buildlog plan`: what the next sync would do.

use anyhow::{Context, Result};
use clap::Args;
use tabled::{settings::Style, Table, Tabled};

use buildlog_sync::PlanReport;

use super::{build_orchestrator, GlobalOpts};

/// Arguments for `buildlog plan`.
#[derive(Args, Debug)]
pub struct PlanArgs {}

impl PlanArgs {
    pub fn run(self, opts: &GlobalOpts) -> Result<()> {
        let config = opts.load_config()?;
        if !config.enabled {
            println!("Photo monitoring is disabled (ENABLE_PHOTO_MONITORING=false); nothing to do.");
            return Ok(());
        }
        let plan = build_orchestrator(&opts.repo, config)?
            .plan()
            .context("plan failed")?;
        print_plan(&plan, false);
        Ok(())
    }
}

#[derive(Tabled)]
struct PlanRow {
    #[tabled(rename = "project")]
    name: String,
    #[tabled(rename = "branch")]
    branch: String,
    #[tabled(rename = "new")]
    new_images: usize,
    #[tabled(rename = "total")]
    total_images: usize,
    #[tabled(rename = "note")]
    note: String,
}

pub(crate) fn print_plan(plan: &PlanReport, dry_run: bool) {
    let prefix = if dry_run { "[dry-run] " } else { "" };
    if plan.projects.is_empty() {
        println!("{prefix}No albums found.");
        return;
    }

    let rows: Vec<PlanRow> = plan
        .projects
        .iter()
        .map(|p| PlanRow {
            name: p.name.clone(),
            branch: p
                .branch
                .as_ref()
                .map(|b| b.to_string())
                .unwrap_or_else(|| "-".to_string()),
            new_images: p.new_images,
            total_images: p.total_images,
            note: match (&p.error, p.is_new) {
                (Some(err), _) => format!("error: {err}"),
                (None, true) => "new project".to_string(),
                (None, false) => String::new(),
            },
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    println!(
        "{prefix}{} new photo(s) would be synced",
        plan.new_image_count()
    );
}
