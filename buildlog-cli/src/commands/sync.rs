//! `buildlog sync`: one reconciliation run.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use buildlog_sync::{ProjectOutcome, RunReport};

use super::{build_orchestrator, plan::print_plan, GlobalOpts};

/// Arguments for `buildlog sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Report what would be synced without touching git, issues or state.
    #[arg(long)]
    pub dry_run: bool,
}

impl SyncArgs {
    pub fn run(self, opts: &GlobalOpts) -> Result<()> {
        let config = opts.load_config()?;
        if !config.enabled {
            println!("Photo monitoring is disabled (ENABLE_PHOTO_MONITORING=false); nothing to do.");
            return Ok(());
        }

        let orchestrator = build_orchestrator(&opts.repo, config)?;
        if self.dry_run {
            let plan = orchestrator.plan().context("dry run failed")?;
            print_plan(&plan, true);
            return Ok(());
        }

        let report = orchestrator.run().context("sync run failed")?;
        print_report(&report);
        Ok(())
    }
}

fn print_report(report: &RunReport) {
    if report.projects.is_empty() {
        println!("No albums found.");
        return;
    }

    for project in &report.projects {
        let name = &project.name;
        match &project.outcome {
            ProjectOutcome::Unchanged => println!("{} '{name}' up to date", "·".bright_black()),
            ProjectOutcome::NoDownloads { candidates } => println!(
                "{} '{name}' {candidates} new photo(s) could not be downloaded",
                "!".yellow().bold()
            ),
            ProjectOutcome::Synced {
                new_images,
                total_images,
                committed,
            } => {
                let note = if *committed { "" } else { " (already committed)" };
                println!(
                    "{} '{name}' synced {new_images} new of {total_images} photos{note}",
                    "✓".green().bold()
                );
            }
            ProjectOutcome::Failed { error } => {
                println!("{} '{name}' skipped: {error}", "✗".red().bold())
            }
        }
    }

    let failed = report.failed().count();
    println!(
        "{} new photo(s) across {} project(s){}",
        report.new_image_count(),
        report.projects.len(),
        if failed > 0 {
            format!(", {failed} skipped").red().to_string()
        } else {
            String::new()
        }
    );
}
