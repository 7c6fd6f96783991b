//! `keepsync once`: a single sequential pass.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use keepsync_daemon::TickReport;

#[derive(Args, Debug)]
pub struct OnceArgs {
    /// Settings file (TOML).
    pub config: Option<PathBuf>,
}

impl OnceArgs {
    pub fn run(self) -> Result<()> {
        let (settings, credential) =
            keepsync_daemon::load(self.config.as_deref()).context("failed to load configuration")?;
        if settings.repositories.is_empty() {
            println!("No repositories configured in {}.", settings.repositories_file.display());
            return Ok(());
        }

        let reports = keepsync_daemon::run_once(settings, credential).context("pass failed")?;
        for report in &reports {
            println!("{}", summary_line(report));
        }
        Ok(())
    }
}

fn summary_line(report: &TickReport) -> String {
    let elapsed = format!("({} ms)", report.duration.as_millis()).bright_black();
    match (&report.outcome.error, report.outcome.acted) {
        (Some(err), _) => format!("{} '{}': {err} {elapsed}", "✗".red().bold(), report.repo),
        (None, true) => format!("{} '{}': synchronized {elapsed}", "✓".green().bold(), report.repo),
        (None, false) => format!("{} '{}': nothing to do {elapsed}", "·".bright_black(), report.repo),
    }
}
