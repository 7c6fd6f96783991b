//! `keepsync check [CONFIG] [--json]`

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use keepsync_core::{RepositoryDescriptor, Settings};
use keepsync_sync::{GitVcs, Vcs};

/// Validate configuration and list the configured repositories.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Settings file (TOML).
    pub config: Option<PathBuf>,

    /// Output machine-readable JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct RepositoryCheck {
    name: String,
    mode: String,
    path: PathBuf,
    remote: String,
    interval_secs: u64,
    force: bool,
    hook: Option<PathBuf>,
    checkout_ok: bool,
    checkout_error: Option<String>,
}

#[derive(Tabled)]
struct CheckTableRow {
    #[tabled(rename = "repository")]
    name: String,
    #[tabled(rename = "mode")]
    mode: String,
    #[tabled(rename = "every")]
    every: String,
    #[tabled(rename = "remote")]
    remote: String,
    #[tabled(rename = "force")]
    force: String,
    #[tabled(rename = "hook")]
    hook: String,
    #[tabled(rename = "checkout")]
    checkout: String,
}

impl CheckArgs {
    pub fn run(self) -> Result<()> {
        let (settings, credential) =
            keepsync_daemon::load(self.config.as_deref()).context("invalid configuration")?;
        let checks: Vec<RepositoryCheck> = settings.repositories.iter().map(inspect).collect();

        if self.json {
            let payload = serde_json::json!({
                "settings": settings.source,
                "repositories_file": settings.repositories_file,
                "authenticated": credential.is_some(),
                "repositories": checks,
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&payload).context("failed to render JSON")?
            );
            return Ok(());
        }

        print_table(&settings, credential.is_some(), checks);
        Ok(())
    }
}

fn inspect(repo: &RepositoryDescriptor) -> RepositoryCheck {
    let opened = GitVcs.open(&repo.local_path);
    RepositoryCheck {
        name: repo.name.0.clone(),
        mode: repo.mode.to_string(),
        path: repo.local_path.clone(),
        remote: repo.remote_name.clone(),
        interval_secs: repo.poll_interval.as_secs(),
        force: repo.force,
        hook: repo.post_action_hook.clone(),
        checkout_ok: opened.is_ok(),
        checkout_error: opened.err().map(|e| e.to_string()),
    }
}

fn print_table(settings: &Settings, authenticated: bool, checks: Vec<RepositoryCheck>) {
    println!("settings:     {}", settings.source.display());
    println!("repositories: {}", settings.repositories_file.display());
    println!(
        "transport:    {}",
        if authenticated { "ssh key" } else { "anonymous" }
    );

    if checks.is_empty() {
        println!("No repositories configured.");
        return;
    }

    let broken: Vec<(String, String)> = checks
        .iter()
        .filter_map(|c| Some((c.name.clone(), c.checkout_error.clone()?)))
        .collect();

    let rows: Vec<CheckTableRow> = checks
        .into_iter()
        .map(|c| CheckTableRow {
            name: c.name,
            mode: c.mode,
            every: format_interval(Duration::from_secs(c.interval_secs)),
            remote: c.remote,
            force: if c.force { "yes".to_string() } else { "-".to_string() },
            hook: c
                .hook
                .map(|h| h.display().to_string())
                .unwrap_or_else(|| "-".to_string()),
            checkout: if c.checkout_ok {
                "✓".green().bold().to_string()
            } else {
                "✗".red().bold().to_string()
            },
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    for (name, error) in broken {
        println!("  {} {name}: {error}", "!".yellow().bold());
    }
}

/// `90s` → `1m30s`, `600s` → `10m`.
fn format_interval(interval: Duration) -> String {
    let secs = interval.as_secs();
    match (secs / 3600, secs % 3600 / 60, secs % 60) {
        (0, 0, s) => format!("{s}s"),
        (0, m, 0) => format!("{m}m"),
        (0, m, s) => format!("{m}m{s}s"),
        (h, 0, 0) => format!("{h}h"),
        (h, m, _) => format!("{h}h{m}m"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intervals_render_compactly() {
        assert_eq!(format_interval(Duration::from_secs(45)), "45s");
        assert_eq!(format_interval(Duration::from_secs(600)), "10m");
        assert_eq!(format_interval(Duration::from_secs(90)), "1m30s");
        assert_eq!(format_interval(Duration::from_secs(7200)), "2h");
        assert_eq!(format_interval(Duration::from_secs(3900)), "1h5m");
    }
}
