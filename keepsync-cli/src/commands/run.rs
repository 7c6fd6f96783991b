//! `keepsync run`: foreground daemon.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Settings file (TOML).
    pub config: Option<PathBuf>,
}

impl RunArgs {
    pub fn run(self) -> Result<()> {
        let (settings, credential) =
            keepsync_daemon::load(self.config.as_deref()).context("failed to load configuration")?;
        keepsync_daemon::start_blocking(settings, credential).context("daemon exited with error")
    }
}
