//! Post-action hook execution.

use std::path::Path;
use std::process::{Command, Stdio};

use crate::error::HookError;

/// Runs the optional script configured for a repository after a successful
/// pull or push.
pub trait HookRunner {
    /// Run `script` synchronously with `workdir` (the checkout root) as the
    /// working directory.
    fn run(&self, script: &Path, workdir: &Path) -> Result<(), HookError>;
}

/// Runs hooks as `sh <script>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellHookRunner;

impl HookRunner for ShellHookRunner {
    fn run(&self, script: &Path, workdir: &Path) -> Result<(), HookError> {
        tracing::debug!("running hook {} in {}", script.display(), workdir.display());
        let status = Command::new("sh")
            .arg(script)
            .current_dir(workdir)
            .stdin(Stdio::null())
            .status()
            .map_err(|source| HookError::Spawn {
                script: script.to_path_buf(),
                source,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(HookError::Failed {
                script: script.to_path_buf(),
                status: status.to_string(),
            })
        }
    }
}
