//! Result of one reconciliation tick.

use crate::error::ReconcileError;

/// Created fresh on every tick and discarded once routed; nothing carries
/// over to the next tick.
#[derive(Debug, Default)]
pub struct ReconciliationOutcome {
    /// A pull or push was actually performed.
    pub acted: bool,
    pub error: Option<ReconcileError>,
    /// Success text for the notifier; `None` in force mode.
    pub message: Option<String>,
}

impl ReconciliationOutcome {
    /// Nothing to do, nothing to report.
    pub fn noop() -> Self {
        Self::default()
    }

    /// The tick failed before any action was taken.
    pub fn failed(error: ReconcileError) -> Self {
        Self {
            acted: false,
            error: Some(error),
            message: None,
        }
    }

    pub fn is_noop(&self) -> bool {
        !self.acted && self.error.is_none() && self.message.is_none()
    }

    /// Lines worth surfacing, prefixed with the repository name for errors.
    pub fn notifications(&self, repo_name: &str) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(message) = &self.message {
            lines.push(message.clone());
        }
        if let Some(error) = &self.error {
            lines.push(format!("{repo_name}: {error}"));
        }
        lines
    }
}
