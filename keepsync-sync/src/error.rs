//! Error types for keepsync-sync.

use std::path::PathBuf;

use thiserror::Error;

/// Failure of a single version-control operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VcsError {
    /// The path is missing or is not a checkout.
    #[error("not a checkout: {path}: {message}")]
    NotACheckout { path: PathBuf, message: String },

    #[error("remote '{name}' not found")]
    RemoteNotFound { name: String },

    /// Staging produced a tree identical to HEAD.
    #[error("nothing to commit")]
    NothingToCommit,

    /// Local and remote histories diverged and the pull was not forced.
    #[error("cannot fast-forward '{branch}' to {remote_revision}")]
    NonFastForward {
        branch: String,
        remote_revision: String,
    },

    /// HEAD does not point at a branch.
    #[error("HEAD is detached")]
    DetachedHead,

    /// The remote refused a pushed reference.
    #[error("push rejected: {message}")]
    Rejected { message: String },

    /// Any other backend failure.
    #[error("{0}")]
    Backend(String),
}

impl From<git2::Error> for VcsError {
    fn from(err: git2::Error) -> Self {
        VcsError::Backend(err.message().to_string())
    }
}

/// Failure of the post-action hook.
#[derive(Debug, Error)]
pub enum HookError {
    #[error("failed to start {script}: {source}")]
    Spawn {
        script: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{script} exited with {status}")]
    Failed { script: PathBuf, status: String },
}

/// Classified failure of one reconciliation tick.
///
/// None of these stop the daemon; the next tick retries from scratch.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The configured path could not be opened as a checkout.
    #[error("cannot open checkout: {0}")]
    CheckoutOpen(#[source] VcsError),

    /// Status or HEAD could not be read.
    #[error("cannot inspect checkout: {0}")]
    Inspect(#[source] VcsError),

    /// Remote lookup or reference listing failed (usually network).
    #[error("cannot list remote '{remote}': {source}")]
    Remote {
        remote: String,
        #[source]
        source: VcsError,
    },

    #[error("hard reset failed: {0}")]
    Reset(#[source] VcsError),

    #[error("pull failed: {0}")]
    Pull(#[source] VcsError),

    #[error("staging failed: {0}")]
    Stage(#[source] VcsError),

    /// The tree read dirty but staging recorded nothing.
    #[error("nothing was staged although the working tree was dirty")]
    EmptyCommit,

    #[error("commit failed: {0}")]
    Commit(#[source] VcsError),

    #[error("push failed: {0}")]
    Push(#[source] VcsError),

    /// The sync action succeeded but the hook did not.
    #[error("executing script returned an error, {0}")]
    Hook(#[source] HookError),
}

impl ReconcileError {
    /// Errors expected to clear up on their own (network, remote state).
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ReconcileError::Remote { .. }
                | ReconcileError::Pull(_)
                | ReconcileError::Push(_)
                | ReconcileError::Inspect(_)
        )
    }
}
