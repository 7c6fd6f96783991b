//! # keepsync-sync
//!
//! The per-repository reconciliation engine.
//!
//! [`Engine::reconcile`] inspects one checkout against its remote and performs
//! at most one corrective action: a pull for [`SyncMode::Pull`] repositories,
//! a stage + commit + push for [`SyncMode::Push`] ones. Version-control
//! access goes through the [`Vcs`] trait ([`GitVcs`] in production), hook
//! execution through [`HookRunner`].
//!
//! [`SyncMode::Pull`]: keepsync_core::SyncMode::Pull
//! [`SyncMode::Push`]: keepsync_core::SyncMode::Push

pub mod engine;
pub mod error;
pub mod git;
pub mod hook;
pub mod outcome;
pub mod vcs;

pub use engine::{auto_commit_message, Engine, Reconciler};
pub use error::{HookError, ReconcileError, VcsError};
pub use git::GitVcs;
pub use hook::{HookRunner, ShellHookRunner};
pub use outcome::ReconciliationOutcome;
pub use vcs::{Head, PullResult, RemoteRef, TreeState, Vcs};
