//! Reconciliation engine: one inspection + at most one corrective action.
//!
//! Every tick starts from scratch. Drift is recomputed from the checkout and
//! the remote each time; nothing is cached between ticks.
//!
//! The two modes are deliberately asymmetric:
//! - pull acts only on a clean tree (never overwrite uncommitted work)
//! - push acts only on a dirty tree (never create empty commits)
//!
//! `force` lifts the clean-tree requirement of pull, forces the transfer in
//! both modes, and suppresses success messages.

use chrono::{Local, NaiveDateTime};
use keepsync_core::{Credential, RepositoryDescriptor, SyncMode};

use crate::error::{ReconcileError, VcsError};
use crate::hook::HookRunner;
use crate::outcome::ReconciliationOutcome;
use crate::vcs::{PullResult, TreeState, Vcs};

/// Anything that can run one reconciliation tick. The scheduler is generic
/// over this so it can be driven without a real backend.
pub trait Reconciler: Send + Sync + 'static {
    /// Never fails; errors are captured in the outcome.
    fn reconcile(
        &self,
        repo: &RepositoryDescriptor,
        credential: Option<&Credential>,
    ) -> ReconciliationOutcome;
}

/// Commit message for push mode, derived from the attempt time.
pub fn auto_commit_message(at: NaiveDateTime) -> String {
    format!("keepsync auto-commit: {}", at.format("%d/%m/%Y %H:%M"))
}

/// The reconciliation engine over a VCS backend and a hook runner.
#[derive(Debug, Clone, Default)]
pub struct Engine<V, H> {
    vcs: V,
    hooks: H,
}

impl<V: Vcs, H: HookRunner> Engine<V, H> {
    pub fn new(vcs: V, hooks: H) -> Self {
        Self { vcs, hooks }
    }

    pub fn vcs(&self) -> &V {
        &self.vcs
    }

    /// Run one tick for `repo`.
    pub fn reconcile(
        &self,
        repo: &RepositoryDescriptor,
        credential: Option<&Credential>,
    ) -> ReconciliationOutcome {
        let result = match repo.mode {
            SyncMode::Pull => self.pull(repo, credential),
            SyncMode::Push => self.push(repo, credential),
        };
        match result {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::warn!("{}: {} tick failed: {}", repo.name, repo.mode, err);
                ReconciliationOutcome::failed(err)
            }
        }
    }

    fn pull(
        &self,
        repo: &RepositoryDescriptor,
        credential: Option<&Credential>,
    ) -> Result<ReconciliationOutcome, ReconcileError> {
        let checkout = self
            .vcs
            .open(&repo.local_path)
            .map_err(ReconcileError::CheckoutOpen)?;

        if !repo.force {
            let state = self.vcs.status(&checkout).map_err(ReconcileError::Inspect)?;
            if state == TreeState::Dirty {
                tracing::debug!("{}: uncommitted changes, skipping pull", repo.name);
                return Ok(ReconciliationOutcome::noop());
            }
        }

        let head = self.vcs.head(&checkout).map_err(ReconcileError::Inspect)?;
        if !head.is_branch() {
            tracing::debug!("{}: HEAD is detached, skipping pull", repo.name);
            return Ok(ReconciliationOutcome::noop());
        }

        let refs = self
            .vcs
            .list_remote_refs(&checkout, &repo.remote_name, credential)
            .map_err(|source| ReconcileError::Remote {
                remote: repo.remote_name.clone(),
                source,
            })?;

        let Some(remote_ref) = refs.iter().find(|r| r.name == head.reference) else {
            tracing::debug!(
                "{}: {} not found on {}, skipping pull",
                repo.name,
                head.reference,
                repo.remote_name
            );
            return Ok(ReconciliationOutcome::noop());
        };

        // Act whenever the revisions differ, whichever side is ahead.
        if remote_ref.revision == head.revision {
            tracing::debug!("{}: up to date at {}", repo.name, head.revision.short());
            return Ok(ReconciliationOutcome::noop());
        }

        if repo.force {
            self.vcs
                .hard_reset(&checkout, &head.revision)
                .map_err(ReconcileError::Reset)?;
        }

        match self
            .vcs
            .pull(&checkout, &repo.remote_name, credential, repo.force)
            .map_err(ReconcileError::Pull)?
        {
            PullResult::AlreadyUpToDate => {
                tracing::debug!("{}: pull had nothing to do", repo.name);
                return Ok(ReconciliationOutcome::noop());
            }
            PullResult::Updated(revision) => {
                tracing::info!(
                    "{}: pulled {} -> {}",
                    repo.name,
                    head.revision.short(),
                    revision.short()
                );
            }
        }

        let message = (!repo.force).then(|| format!("{}: successfully pulled", repo.name));
        Ok(self.after_action(repo, message))
    }

    fn push(
        &self,
        repo: &RepositoryDescriptor,
        credential: Option<&Credential>,
    ) -> Result<ReconciliationOutcome, ReconcileError> {
        let checkout = self
            .vcs
            .open(&repo.local_path)
            .map_err(ReconcileError::CheckoutOpen)?;

        let state = self.vcs.status(&checkout).map_err(ReconcileError::Inspect)?;
        if state == TreeState::Clean {
            tracing::debug!("{}: nothing to commit, skipping push", repo.name);
            return Ok(ReconciliationOutcome::noop());
        }

        // Nothing may be committed on a detached HEAD; it could never be pushed.
        let head = self.vcs.head(&checkout).map_err(ReconcileError::Inspect)?;
        if !head.is_branch() {
            return Err(ReconcileError::Push(VcsError::DetachedHead));
        }

        self.vcs
            .stage_all(&checkout)
            .map_err(ReconcileError::Stage)?;

        let message = auto_commit_message(Local::now().naive_local());
        let revision = self
            .vcs
            .commit(&checkout, &message)
            .map_err(|err| match err {
                VcsError::NothingToCommit => ReconcileError::EmptyCommit,
                other => ReconcileError::Commit(other),
            })?;

        self.vcs
            .push(&checkout, &repo.remote_name, credential, repo.force)
            .map_err(ReconcileError::Push)?;
        tracing::info!(
            "{}: pushed {} to {}",
            repo.name,
            revision.short(),
            repo.remote_name
        );

        let message = (!repo.force).then(|| format!("{}: successfully pushed", repo.name));
        Ok(self.after_action(repo, message))
    }

    /// Run the hook, if any. A hook failure is reported next to the success
    /// message and never undoes the action.
    fn after_action(
        &self,
        repo: &RepositoryDescriptor,
        message: Option<String>,
    ) -> ReconciliationOutcome {
        let error = repo.post_action_hook.as_deref().and_then(|script| {
            self.hooks
                .run(script, &repo.local_path)
                .err()
                .map(ReconcileError::Hook)
        });
        ReconciliationOutcome {
            acted: true,
            error,
            message,
        }
    }
}

impl<V, H> Reconciler for Engine<V, H>
where
    V: Vcs + Send + Sync + 'static,
    H: HookRunner + Send + Sync + 'static,
{
    fn reconcile(
        &self,
        repo: &RepositoryDescriptor,
        credential: Option<&Credential>,
    ) -> ReconciliationOutcome {
        Engine::reconcile(self, repo, credential)
    }
}
