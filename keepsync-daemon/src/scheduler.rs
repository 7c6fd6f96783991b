//! Per-repository polling loops and the shutdown drain.
//!
//! Every repository gets one independent task: tick, then sleep for its
//! poll interval, repeat. Ticks of one repository never overlap, and tasks
//! of different repositories share nothing but the read-only credential.
//!
//! On shutdown no new tick is started; in-flight ticks finish naturally, and
//! then one final pass reconciles every repository sequentially in list
//! order before [`Scheduler::run`] returns.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use keepsync_core::{Credential, RepoName, RepositoryDescriptor};
use keepsync_sync::{Reconciler, ReconciliationOutcome};
use tokio::sync::broadcast::{self, error::TryRecvError};
use tokio::time::Instant;

use crate::notifier::Notifier;

/// What one tick did, for callers that want to print it.
#[derive(Debug)]
pub struct TickReport {
    pub repo: RepoName,
    pub outcome: ReconciliationOutcome,
    pub duration: Duration,
}

pub struct Scheduler<R, N> {
    reconciler: Arc<R>,
    notifier: Arc<N>,
}

impl<R: Reconciler, N: Notifier> Scheduler<R, N> {
    pub fn new(reconciler: Arc<R>, notifier: Arc<N>) -> Self {
        Self {
            reconciler,
            notifier,
        }
    }

    /// Run one loop per repository until `shutdown` resolves, then drain
    /// with a sequential final pass. Returns the final pass reports.
    pub async fn run<F>(
        &self,
        repositories: Vec<RepositoryDescriptor>,
        credential: Option<Credential>,
        shutdown: F,
    ) -> Vec<TickReport>
    where
        F: Future<Output = ()>,
    {
        let repositories: Vec<Arc<RepositoryDescriptor>> =
            repositories.into_iter().map(Arc::new).collect();
        let credential = Arc::new(credential);
        let (shutdown_tx, _) = broadcast::channel::<()>(16);

        let handles: Vec<_> = repositories
            .iter()
            .map(|repo| {
                let task = RepoTask {
                    reconciler: self.reconciler.clone(),
                    notifier: self.notifier.clone(),
                    repo: repo.clone(),
                    credential: credential.clone(),
                };
                let shutdown_rx = shutdown_tx.subscribe();
                (repo.name.clone(), tokio::spawn(task.run_loop(shutdown_rx)))
            })
            .collect();
        tracing::info!(repositories = handles.len(), "scheduler started");

        shutdown.await;
        tracing::info!("shutdown requested, waiting for in-flight ticks");
        let _ = shutdown_tx.send(());

        for (name, handle) in handles {
            if let Err(err) = handle.await {
                tracing::error!(repo = %name, error = %err, "repository loop ended abnormally");
            }
        }

        tracing::info!("running final pass");
        let reports = self.pass(&repositories, &credential).await;
        tracing::info!(repositories = reports.len(), "finished last tasks");
        reports
    }

    /// One sequential pass over `repositories`, in list order.
    pub async fn run_once(
        &self,
        repositories: Vec<RepositoryDescriptor>,
        credential: Option<Credential>,
    ) -> Vec<TickReport> {
        let repositories: Vec<Arc<RepositoryDescriptor>> =
            repositories.into_iter().map(Arc::new).collect();
        self.pass(&repositories, &Arc::new(credential)).await
    }

    async fn pass(
        &self,
        repositories: &[Arc<RepositoryDescriptor>],
        credential: &Arc<Option<Credential>>,
    ) -> Vec<TickReport> {
        let mut reports = Vec::with_capacity(repositories.len());
        for repo in repositories {
            let task = RepoTask {
                reconciler: self.reconciler.clone(),
                notifier: self.notifier.clone(),
                repo: repo.clone(),
                credential: credential.clone(),
            };
            if let Some(report) = task.tick().await {
                reports.push(report);
            }
        }
        reports
    }
}

/// Everything one repository loop owns.
struct RepoTask<R, N> {
    reconciler: Arc<R>,
    notifier: Arc<N>,
    repo: Arc<RepositoryDescriptor>,
    credential: Arc<Option<Credential>>,
}

impl<R: Reconciler, N: Notifier> RepoTask<R, N> {
    async fn run_loop(self, mut shutdown_rx: broadcast::Receiver<()>) {
        loop {
            // Lagged counts as a shutdown request too.
            if !matches!(shutdown_rx.try_recv(), Err(TryRecvError::Empty)) {
                break;
            }

            self.tick().await;

            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => break,
                _ = tokio::time::sleep(self.repo.poll_interval) => {}
            }
        }
        tracing::debug!(repo = %self.repo.name, "repository loop stopped");
    }

    /// Reconcile once on the blocking pool and route the outcome.
    async fn tick(&self) -> Option<TickReport> {
        let reconciler = self.reconciler.clone();
        let notifier = self.notifier.clone();
        let repo = self.repo.clone();
        let credential = self.credential.clone();
        let started = Instant::now();

        let joined = tokio::task::spawn_blocking(move || {
            let outcome = reconciler.reconcile(&repo, credential.as_ref().as_ref());
            route_outcome(notifier.as_ref(), &repo, &outcome);
            outcome
        })
        .await;

        match joined {
            Ok(outcome) => Some(TickReport {
                repo: self.repo.name.clone(),
                outcome,
                duration: started.elapsed(),
            }),
            Err(err) => {
                tracing::error!(repo = %self.repo.name, error = %err, "reconciliation panicked");
                None
            }
        }
    }
}

/// Log the outcome and forward anything worth surfacing to the notifier.
fn route_outcome<N: Notifier + ?Sized>(
    notifier: &N,
    repo: &RepositoryDescriptor,
    outcome: &ReconciliationOutcome,
) {
    match &outcome.error {
        Some(err) => tracing::warn!(
            repo = %repo.name,
            mode = %repo.mode,
            acted = outcome.acted,
            transient = err.is_transient(),
            error = %err,
            "tick failed",
        ),
        None if outcome.acted => tracing::info!(
            repo = %repo.name,
            mode = %repo.mode,
            acted = true,
            "tick completed",
        ),
        None => tracing::debug!(repo = %repo.name, mode = %repo.mode, "tick was a noop"),
    }

    for line in outcome.notifications(&repo.name.0) {
        notifier.notify(&line);
    }
}
