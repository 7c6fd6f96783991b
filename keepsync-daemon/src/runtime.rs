use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use keepsync_core::{config, Credential, Settings};
use keepsync_sync::{Engine, GitVcs, ShellHookRunner};

use crate::error::{io_err, DaemonError};
use crate::notifier::DesktopNotifier;
use crate::scheduler::{Scheduler, TickReport};

type GitEngine = Engine<GitVcs, ShellHookRunner>;

/// Load settings (from `path`, or the default locations) and resolve the
/// credential. Any failure here is fatal for the process.
pub fn load(path: Option<&Path>) -> Result<(Settings, Option<Credential>), DaemonError> {
    let settings = match path {
        Some(path) => config::load_at(path)?,
        None => config::load()?,
    };
    let credential = settings.credential()?;
    Ok((settings, credential))
}

/// Start the daemon runtime and block the current thread until it exits.
pub fn start_blocking(settings: Settings, credential: Option<Credential>) -> Result<(), DaemonError> {
    build_runtime()?.block_on(run(settings, credential))
}

/// Run the scheduler until SIGINT/SIGTERM, then perform the final pass.
pub async fn run(settings: Settings, credential: Option<Credential>) -> Result<(), DaemonError> {
    let shutdown = shutdown_signal()?;
    let scheduler = git_scheduler(&settings);

    tracing::info!(
        settings = %settings.source.display(),
        repositories = settings.repositories.len(),
        authenticated = credential.is_some(),
        "keepsync daemon starting",
    );
    scheduler
        .run(settings.repositories, credential, shutdown)
        .await;
    Ok(())
}

/// One sequential pass over every configured repository.
pub fn run_once(
    settings: Settings,
    credential: Option<Credential>,
) -> Result<Vec<TickReport>, DaemonError> {
    let scheduler = git_scheduler(&settings);
    let reports =
        build_runtime()?.block_on(scheduler.run_once(settings.repositories, credential));
    Ok(reports)
}

fn git_scheduler(settings: &Settings) -> Scheduler<GitEngine, DesktopNotifier> {
    Scheduler::new(
        Arc::new(Engine::new(GitVcs, ShellHookRunner)),
        Arc::new(DesktopNotifier::new(settings.desktop_notifications)),
    )
}

fn build_runtime() -> Result<tokio::runtime::Runtime, DaemonError> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))
}

/// Register the termination handlers up front so a registration failure
/// aborts startup instead of shutting down immediately.
#[cfg(unix)]
fn shutdown_signal() -> Result<impl Future<Output = ()>, DaemonError> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate =
        signal(SignalKind::terminate()).map_err(|e| io_err("SIGTERM handler", e))?;
    let mut interrupt =
        signal(SignalKind::interrupt()).map_err(|e| io_err("SIGINT handler", e))?;
    Ok(async move {
        tokio::select! {
            _ = terminate.recv() => tracing::info!("received SIGTERM, closing up shop"),
            _ = interrupt.recv() => tracing::info!("received SIGINT, closing up shop"),
        }
    })
}

#[cfg(not(unix))]
fn shutdown_signal() -> Result<impl Future<Output = ()>, DaemonError> {
    Ok(async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("received ctrl-c, closing up shop"),
            Err(err) => tracing::error!(error = %err, "ctrl-c handler failed, shutting down"),
        }
    })
}

/// Install the global subscriber on stderr. `RUST_LOG` overrides the
/// `info` default.
pub fn init_tracing(json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
